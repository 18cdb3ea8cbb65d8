use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::{ScholarshipCandidate, ScholarshipSlab};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed scholarship CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Parse candidates from CSV with headers
/// `id,name,academic_score,family_income,extracurricular_score,special_quota`.
pub fn read_candidates<R: Read>(reader: R) -> Result<Vec<ScholarshipCandidate>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut candidates = Vec::new();

    for (index, record) in csv_reader.deserialize::<CandidateRow>().enumerate() {
        let row = record?;
        candidates.push(row.into_candidate(index + 1)?);
    }

    Ok(candidates)
}

/// Parse slabs from CSV with headers `name,min_score,max_income,amount`.
pub fn read_slabs<R: Read>(reader: R) -> Result<Vec<ScholarshipSlab>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<ScholarshipSlab>()
        .map(|record| record.map_err(ImportError::from))
        .collect()
}

pub fn read_candidates_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<ScholarshipCandidate>, ImportError> {
    read_candidates(open(path.as_ref())?)
}

pub fn read_slabs_from_path(path: impl AsRef<Path>) -> Result<Vec<ScholarshipSlab>, ImportError> {
    read_slabs(open(path.as_ref())?)
}

fn open(path: &Path) -> Result<File, ImportError> {
    File::open(path).map_err(|source| ImportError::Open {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    id: String,
    #[serde(default)]
    name: String,
    academic_score: f64,
    family_income: u64,
    #[serde(default)]
    extracurricular_score: f64,
    #[serde(default, deserialize_with = "flag")]
    special_quota: bool,
}

impl CandidateRow {
    fn into_candidate(self, row: usize) -> Result<ScholarshipCandidate, ImportError> {
        if self.id.is_empty() {
            return Err(ImportError::InvalidRow {
                row,
                message: "candidate id is empty".to_string(),
            });
        }
        if !self.academic_score.is_finite() || !self.extracurricular_score.is_finite() {
            return Err(ImportError::InvalidRow {
                row,
                message: format!("scores for '{}' must be finite numbers", self.id),
            });
        }

        Ok(ScholarshipCandidate {
            id: self.id,
            name: self.name,
            academic_score: self.academic_score,
            family_income: self.family_income,
            extracurricular_score: self.extracurricular_score,
            special_quota: self.special_quota,
        })
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "n" | "0" => Ok(false),
        "true" | "yes" | "y" | "1" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected a yes/no flag, found '{other}'"
        ))),
    }
}
