//! Greedy merit-ordered scholarship allocation.
//!
//! Candidates are ranked by a weighted merit score and walked once in that
//! order. Each receives the richest slab they qualify for if it still fits the
//! remaining budget, and nothing otherwise. There is no fallback to a cheaper
//! slab and no backtracking, so a high-merit candidate who only qualifies for
//! an expensive slab can be skipped while lower-merit candidates are funded.

pub mod import;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use import::{read_candidates, read_slabs, ImportError};

const ACADEMIC_WEIGHT: f64 = 0.4;
const FINANCIAL_WEIGHT: f64 = 0.3;
const EXTRACURRICULAR_WEIGHT: f64 = 0.2;
const SPECIAL_QUOTA_BONUS: f64 = 0.1;

/// Income at which the financial-need component reaches zero.
pub const INCOME_CEILING: f64 = 1_000_000.0;

/// Applicant attributes considered during allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarshipCandidate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub academic_score: f64,
    pub family_income: u64,
    pub extracurricular_score: f64,
    #[serde(default)]
    pub special_quota: bool,
}

/// Award tier with its eligibility thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarshipSlab {
    pub name: String,
    pub min_score: u32,
    pub max_income: u64,
    pub amount: u64,
}

impl ScholarshipSlab {
    pub fn admits(&self, candidate: &ScholarshipCandidate) -> bool {
        candidate.academic_score >= f64::from(self.min_score)
            && candidate.family_income <= self.max_income
    }
}

/// Slabs used when no explicit configuration is supplied.
pub fn default_slabs() -> Vec<ScholarshipSlab> {
    vec![
        ScholarshipSlab {
            name: "merit-gold".to_string(),
            min_score: 90,
            max_income: 800_000,
            amount: 50_000,
        },
        ScholarshipSlab {
            name: "merit-silver".to_string(),
            min_score: 75,
            max_income: 600_000,
            amount: 30_000,
        },
        ScholarshipSlab {
            name: "need-based".to_string(),
            min_score: 60,
            max_income: 300_000,
            amount: 20_000,
        },
    ]
}

/// A committed award.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub candidate: ScholarshipCandidate,
    pub slab: ScholarshipSlab,
    pub score: f64,
}

/// Outcome of one allocation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationReport {
    pub allocations: BTreeMap<String, Allocation>,
    pub remaining_budget: u64,
    pub total_allocated: u64,
}

impl AllocationReport {
    pub fn allocation_for(&self, candidate_id: &str) -> Option<&Allocation> {
        self.allocations.get(candidate_id)
    }
}

#[derive(Debug, Clone)]
pub struct ScholarshipAllocator {
    budget: u64,
    slabs: Vec<ScholarshipSlab>,
}

impl ScholarshipAllocator {
    pub fn new(budget: u64, slabs: Vec<ScholarshipSlab>) -> Self {
        Self { budget, slabs }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn slabs(&self) -> &[ScholarshipSlab] {
        &self.slabs
    }

    /// Weighted merit score. Incomes above [`INCOME_CEILING`] push the
    /// financial component negative.
    pub fn student_score(&self, candidate: &ScholarshipCandidate) -> f64 {
        let normalized_income = 1.0 - candidate.family_income as f64 / INCOME_CEILING;
        let quota = if candidate.special_quota {
            SPECIAL_QUOTA_BONUS
        } else {
            0.0
        };

        candidate.academic_score * ACADEMIC_WEIGHT
            + normalized_income * FINANCIAL_WEIGHT
            + candidate.extracurricular_score * EXTRACURRICULAR_WEIGHT
            + quota
    }

    /// Highest score first; ties keep their input order.
    pub fn sort_by_merit<'a>(
        &self,
        candidates: &'a [ScholarshipCandidate],
    ) -> Vec<&'a ScholarshipCandidate> {
        let mut ranked: Vec<(f64, &ScholarshipCandidate)> = candidates
            .iter()
            .map(|candidate| (self.student_score(candidate), candidate))
            .collect();
        ranked.sort_by(|left, right| right.0.total_cmp(&left.0));
        ranked.into_iter().map(|(_, candidate)| candidate).collect()
    }

    /// The richest slab the candidate qualifies for.
    pub fn best_fitting_slab(&self, candidate: &ScholarshipCandidate) -> Option<&ScholarshipSlab> {
        let mut best: Option<&ScholarshipSlab> = None;
        for slab in self.slabs.iter().filter(|slab| slab.admits(candidate)) {
            // strict comparison keeps the earlier slab on equal amounts
            if best.map_or(true, |current| slab.amount > current.amount) {
                best = Some(slab);
            }
        }
        best
    }

    pub fn allocate(&self, candidates: &[ScholarshipCandidate]) -> AllocationReport {
        let mut remaining_budget = self.budget;
        let mut allocations = BTreeMap::new();

        for candidate in self.sort_by_merit(candidates) {
            let Some(slab) = self.best_fitting_slab(candidate) else {
                debug!(candidate = %candidate.id, "no qualifying scholarship slab");
                continue;
            };

            if slab.amount > remaining_budget {
                debug!(
                    candidate = %candidate.id,
                    slab = %slab.name,
                    remaining_budget,
                    "slab exceeds remaining budget"
                );
                continue;
            }

            remaining_budget -= slab.amount;
            allocations.insert(
                candidate.id.clone(),
                Allocation {
                    candidate: candidate.clone(),
                    slab: slab.clone(),
                    score: self.student_score(candidate),
                },
            );
        }

        AllocationReport {
            allocations,
            remaining_budget,
            total_allocated: self.budget - remaining_budget,
        }
    }
}
