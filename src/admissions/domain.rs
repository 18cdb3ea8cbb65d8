use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::fees::FeeDetails;
use crate::collections::Keyed;

/// Status assigned to every new submission.
pub const STATUS_UNDER_REVIEW: &str = "under_review";
/// Status set when the applicant accepts an offer.
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_REJECTED: &str = "rejected";

/// Identifier assigned by the application store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline position of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// New applications under review.
    Stage1,
    /// Fee structure assigned, documents being verified.
    Stage2,
    /// Offer accepted by the applicant.
    Stage3,
}

impl Stage {
    pub const fn ordered() -> [Stage; 3] {
        [Stage::Stage1, Stage::Stage2, Stage::Stage3]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stage::Stage1 => "stage1",
            Stage::Stage2 => "stage2",
            Stage::Stage3 => "stage3",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Stage::Stage1 => "New Applications",
            Stage::Stage2 => "Document Verification",
            Stage::Stage3 => "Final Approval",
        }
    }

    pub const fn next(self) -> Option<Stage> {
        match self {
            Stage::Stage1 => Some(Stage::Stage2),
            Stage::Stage2 => Some(Stage::Stage3),
            Stage::Stage3 => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = StageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stage1" => Ok(Stage::Stage1),
            "stage2" => Ok(Stage::Stage2),
            "stage3" => Ok(Stage::Stage3),
            _ => Err(StageError::Unknown(value.to_string())),
        }
    }
}

/// Rejected pipeline moves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("unknown stage '{0}'")]
    Unknown(String),
    #[error("cannot move from {from} to {to}: stages only advance")]
    NotForward { from: Stage, to: Stage },
    #[error("cannot move from {from} to {to}: stages cannot be skipped")]
    Skipped { from: Stage, to: Stage },
    #[error("fee details must be set before moving to stage2")]
    FeesRequired,
    #[error("only {required} applications can accept an offer (found {found})")]
    NotOffered { required: Stage, found: Stage },
    #[error("{0} is reached only when the applicant accepts the offer")]
    AcceptanceOnly(Stage),
}

/// Which supporting documents the applicant submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFlags {
    #[serde(default)]
    pub transcript: bool,
    #[serde(default)]
    pub recommendation: bool,
}

impl DocumentFlags {
    pub fn submitted(&self) -> Vec<&'static str> {
        let mut submitted = Vec::new();
        if self.transcript {
            submitted.push("transcript");
        }
        if self.recommendation {
            submitted.push("recommendation");
        }
        submitted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    #[serde(default)]
    pub nationality: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicRecord {
    pub last_school: String,
    pub school_board: String,
    pub grade10_percentage: Option<f32>,
    #[serde(default)]
    pub grade12_percentage: Option<f32>,
    pub stream: String,
    #[serde(default)]
    pub achievements: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePreference {
    pub course: String,
    #[serde(default)]
    pub specialization: Option<String>,
    pub college_name: String,
    #[serde(default)]
    pub why_join: Option<String>,
}

/// What the applicant-facing form submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub personal: PersonalDetails,
    pub academic: AcademicRecord,
    pub course: CoursePreference,
    #[serde(default)]
    pub documents: DocumentFlags,
}

/// Draft validation failure listing every offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DraftError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{field} must be between 0 and 100 (found {value})")]
    PercentageOutOfRange { field: &'static str, value: f32 },
}

impl ApplicationDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        let personal = &self.personal;
        let academic = &self.academic;
        let course = &self.course;

        let required: [(&'static str, bool); 11] = [
            ("full_name", is_blank(&personal.full_name)),
            ("date_of_birth", personal.date_of_birth.is_none()),
            ("gender", is_blank(&personal.gender)),
            ("phone", is_blank(&personal.phone)),
            ("address", is_blank(&personal.address)),
            ("last_school", is_blank(&academic.last_school)),
            ("school_board", is_blank(&academic.school_board)),
            ("grade10_percentage", academic.grade10_percentage.is_none()),
            ("stream", is_blank(&academic.stream)),
            ("course", is_blank(&course.course)),
            ("college_name", is_blank(&course.college_name)),
        ];

        let missing: Vec<&'static str> = required
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();
        if !missing.is_empty() {
            return Err(DraftError::MissingFields(missing));
        }

        let percentages = [
            ("grade10_percentage", academic.grade10_percentage),
            ("grade12_percentage", academic.grade12_percentage),
        ];
        for (field, value) in percentages {
            if let Some(value) = value {
                if !(0.0..=100.0).contains(&value) {
                    return Err(DraftError::PercentageOutOfRange { field, value });
                }
            }
        }

        Ok(())
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Everything the store needs to create an application; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub student_id: UserId,
    pub draft: ApplicationDraft,
    pub stage: Stage,
    pub status: String,
    pub applied_at: DateTime<Utc>,
}

/// One student's submission to one college and course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: UserId,
    pub personal: PersonalDetails,
    pub academic: AcademicRecord,
    pub course: CoursePreference,
    pub documents: DocumentFlags,
    pub stage: Stage,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub fee_details: Option<FeeDetails>,
}

impl Application {
    pub fn from_new(id: ApplicationId, new: NewApplication) -> Self {
        let NewApplication {
            student_id,
            draft,
            stage,
            status,
            applied_at,
        } = new;

        Self {
            id,
            student_id,
            personal: draft.personal,
            academic: draft.academic,
            course: draft.course,
            documents: draft.documents,
            stage,
            status,
            applied_at,
            last_updated: applied_at,
            fee_details: None,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.personal.full_name
    }

    pub fn email(&self) -> &str {
        &self.personal.email
    }

    pub fn college_name(&self) -> &str {
        &self.course.college_name
    }

    /// Check that moving to `target` keeps the pipeline moving forward one
    /// stage at a time with fees in place before `stage2`.
    pub fn check_transition(&self, target: Stage) -> Result<(), StageError> {
        if target <= self.stage {
            return Err(StageError::NotForward {
                from: self.stage,
                to: target,
            });
        }
        if self.stage.next() != Some(target) {
            return Err(StageError::Skipped {
                from: self.stage,
                to: target,
            });
        }
        if target == Stage::Stage2 && self.fee_details.is_none() {
            return Err(StageError::FeesRequired);
        }
        Ok(())
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            full_name: self.personal.full_name.clone(),
            college_name: self.course.college_name.clone(),
            course: self.course.course.clone(),
            stage: self.stage,
            stage_label: self.stage.title(),
            status: self.status.clone(),
            total_fee: self.fee_details.as_ref().map(FeeDetails::total),
        }
    }
}

impl Keyed for Application {
    fn key(&self) -> &str {
        &self.id.0
    }
}

/// Compact representation returned by intake and listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub full_name: String,
    pub college_name: String,
    pub course: String,
    pub stage: Stage,
    pub stage_label: &'static str,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fee: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    /// Set for admins; scopes which applications they manage.
    #[serde(default)]
    pub college: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub college: Option<String>,
}
