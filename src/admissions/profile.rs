//! Student profile and the student's own application listing.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, DraftError, UserAccount, UserId};

/// Contact and family details a student keeps alongside their applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: UserId,
    /// Always the account's e-mail; never taken from an update.
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mother_name: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentProfile {
    /// Empty profile for an account that has never saved one.
    pub fn blank(user: &UserAccount) -> Self {
        Self {
            student_id: user.id.clone(),
            email: user.email.clone(),
            ..Self::default()
        }
    }

    /// Overwrite the fields present in `update`, leaving the rest as stored.
    pub fn merge(&mut self, update: ProfileUpdate) {
        let ProfileUpdate {
            name,
            phone_number,
            date_of_birth,
            gender,
            address,
            city,
            state,
            pincode,
            father_name,
            mother_name,
        } = update;

        let fields = [
            (&mut self.name, name),
            (&mut self.phone_number, phone_number),
            (&mut self.gender, gender),
            (&mut self.address, address),
            (&mut self.city, city),
            (&mut self.state, state),
            (&mut self.pincode, pincode),
            (&mut self.father_name, father_name),
            (&mut self.mother_name, mother_name),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value.trim().to_string();
            }
        }
        if date_of_birth.is_some() {
            self.date_of_birth = date_of_birth;
        }
    }

    /// A saved profile needs a name.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingFields(vec!["name"]));
        }
        Ok(())
    }
}

/// Profile form input; absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub father_name: Option<String>,
    #[serde(default)]
    pub mother_name: Option<String>,
}

/// Narrowing applied to a student's own listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudentFilter {
    /// Exact status label; `None` or `"all"` keeps every status.
    #[serde(default)]
    pub status: Option<String>,
    /// Case-insensitive substring of the college name.
    #[serde(default)]
    pub q: Option<String>,
}

impl StudentFilter {
    pub fn admits(&self, application: &Application) -> bool {
        let status_matches = match self.status.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(status) if status.eq_ignore_ascii_case("all") => true,
            Some(status) => application.status == status,
        };
        let college_matches = self.q.as_deref().map_or(true, |needle| {
            application
                .college_name()
                .to_lowercase()
                .contains(&needle.trim().to_lowercase())
        });
        status_matches && college_matches
    }
}

/// Application totals shown on the student's status cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl StatusCounts {
    pub fn tally<'a>(applications: impl IntoIterator<Item = &'a Application>) -> Self {
        let mut counts = Self::default();
        for application in applications {
            counts.total += 1;
            *counts
                .by_status
                .entry(application.status.clone())
                .or_default() += 1;
        }
        counts
    }

    pub fn get(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or_default()
    }
}

/// A student's filtered listing with counts over all of their applications.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentListing {
    pub counts: StatusCounts,
    pub applications: Vec<Application>,
}

impl StudentListing {
    pub fn build(applications: Vec<Application>, filter: &StudentFilter) -> Self {
        let counts = StatusCounts::tally(&applications);
        let applications = applications
            .into_iter()
            .filter(|application| filter.admits(application))
            .collect();
        Self {
            counts,
            applications,
        }
    }
}
