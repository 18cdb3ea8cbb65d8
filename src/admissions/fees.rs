use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fee validation and arithmetic failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("due date {due} is before {today}")]
    DueDateInPast { due: NaiveDate, today: NaiveDate },
    #[error("fee total overflowed")]
    Overflow,
    #[error("stored total {stored} does not match component sum {computed}")]
    TotalMismatch { stored: u64, computed: u64 },
}

/// Line items making up an application's fee structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeComponent {
    Tuition,
    Admission,
    Library,
    Laboratory,
    Other,
}

impl FeeComponent {
    pub const fn all() -> [FeeComponent; 5] {
        [
            FeeComponent::Tuition,
            FeeComponent::Admission,
            FeeComponent::Library,
            FeeComponent::Laboratory,
            FeeComponent::Other,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            FeeComponent::Tuition => "tuition_fee",
            FeeComponent::Admission => "admission_fee",
            FeeComponent::Library => "library_fee",
            FeeComponent::Laboratory => "laboratory_fee",
            FeeComponent::Other => "other_fees",
        }
    }
}

/// Payment state; anything other than the two well-known values is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Other(String),
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "Pending" | "pending" => PaymentStatus::Pending,
            "Paid" | "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Other(value),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(value: PaymentStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("Pending"),
            PaymentStatus::Paid => f.write_str("Paid"),
            PaymentStatus::Other(value) => f.write_str(value),
        }
    }
}

/// Fee structure attached to an application.
///
/// `total_fee` always equals the sum of the five components; it is recomputed
/// on every change and checked again when a stored record is deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredFeeDetails")]
pub struct FeeDetails {
    tuition_fee: u64,
    admission_fee: u64,
    library_fee: u64,
    laboratory_fee: u64,
    other_fees: u64,
    total_fee: u64,
    due_date: NaiveDate,
    payment_status: PaymentStatus,
}

/// Component amounts used to build a [`FeeDetails`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub tuition_fee: u64,
    pub admission_fee: u64,
    pub library_fee: u64,
    pub laboratory_fee: u64,
    pub other_fees: u64,
}

impl FeeDetails {
    pub fn new(breakdown: FeeBreakdown, due_date: NaiveDate) -> Result<Self, FeeError> {
        let mut details = Self {
            tuition_fee: breakdown.tuition_fee,
            admission_fee: breakdown.admission_fee,
            library_fee: breakdown.library_fee,
            laboratory_fee: breakdown.laboratory_fee,
            other_fees: breakdown.other_fees,
            total_fee: 0,
            due_date,
            payment_status: PaymentStatus::Pending,
        };
        details.total_fee = details.component_sum()?;
        Ok(details)
    }

    pub fn component(&self, component: FeeComponent) -> u64 {
        match component {
            FeeComponent::Tuition => self.tuition_fee,
            FeeComponent::Admission => self.admission_fee,
            FeeComponent::Library => self.library_fee,
            FeeComponent::Laboratory => self.laboratory_fee,
            FeeComponent::Other => self.other_fees,
        }
    }

    /// Change one component; the total follows. On overflow nothing changes.
    pub fn set_component(&mut self, component: FeeComponent, amount: u64) -> Result<(), FeeError> {
        let mut updated = self.clone();
        *updated.component_mut(component) = amount;
        updated.total_fee = updated.component_sum()?;
        *self = updated;
        Ok(())
    }

    pub fn total(&self) -> u64 {
        self.total_fee
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn set_due_date(&mut self, due_date: NaiveDate) {
        self.due_date = due_date;
    }

    pub fn payment_status(&self) -> &PaymentStatus {
        &self.payment_status
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
    }

    pub fn breakdown(&self) -> FeeBreakdown {
        FeeBreakdown {
            tuition_fee: self.tuition_fee,
            admission_fee: self.admission_fee,
            library_fee: self.library_fee,
            laboratory_fee: self.laboratory_fee,
            other_fees: self.other_fees,
        }
    }

    fn component_mut(&mut self, component: FeeComponent) -> &mut u64 {
        match component {
            FeeComponent::Tuition => &mut self.tuition_fee,
            FeeComponent::Admission => &mut self.admission_fee,
            FeeComponent::Library => &mut self.library_fee,
            FeeComponent::Laboratory => &mut self.laboratory_fee,
            FeeComponent::Other => &mut self.other_fees,
        }
    }

    fn component_sum(&self) -> Result<u64, FeeError> {
        FeeComponent::all()
            .into_iter()
            .try_fold(0u64, |sum, component| {
                sum.checked_add(self.component(component))
            })
            .ok_or(FeeError::Overflow)
    }
}

#[derive(Deserialize)]
struct StoredFeeDetails {
    tuition_fee: u64,
    admission_fee: u64,
    library_fee: u64,
    laboratory_fee: u64,
    other_fees: u64,
    total_fee: Option<u64>,
    due_date: NaiveDate,
    #[serde(default)]
    payment_status: PaymentStatus,
}

impl TryFrom<StoredFeeDetails> for FeeDetails {
    type Error = FeeError;

    fn try_from(stored: StoredFeeDetails) -> Result<Self, Self::Error> {
        let breakdown = FeeBreakdown {
            tuition_fee: stored.tuition_fee,
            admission_fee: stored.admission_fee,
            library_fee: stored.library_fee,
            laboratory_fee: stored.laboratory_fee,
            other_fees: stored.other_fees,
        };
        let mut details = FeeDetails::new(breakdown, stored.due_date)?;
        details.payment_status = stored.payment_status;

        match stored.total_fee {
            Some(total) if total != details.total_fee => Err(FeeError::TotalMismatch {
                stored: total,
                computed: details.total_fee,
            }),
            _ => Ok(details),
        }
    }
}

/// Fee form input submitted by an admin.
///
/// Tuition and the due date are required; other components default to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAssignment {
    #[serde(default)]
    pub tuition_fee: Option<u64>,
    #[serde(default)]
    pub admission_fee: Option<u64>,
    #[serde(default)]
    pub library_fee: Option<u64>,
    #[serde(default)]
    pub laboratory_fee: Option<u64>,
    #[serde(default)]
    pub other_fees: Option<u64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

impl FeeAssignment {
    /// Build a fresh fee structure; the due date may not be before `today`.
    pub fn into_fee_details(self, today: NaiveDate) -> Result<FeeDetails, FeeError> {
        self.replacing(None, today)
    }

    /// Build fees that replace `current`. Re-saving the due date already on
    /// record is allowed after it has passed; a new date may not be in the past.
    pub fn replacing(
        self,
        current: Option<&FeeDetails>,
        today: NaiveDate,
    ) -> Result<FeeDetails, FeeError> {
        let tuition_fee = self
            .tuition_fee
            .ok_or(FeeError::MissingField(FeeComponent::Tuition.label()))?;
        let due_date = self.due_date.ok_or(FeeError::MissingField("due_date"))?;
        let unchanged = current.map(FeeDetails::due_date) == Some(due_date);
        if due_date < today && !unchanged {
            return Err(FeeError::DueDateInPast {
                due: due_date,
                today,
            });
        }

        let breakdown = FeeBreakdown {
            tuition_fee,
            admission_fee: self.admission_fee.unwrap_or_default(),
            library_fee: self.library_fee.unwrap_or_default(),
            laboratory_fee: self.laboratory_fee.unwrap_or_default(),
            other_fees: self.other_fees.unwrap_or_default(),
        };

        let mut details = FeeDetails::new(breakdown, due_date)?;
        if let Some(status) = self.payment_status {
            details.set_payment_status(status);
        }
        Ok(details)
    }
}
