//! Application intake, the three-stage review pipeline, and fee assignment.
//!
//! Hosted identity and storage are reached only through the traits in
//! [`store`]; [`memory`] provides in-process versions for tests, demos, and
//! the local server.

pub mod dashboard;
pub mod domain;
pub mod fees;
pub mod memory;
pub mod profile;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use dashboard::{AdminDashboard, DashboardEvent, DashboardSettings, StageCounts, StageFilter};
pub use domain::{
    AcademicRecord, Application, ApplicationDraft, ApplicationId, ApplicationStatusView,
    CoursePreference, Credentials, DocumentFlags, DraftError, NewApplication, PersonalDetails,
    Registration, Role, Stage, StageError, UserAccount, UserId, STATUS_ACCEPTED, STATUS_REJECTED,
    STATUS_UNDER_REVIEW,
};
pub use fees::{FeeAssignment, FeeBreakdown, FeeComponent, FeeDetails, FeeError, PaymentStatus};
pub use memory::{InMemoryApplicationStore, InMemoryIdentityProvider};
pub use profile::{ProfileUpdate, StatusCounts, StudentFilter, StudentListing, StudentProfile};
pub use router::{admission_router, scholarship_router, PortalState};
pub use service::{AdmissionError, AdmissionService};
pub use store::{
    ApplicationStore, AuthError, AuthListener, IdentityProvider, ProfileStore, StoreError,
    Subscription,
};
