//! Boundary to the hosted identity and document-store collaborators.
//!
//! The portal never talks to a global client; services receive these traits
//! explicitly so tests and the local server can supply in-memory versions.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, Credentials, NewApplication, Registration, Stage, UserAccount,
    UserId,
};
use super::fees::FeeDetails;
use super::profile::StudentProfile;

/// Student profiles, one document per account.
pub trait ProfileStore: Send + Sync {
    fn fetch_profile(&self, student: &UserId) -> Result<Option<StudentProfile>, StoreError>;

    /// Create or replace the profile keyed by `profile.student_id`.
    fn save_profile(&self, profile: &StudentProfile) -> Result<(), StoreError>;
}

/// Document store holding application records next to student profiles.
pub trait ApplicationStore: ProfileStore {
    fn fetch_applications_by_college(&self, college: &str)
        -> Result<Vec<Application>, StoreError>;

    fn fetch_applications_by_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<Application>, StoreError>;

    fn fetch_application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, StoreError>;

    /// Persist a new application, returning the identifier the store assigned.
    fn create_application(&self, application: NewApplication) -> Result<ApplicationId, StoreError>;

    fn update_application_stage(
        &self,
        id: &ApplicationId,
        stage: Stage,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn update_application_status(
        &self,
        id: &ApplicationId,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn save_fee_details(
        &self,
        id: &ApplicationId,
        fees: &FeeDetails,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Error enumeration for document-store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Callback invoked with the signed-in user (or `None`) whenever auth state changes.
pub type AuthListener = Arc<dyn Fn(Option<&UserAccount>) + Send + Sync>;

/// Handle returned by [`IdentityProvider::on_auth_state_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(pub u64);

/// Hosted authentication service.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserAccount>;

    /// Register `listener`; it is called once immediately with the current state.
    fn on_auth_state_changed(&self, listener: AuthListener) -> Subscription;

    fn unsubscribe(&self, subscription: Subscription);

    fn sign_in(&self, credentials: &Credentials) -> Result<UserAccount, AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;

    /// Create an account and sign it in.
    fn sign_up(&self, registration: Registration) -> Result<UserAccount, AuthError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is not registered as {0}")]
    RoleMismatch(super::domain::Role),
    #[error("an account already exists for {0}")]
    EmailInUse(String),
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("admin accounts must name a college")]
    MissingCollege,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}
