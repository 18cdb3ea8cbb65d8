use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{
    Application, ApplicationDraft, ApplicationId, Credentials, DraftError, NewApplication,
    Registration, Role, Stage, StageError, UserAccount, STATUS_ACCEPTED, STATUS_REJECTED,
    STATUS_UNDER_REVIEW,
};
use super::fees::{FeeAssignment, FeeError};
use super::profile::{ProfileUpdate, StudentFilter, StudentListing, StudentProfile};
use super::store::{ApplicationStore, AuthError, IdentityProvider, StoreError};

/// Use cases behind the student and admin screens.
///
/// Collaborators are injected; the service keeps no state of its own beyond
/// the clock used to stamp records.
pub struct AdmissionService<S, I> {
    store: Arc<S>,
    identity: Arc<I>,
    clock: fn() -> DateTime<Utc>,
}

impl<S, I> AdmissionService<S, I>
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(store: Arc<S>, identity: Arc<I>) -> Self {
        Self::with_clock(store, identity, Utc::now)
    }

    pub fn with_clock(store: Arc<S>, identity: Arc<I>, clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            store,
            identity,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<I> {
        &self.identity
    }

    pub fn sign_in(&self, credentials: &Credentials) -> Result<UserAccount, AdmissionError> {
        let user = self.identity.sign_in(credentials)?;
        info!(user = %user.id, role = %user.role, "signed in");
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<(), AdmissionError> {
        self.identity.sign_out()?;
        info!("signed out");
        Ok(())
    }

    pub fn sign_up(&self, registration: Registration) -> Result<UserAccount, AdmissionError> {
        let user = self.identity.sign_up(registration)?;
        info!(user = %user.id, role = %user.role, "account created");
        Ok(user)
    }

    /// Store a validated draft for the signed-in student.
    pub fn submit(&self, draft: ApplicationDraft) -> Result<Application, AdmissionError> {
        let student = self.require_role(Role::Student)?;
        draft.validate()?;

        let applied_at = (self.clock)();
        let id = self.store.create_application(NewApplication {
            student_id: student.id.clone(),
            draft,
            stage: Stage::Stage1,
            status: STATUS_UNDER_REVIEW.to_string(),
            applied_at,
        })?;

        info!(application = %id, student = %student.id, "application submitted");
        self.get(&id)
    }

    /// Applications for the signed-in admin's college.
    pub fn applications_for_admin(&self) -> Result<Vec<Application>, AdmissionError> {
        let college = self.admin_college()?;
        let applications = self.store.fetch_applications_by_college(&college)?;
        debug!(%college, count = applications.len(), "loaded college applications");
        Ok(applications)
    }

    /// The signed-in student's applications, newest first.
    pub fn applications_for_student(&self) -> Result<Vec<Application>, AdmissionError> {
        let student = self.require_role(Role::Student)?;
        let mut applications = self.store.fetch_applications_by_student(&student.id)?;
        applications.sort_by(|left, right| right.applied_at.cmp(&left.applied_at));
        Ok(applications)
    }

    /// The signed-in student's listing narrowed by `filter`, with status
    /// counts taken over every one of their applications.
    pub fn student_dashboard(
        &self,
        filter: &StudentFilter,
    ) -> Result<StudentListing, AdmissionError> {
        let applications = self.applications_for_student()?;
        Ok(StudentListing::build(applications, filter))
    }

    /// The signed-in student's profile, blank until first saved.
    pub fn profile(&self) -> Result<StudentProfile, AdmissionError> {
        let student = self.require_role(Role::Student)?;
        let mut profile = self
            .store
            .fetch_profile(&student.id)?
            .unwrap_or_else(|| StudentProfile::blank(&student));
        profile.email = student.email;
        Ok(profile)
    }

    /// Merge `update` into the signed-in student's profile and store it.
    pub fn save_profile(&self, update: ProfileUpdate) -> Result<StudentProfile, AdmissionError> {
        let mut profile = self.profile()?;
        profile.merge(update);
        profile.validate()?;
        profile.updated_at = Some((self.clock)());

        self.store.save_profile(&profile)?;
        info!(student = %profile.student_id, "profile saved");
        Ok(profile)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, AdmissionError> {
        self.store
            .fetch_application_by_id(id)?
            .ok_or_else(|| AdmissionError::NotFound(id.clone()))
    }

    /// Fetch an application the signed-in user may see: owners and admins of its college.
    pub fn view(&self, id: &ApplicationId) -> Result<Application, AdmissionError> {
        let user = self.require_user()?;
        let application = self.get(id)?;
        match user.role {
            Role::Student if application.student_id == user.id => Ok(application),
            Role::Admin if user.college.as_deref() == Some(application.college_name()) => {
                Ok(application)
            }
            _ => Err(AdmissionError::Forbidden(
                "application belongs to another account",
            )),
        }
    }

    /// Move an application one stage forward on behalf of its college's admin.
    pub fn advance_stage(
        &self,
        id: &ApplicationId,
        target: Stage,
    ) -> Result<Application, AdmissionError> {
        let mut application = self.admin_application(id)?;
        if target == Stage::Stage3 {
            return Err(StageError::AcceptanceOnly(Stage::Stage3).into());
        }
        application.check_transition(target)?;

        let at = (self.clock)();
        self.store.update_application_stage(id, target, at)?;
        info!(application = %id, from = %application.stage, to = %target, "stage advanced");

        application.stage = target;
        application.last_updated = at;
        Ok(application)
    }

    /// Record the fee structure; a `stage1` application moves to `stage2` with it.
    pub fn assign_fees(
        &self,
        id: &ApplicationId,
        assignment: FeeAssignment,
    ) -> Result<Application, AdmissionError> {
        let mut application = self.admin_application(id)?;
        if application.stage == Stage::Stage3 {
            return Err(StageError::NotForward {
                from: Stage::Stage3,
                to: Stage::Stage2,
            }
            .into());
        }

        let at = (self.clock)();
        let fees = assignment.replacing(application.fee_details.as_ref(), at.date_naive())?;
        self.store.save_fee_details(id, &fees, at)?;
        info!(application = %id, total = fees.total(), due = %fees.due_date(), "fees assigned");

        application.fee_details = Some(fees);
        application.last_updated = at;

        if application.stage == Stage::Stage1 {
            application.check_transition(Stage::Stage2)?;
            self.store.update_application_stage(id, Stage::Stage2, at)?;
            info!(application = %id, from = %Stage::Stage1, to = %Stage::Stage2, "stage advanced");
            application.stage = Stage::Stage2;
        }

        Ok(application)
    }

    /// Mark an application rejected without moving it through the pipeline.
    pub fn reject(&self, id: &ApplicationId) -> Result<Application, AdmissionError> {
        let mut application = self.admin_application(id)?;
        if application.stage == Stage::Stage3 {
            return Err(AdmissionError::Forbidden("accepted offers cannot be rejected"));
        }

        let at = (self.clock)();
        self.store.update_application_status(id, STATUS_REJECTED, at)?;
        info!(application = %id, "application rejected");

        application.status = STATUS_REJECTED.to_string();
        application.last_updated = at;
        Ok(application)
    }

    /// The owning student accepts the offer attached to a `stage2` application.
    pub fn accept_offer(&self, id: &ApplicationId) -> Result<Application, AdmissionError> {
        let student = self.require_role(Role::Student)?;
        let mut application = self.get(id)?;
        if application.student_id != student.id {
            return Err(AdmissionError::Forbidden(
                "only the applicant can accept this offer",
            ));
        }
        if application.status == STATUS_REJECTED {
            return Err(AdmissionError::Forbidden("application was rejected"));
        }
        if application.stage != Stage::Stage2 {
            return Err(StageError::NotOffered {
                required: Stage::Stage2,
                found: application.stage,
            }
            .into());
        }

        let at = (self.clock)();
        self.store.update_application_stage(id, Stage::Stage3, at)?;
        self.store.update_application_status(id, STATUS_ACCEPTED, at)?;
        info!(application = %id, student = %student.id, "offer accepted");

        application.stage = Stage::Stage3;
        application.status = STATUS_ACCEPTED.to_string();
        application.last_updated = at;
        Ok(application)
    }

    fn require_user(&self) -> Result<UserAccount, AdmissionError> {
        self.identity
            .current_user()
            .ok_or(AdmissionError::Unauthenticated)
    }

    fn require_role(&self, role: Role) -> Result<UserAccount, AdmissionError> {
        let user = self.require_user()?;
        if user.role != role {
            return Err(AdmissionError::Forbidden(match role {
                Role::Student => "students only",
                Role::Admin => "admins only",
            }));
        }
        Ok(user)
    }

    /// College managed by the signed-in admin.
    pub fn admin_college(&self) -> Result<String, AdmissionError> {
        let admin = self.require_role(Role::Admin)?;
        admin
            .college
            .filter(|college| !college.trim().is_empty())
            .ok_or(AdmissionError::MissingCollege)
    }

    fn admin_application(&self, id: &ApplicationId) -> Result<Application, AdmissionError> {
        let college = self.admin_college()?;
        let application = self.get(id)?;
        if application.college_name() != college {
            return Err(AdmissionError::Forbidden(
                "application belongs to another college",
            ));
        }
        Ok(application)
    }
}

/// Error raised by the admission service.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("sign in required")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("admin account has no college")]
    MissingCollege,
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Fee(#[from] FeeError),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
