use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::admissions::dashboard::DashboardSettings;
use crate::admissions::domain::{
    AcademicRecord, Application, ApplicationDraft, ApplicationId, CoursePreference, Credentials,
    DocumentFlags, NewApplication, PersonalDetails, Registration, Role, Stage, UserAccount, UserId,
    STATUS_UNDER_REVIEW,
};
use crate::admissions::fees::{FeeAssignment, FeeDetails};
use crate::admissions::memory::{InMemoryApplicationStore, InMemoryIdentityProvider};
use crate::admissions::router::PortalState;
use crate::admissions::service::AdmissionService;
use crate::admissions::profile::StudentProfile;
use crate::admissions::store::{ApplicationStore, IdentityProvider, ProfileStore, StoreError};

pub(super) const PASSWORD: &str = "correct-horse";
pub(super) const COLLEGE: &str = "Riverside Institute of Technology";
pub(super) const OTHER_COLLEGE: &str = "Hillcrest College";

pub(super) type TestService = AdmissionService<InMemoryApplicationStore, InMemoryIdentityProvider>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn due_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 15).expect("valid date")
}

pub(super) fn draft(full_name: &str, college: &str) -> ApplicationDraft {
    let email = format!(
        "{}@example.com",
        full_name.to_ascii_lowercase().replace(' ', ".")
    );
    ApplicationDraft {
        personal: PersonalDetails {
            full_name: full_name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2007, 3, 14),
            gender: "female".to_string(),
            nationality: Some("Indian".to_string()),
            email,
            phone: "+91 98450 12345".to_string(),
            address: "12 Lake View Road".to_string(),
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            pincode: Some("411001".to_string()),
        },
        academic: AcademicRecord {
            last_school: "St. Mary's High School".to_string(),
            school_board: "CBSE".to_string(),
            grade10_percentage: Some(91.4),
            grade12_percentage: Some(88.0),
            stream: "Science".to_string(),
            achievements: None,
        },
        course: CoursePreference {
            course: "B.Tech".to_string(),
            specialization: Some("Computer Science".to_string()),
            college_name: college.to_string(),
            why_join: None,
        },
        documents: DocumentFlags {
            transcript: true,
            recommendation: false,
        },
    }
}

pub(super) fn fee_assignment() -> FeeAssignment {
    FeeAssignment {
        tuition_fee: Some(85_000),
        admission_fee: Some(5_000),
        library_fee: Some(1_500),
        laboratory_fee: Some(3_500),
        other_fees: None,
        due_date: Some(due_date()),
        payment_status: None,
    }
}

/// Application record built directly, bypassing the service.
pub(super) fn application(
    id: &str,
    full_name: &str,
    stage: Stage,
    applied_at: DateTime<Utc>,
) -> Application {
    let mut application = Application::from_new(
        ApplicationId(id.to_string()),
        NewApplication {
            student_id: UserId(format!("student-{id}")),
            draft: draft(full_name, COLLEGE),
            stage,
            status: STATUS_UNDER_REVIEW.to_string(),
            applied_at,
        },
    );
    if stage != Stage::Stage1 {
        let fees = fee_assignment()
            .into_fee_details(applied_at.date_naive())
            .expect("fixture fees are valid");
        application.fee_details = Some(fees);
    }
    application
}

pub(super) fn fees() -> FeeDetails {
    fee_assignment()
        .into_fee_details(now().date_naive())
        .expect("fixture fees are valid")
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryApplicationStore>,
    Arc<InMemoryIdentityProvider>,
) {
    let store = Arc::new(InMemoryApplicationStore::default());
    let identity = Arc::new(InMemoryIdentityProvider::default());
    let service = AdmissionService::with_clock(store.clone(), identity.clone(), now);
    (service, store, identity)
}

pub(super) fn build_state() -> (
    Arc<PortalState<InMemoryApplicationStore, InMemoryIdentityProvider>>,
    Arc<InMemoryApplicationStore>,
    Arc<InMemoryIdentityProvider>,
) {
    let (service, store, identity) = build_service();
    let state = Arc::new(PortalState::new(
        Arc::new(service),
        DashboardSettings::default(),
    ));
    (state, store, identity)
}

pub(super) fn register(
    identity: &InMemoryIdentityProvider,
    email: &str,
    role: Role,
    college: Option<&str>,
) -> UserAccount {
    identity
        .register(Registration {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            role,
            college: college.map(str::to_string),
        })
        .expect("registration succeeds")
}

pub(super) fn sign_in(identity: &InMemoryIdentityProvider, user: &UserAccount) {
    identity
        .sign_in(&Credentials {
            email: user.email.clone(),
            password: PASSWORD.to_string(),
            role: user.role,
        })
        .expect("sign in succeeds");
}

/// Registers a student and an admin of [`COLLEGE`], leaving nobody signed in.
pub(super) fn accounts(identity: &InMemoryIdentityProvider) -> (UserAccount, UserAccount) {
    let student = register(identity, "asha@example.com", Role::Student, None);
    let admin = register(identity, "registrar@riverside.edu", Role::Admin, Some(COLLEGE));
    (student, admin)
}

/// Submit a draft as `student`, leaving the student signed in.
pub(super) fn submit_as(
    service: &TestService,
    identity: &InMemoryIdentityProvider,
    student: &UserAccount,
    draft: ApplicationDraft,
) -> Application {
    sign_in(identity, student);
    service.submit(draft).expect("submission succeeds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}

/// Store whose backend is always down.
pub(super) struct UnavailableStore;

impl ProfileStore for UnavailableStore {
    fn fetch_profile(&self, _student: &UserId) -> Result<Option<StudentProfile>, StoreError> {
        Err(unavailable())
    }

    fn save_profile(&self, _profile: &StudentProfile) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

impl ApplicationStore for UnavailableStore {
    fn fetch_applications_by_college(
        &self,
        _college: &str,
    ) -> Result<Vec<Application>, StoreError> {
        Err(unavailable())
    }

    fn fetch_applications_by_student(
        &self,
        _student: &UserId,
    ) -> Result<Vec<Application>, StoreError> {
        Err(unavailable())
    }

    fn fetch_application_by_id(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<Application>, StoreError> {
        Err(unavailable())
    }

    fn create_application(&self, _application: NewApplication) -> Result<ApplicationId, StoreError> {
        Err(unavailable())
    }

    fn update_application_stage(
        &self,
        _id: &ApplicationId,
        _stage: Stage,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn update_application_status(
        &self,
        _id: &ApplicationId,
        _status: &str,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(unavailable())
    }

    fn save_fee_details(
        &self,
        _id: &ApplicationId,
        _fees: &FeeDetails,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("document store offline".to_string())
}
