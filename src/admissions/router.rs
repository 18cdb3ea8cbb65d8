use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::dashboard::{AdminDashboard, DashboardEvent, DashboardSettings, StageCounts, StageFilter};
use super::domain::{
    Application, ApplicationDraft, ApplicationId, ApplicationStatusView, Credentials, DraftError,
    Registration, Role, Stage, StageError,
};
use super::fees::FeeAssignment;
use super::profile::{ProfileUpdate, StatusCounts, StudentFilter};
use super::service::{AdmissionError, AdmissionService};
use super::store::{ApplicationStore, AuthError, IdentityProvider, StoreError};
use crate::collections::{HistoryEntry, Transition};
use crate::error::AppError;
use crate::scholarship::{
    default_slabs, read_candidates, read_slabs, AllocationReport, ScholarshipAllocator,
    ScholarshipCandidate, ScholarshipSlab,
};

/// Shared state behind the admission routes.
pub struct PortalState<S, I> {
    service: Arc<AdmissionService<S, I>>,
    dashboards: Mutex<HashMap<String, AdminDashboard>>,
    settings: DashboardSettings,
}

impl<S, I> PortalState<S, I>
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(service: Arc<AdmissionService<S, I>>, settings: DashboardSettings) -> Self {
        Self {
            service,
            dashboards: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn service(&self) -> &Arc<AdmissionService<S, I>> {
        &self.service
    }

    /// Push a changed record into the dashboard of its college, if one is open.
    fn refresh_dashboard(&self, application: &Application) {
        let mut dashboards = self.dashboards.lock().expect("dashboard mutex poisoned");
        if let Some(dashboard) = dashboards.get_mut(application.college_name()) {
            dashboard.apply(DashboardEvent::Updated(application.clone()));
        }
    }
}

/// Router exposing session, intake, pipeline, and dashboard endpoints.
pub fn admission_router<S, I>(state: Arc<PortalState<S, I>>) -> Router
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/session",
            post(sign_in_handler::<S, I>).delete(sign_out_handler::<S, I>),
        )
        .route("/api/v1/users", post(sign_up_handler::<S, I>))
        .route(
            "/api/v1/applications",
            post(submit_handler::<S, I>).get(list_handler::<S, I>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(view_handler::<S, I>),
        )
        .route(
            "/api/v1/applications/:application_id/stage",
            post(stage_handler::<S, I>),
        )
        .route(
            "/api/v1/applications/:application_id/fees",
            put(fees_handler::<S, I>),
        )
        .route(
            "/api/v1/applications/:application_id/accept",
            post(accept_handler::<S, I>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<S, I>),
        )
        .route(
            "/api/v1/profile",
            get(profile_handler::<S, I>).put(save_profile_handler::<S, I>),
        )
        .route(
            "/api/v1/student/dashboard",
            get(student_dashboard_handler::<S, I>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<S, I>))
        .route(
            "/api/v1/dashboard/applications/:application_id",
            get(dashboard_open_handler::<S, I>),
        )
        .with_state(state)
}

/// Router exposing the stateless scholarship allocator.
pub fn scholarship_router(default_budget: u64) -> Router {
    Router::new()
        .route("/api/v1/scholarships/allocate", post(allocate_handler))
        .with_state(default_budget)
}

pub(crate) async fn sign_in_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Json(credentials): Json<Credentials>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.sign_in(&credentials) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sign_out_handler<S, I>(State(state): State<Arc<PortalState<S, I>>>) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.sign_out() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sign_up_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Json(registration): Json<Registration>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.sign_up(registration) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Json(draft): Json<ApplicationDraft>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.submit(draft) {
        Ok(application) => {
            state.refresh_dashboard(&application);
            (StatusCode::CREATED, Json(application.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<S, I>(State(state): State<Arc<PortalState<S, I>>>) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let listing = match state.service.identity().current_user().map(|user| user.role) {
        Some(Role::Admin) => state.service.applications_for_admin(),
        Some(Role::Student) => state.service.applications_for_student(),
        None => Err(AdmissionError::Unauthenticated),
    };

    match listing {
        Ok(applications) => {
            let views: Vec<ApplicationStatusView> =
                applications.iter().map(Application::status_view).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.view(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn profile_handler<S, I>(State(state): State<Arc<PortalState<S, I>>>) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.profile() {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_profile_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Json(update): Json<ProfileUpdate>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.save_profile(update) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboardResponse {
    pub(crate) counts: StatusCounts,
    pub(crate) applications: Vec<ApplicationStatusView>,
}

pub(crate) async fn student_dashboard_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Query(filter): Query<StudentFilter>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match state.service.student_dashboard(&filter) {
        Ok(listing) => {
            let response = StudentDashboardResponse {
                counts: listing.counts,
                applications: listing
                    .applications
                    .iter()
                    .map(Application::status_view)
                    .collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StageRequest {
    pub(crate) stage: Stage,
}

pub(crate) async fn stage_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Path(application_id): Path<String>,
    Json(request): Json<StageRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let result = state
        .service
        .advance_stage(&ApplicationId(application_id), request.stage);
    updated_response(&state, result)
}

pub(crate) async fn fees_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Path(application_id): Path<String>,
    Json(assignment): Json<FeeAssignment>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let result = state
        .service
        .assign_fees(&ApplicationId(application_id), assignment);
    updated_response(&state, result)
}

pub(crate) async fn accept_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let result = state.service.accept_offer(&ApplicationId(application_id));
    updated_response(&state, result)
}

pub(crate) async fn reject_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let result = state.service.reject(&ApplicationId(application_id));
    updated_response(&state, result)
}

fn updated_response<S, I>(
    state: &PortalState<S, I>,
    result: Result<Application, AdmissionError>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    match result {
        Ok(application) => {
            state.refresh_dashboard(&application);
            (StatusCode::OK, Json(application)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    #[serde(default)]
    pub(crate) stage: Option<String>,
    #[serde(default)]
    pub(crate) q: Option<String>,
    #[serde(default)]
    pub(crate) urgent: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    pub(crate) college: String,
    pub(crate) filter: String,
    pub(crate) counts: StageCounts,
    pub(crate) applications: Vec<ApplicationStatusView>,
    pub(crate) urgent: Vec<ApplicationStatusView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) matches: Option<Vec<ApplicationStatusView>>,
    pub(crate) recently_viewed: Vec<ApplicationStatusView>,
}

const DEFAULT_URGENT_LIMIT: usize = 5;

pub(crate) async fn dashboard_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Query(query): Query<DashboardQuery>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let filter = match query.stage.as_deref().map(str::parse::<StageFilter>) {
        None => StageFilter::All,
        Some(Ok(filter)) => filter,
        Some(Err(error)) => return error_response(error.into()),
    };

    let (college, applications) = match load_for_admin(&state.service) {
        Ok(loaded) => loaded,
        Err(error) => return error_response(error),
    };

    let mut dashboards = state.dashboards.lock().expect("dashboard mutex poisoned");
    let dashboard = dashboards
        .entry(college.clone())
        .or_insert_with(|| AdminDashboard::with_settings(college.clone(), state.settings));
    dashboard.apply(DashboardEvent::Loaded(applications));
    dashboard.apply(DashboardEvent::FilterChanged(filter));

    let views = |applications: Vec<&Application>| -> Vec<ApplicationStatusView> {
        applications
            .into_iter()
            .map(Application::status_view)
            .collect()
    };

    let response = DashboardResponse {
        college,
        filter: filter.to_string(),
        counts: dashboard.stage_counts(),
        applications: views(dashboard.by_applied_date()),
        urgent: views(dashboard.urgent(query.urgent.unwrap_or(DEFAULT_URGENT_LIMIT))),
        matches: query.q.as_deref().map(|prefix| views(dashboard.search(prefix))),
        recently_viewed: views(dashboard.recently_viewed()),
    };

    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenedApplication {
    pub(crate) application: Application,
    pub(crate) stage_history: Vec<Transition>,
    pub(crate) status_history: Vec<Transition>,
    pub(crate) audit_history: Vec<HistoryEntry<Application>>,
}

pub(crate) async fn dashboard_open_handler<S, I>(
    State(state): State<Arc<PortalState<S, I>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let id = ApplicationId(application_id);
    let (college, applications) = match load_for_admin(&state.service) {
        Ok(loaded) => loaded,
        Err(error) => return error_response(error),
    };

    let mut dashboards = state.dashboards.lock().expect("dashboard mutex poisoned");
    let dashboard = dashboards
        .entry(college.clone())
        .or_insert_with(|| AdminDashboard::with_settings(college, state.settings));
    dashboard.apply(DashboardEvent::Loaded(applications));

    let Some(application) = dashboard.open(&id).cloned() else {
        return error_response(AdmissionError::NotFound(id));
    };

    let opened = OpenedApplication {
        application,
        stage_history: dashboard.stage_history(&id),
        status_history: dashboard.status_changes(&id),
        audit_history: dashboard
            .audit_history(&id)
            .into_iter()
            .cloned()
            .collect(),
    };
    (StatusCode::OK, Json(opened)).into_response()
}

fn load_for_admin<S, I>(
    service: &AdmissionService<S, I>,
) -> Result<(String, Vec<Application>), AdmissionError>
where
    S: ApplicationStore + 'static,
    I: IdentityProvider + 'static,
{
    let college = service.admin_college()?;
    let applications = service.applications_for_admin()?;
    Ok((college, applications))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllocationRequest {
    #[serde(default)]
    pub(crate) candidates: Vec<ScholarshipCandidate>,
    /// CSV export of candidates; replaces `candidates` when present.
    #[serde(default)]
    pub(crate) candidates_csv: Option<String>,
    #[serde(default)]
    pub(crate) slabs: Option<Vec<ScholarshipSlab>>,
    #[serde(default)]
    pub(crate) slabs_csv: Option<String>,
    #[serde(default)]
    pub(crate) budget: Option<u64>,
}

pub(crate) async fn allocate_handler(
    State(default_budget): State<u64>,
    Json(request): Json<AllocationRequest>,
) -> Result<Json<AllocationReport>, AppError> {
    let AllocationRequest {
        candidates,
        candidates_csv,
        slabs,
        slabs_csv,
        budget,
    } = request;

    let candidates = match candidates_csv {
        Some(csv) => read_candidates(Cursor::new(csv.into_bytes()))?,
        None => candidates,
    };
    let slabs = match (slabs_csv, slabs) {
        (Some(csv), _) => read_slabs(Cursor::new(csv.into_bytes()))?,
        (None, Some(slabs)) => slabs,
        (None, None) => default_slabs(),
    };

    let allocator = ScholarshipAllocator::new(budget.unwrap_or(default_budget), slabs);
    Ok(Json(allocator.allocate(&candidates)))
}

/// Map a service failure onto an HTTP status and JSON error body.
pub(crate) fn error_response(error: AdmissionError) -> Response {
    let status = match &error {
        AdmissionError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AdmissionError::Forbidden(_) | AdmissionError::MissingCollege => StatusCode::FORBIDDEN,
        AdmissionError::NotFound(_) | AdmissionError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        AdmissionError::Draft(_) | AdmissionError::Fee(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::Stage(StageError::Unknown(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::Stage(_) => StatusCode::CONFLICT,
        AdmissionError::Store(StoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        AdmissionError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AdmissionError::Auth(AuthError::InvalidCredentials | AuthError::RoleMismatch(_)) => {
            StatusCode::UNAUTHORIZED
        }
        AdmissionError::Auth(AuthError::EmailInUse(_)) => StatusCode::CONFLICT,
        AdmissionError::Auth(AuthError::WeakPassword(_) | AuthError::MissingCollege) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AdmissionError::Auth(AuthError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = match &error {
        AdmissionError::Draft(DraftError::MissingFields(fields)) => json!({
            "error": error.to_string(),
            "fields": fields,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, Json(payload)).into_response()
}
