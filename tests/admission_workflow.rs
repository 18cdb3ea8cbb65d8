use admission_portal::admissions::{
    admission_router, AcademicRecord, AdmissionService, ApplicationDraft, CoursePreference,
    DashboardSettings, DocumentFlags, InMemoryApplicationStore, InMemoryIdentityProvider,
    PersonalDetails, PortalState,
};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const COLLEGE: &str = "Riverside Institute of Technology";
const PASSWORD: &str = "open-sesame";

fn portal() -> Router {
    let service = AdmissionService::new(
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemoryIdentityProvider::default()),
    );
    admission_router(Arc::new(PortalState::new(
        Arc::new(service),
        DashboardSettings::default(),
    )))
}

fn draft(full_name: &str, email: &str) -> ApplicationDraft {
    ApplicationDraft {
        personal: PersonalDetails {
            full_name: full_name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2006, 11, 2),
            gender: "male".to_string(),
            nationality: None,
            email: email.to_string(),
            phone: "+91 99000 11223".to_string(),
            address: "4 Temple Street".to_string(),
            city: None,
            state: None,
            pincode: None,
        },
        academic: AcademicRecord {
            last_school: "Kendriya Vidyalaya".to_string(),
            school_board: "CBSE".to_string(),
            grade10_percentage: Some(84.0),
            grade12_percentage: Some(86.5),
            stream: "Commerce".to_string(),
            achievements: Some("State debate finalist".to_string()),
        },
        course: CoursePreference {
            course: "B.Com".to_string(),
            specialization: None,
            college_name: COLLEGE.to_string(),
            why_join: None,
        },
        documents: DocumentFlags {
            transcript: true,
            recommendation: true,
        },
    }
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}

async fn sign_in(router: &Router, email: &str, role: &str) {
    let response = call(
        router,
        Method::POST,
        "/api/v1/session",
        Some(json!({ "email": email, "password": PASSWORD, "role": role })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "sign in as {email}");
}

async fn sign_up(router: &Router, body: Value) {
    let response = call(router, Method::POST, "/api/v1/users", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn application_moves_from_intake_to_acceptance() {
    let router = portal();
    sign_up(
        &router,
        json!({ "email": "admissions@riverside.edu", "password": PASSWORD,
                "role": "admin", "college": COLLEGE }),
    )
    .await;
    sign_up(
        &router,
        json!({ "email": "Rohan@Example.com", "password": PASSWORD, "role": "student" }),
    )
    .await;

    let draft = serde_json::to_value(draft("Rohan Mehta", "rohan@example.com"))
        .expect("draft serializes");
    let response = call(&router, Method::POST, "/api/v1/applications", Some(draft)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let submitted = json_body(response).await;
    let id = submitted["application_id"]
        .as_str()
        .expect("application id")
        .to_string();
    let base = format!("/api/v1/applications/{id}");

    sign_in(&router, "admissions@riverside.edu", "admin").await;
    let dashboard = json_body(call(&router, Method::GET, "/api/v1/dashboard", None).await).await;
    assert_eq!(dashboard["counts"]["stage1"], json!(1));
    assert_eq!(dashboard["urgent"][0]["application_id"], json!(id));

    let due_date = (Utc::now().date_naive() + Duration::days(30)).to_string();
    let response = call(
        &router,
        Method::PUT,
        &format!("{base}/fees"),
        Some(json!({ "tuition_fee": 60000, "admission_fee": 4000, "due_date": due_date })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let offered = json_body(response).await;
    assert_eq!(offered["stage"], json!("stage2"));
    assert_eq!(offered["fee_details"]["total_fee"], json!(64_000));

    // emails are matched case-insensitively
    sign_in(&router, "ROHAN@example.com", "student").await;
    let response = call(&router, Method::POST, &format!("{base}/accept"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let accepted = json_body(response).await;
    assert_eq!(accepted["stage"], json!("stage3"));
    assert_eq!(accepted["status"], json!("accepted"));

    let listing = json_body(call(&router, Method::GET, "/api/v1/applications", None).await).await;
    assert_eq!(listing[0]["stage_label"], json!("Final Approval"));
    assert_eq!(listing[0]["total_fee"], json!(64_000));

    sign_in(&router, "admissions@riverside.edu", "admin").await;
    let response = call(
        &router,
        Method::GET,
        &format!("/api/v1/dashboard/applications/{id}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let opened = json_body(response).await;
    let moves: Vec<(String, String)> = opened["stage_history"]
        .as_array()
        .expect("history array")
        .iter()
        .map(|step| {
            (
                step["from"].as_str().unwrap_or_default().to_string(),
                step["to"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    assert_eq!(
        moves,
        vec![
            ("stage1".to_string(), "stage2".to_string()),
            ("stage2".to_string(), "stage3".to_string()),
        ]
    );
    assert_eq!(opened["audit_history"].as_array().map(Vec::len), Some(3));
    assert_eq!(opened["status_history"][0]["from"], json!("under_review"));
    assert_eq!(opened["status_history"][0]["to"], json!("accepted"));

    let dashboard = json_body(call(&router, Method::GET, "/api/v1/dashboard", None).await).await;
    assert_eq!(dashboard["counts"], json!({ "stage1": 0, "stage2": 0, "stage3": 1 }));
    assert_eq!(dashboard["recently_viewed"][0]["application_id"], json!(id));
    assert!(dashboard["urgent"].as_array().map_or(false, Vec::is_empty));
}

#[tokio::test]
async fn rejected_applicants_cannot_accept() {
    let router = portal();
    sign_up(
        &router,
        json!({ "email": "admissions@riverside.edu", "password": PASSWORD,
                "role": "admin", "college": COLLEGE }),
    )
    .await;
    sign_up(
        &router,
        json!({ "email": "tara@example.com", "password": PASSWORD, "role": "student" }),
    )
    .await;

    let draft = serde_json::to_value(draft("Tara Nair", "tara@example.com")).expect("serializes");
    let submitted =
        json_body(call(&router, Method::POST, "/api/v1/applications", Some(draft)).await).await;
    let base = format!(
        "/api/v1/applications/{}",
        submitted["application_id"].as_str().expect("application id")
    );

    sign_in(&router, "admissions@riverside.edu", "admin").await;
    let response = call(&router, Method::POST, &format!("{base}/reject"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], json!("rejected"));

    sign_in(&router, "tara@example.com", "student").await;
    let response = call(&router, Method::POST, &format!("{base}/accept"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_and_weak_registrations_are_refused() {
    let router = portal();
    sign_up(
        &router,
        json!({ "email": "tara@example.com", "password": PASSWORD, "role": "student" }),
    )
    .await;

    let response = call(
        &router,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "email": "TARA@example.com", "password": PASSWORD, "role": "student" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = call(
        &router,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "email": "new@example.com", "password": "abc", "role": "student" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = call(
        &router,
        Method::POST,
        "/api/v1/users",
        Some(json!({ "email": "dean@example.com", "password": PASSWORD, "role": "admin" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn students_cannot_open_the_dashboard() {
    let router = portal();
    sign_up(
        &router,
        json!({ "email": "tara@example.com", "password": PASSWORD, "role": "student" }),
    )
    .await;

    let response = call(&router, Method::GET, "/api/v1/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = call(&router, Method::DELETE, "/api/v1/session", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = call(&router, Method::GET, "/api/v1/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_keep_a_profile_and_filter_their_applications() {
    let router = portal();
    sign_up(
        &router,
        json!({ "email": "tara@example.com", "password": PASSWORD, "role": "student" }),
    )
    .await;

    let response = call(
        &router,
        Method::PUT,
        "/api/v1/profile",
        Some(json!({ "name": "Tara Nair", "state": "Kerala", "date_of_birth": "2006-04-09" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = json_body(call(&router, Method::GET, "/api/v1/profile", None).await).await;
    assert_eq!(profile["name"], json!("Tara Nair"));
    assert_eq!(profile["date_of_birth"], json!("2006-04-09"));
    assert!(profile["updated_at"].is_string());

    let draft = serde_json::to_value(draft("Tara Nair", "tara@example.com")).expect("serializes");
    let response = call(&router, Method::POST, "/api/v1/applications", Some(draft)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let listing = json_body(
        call(
            &router,
            Method::GET,
            "/api/v1/student/dashboard?q=riverside",
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listing["counts"]["total"], json!(1));
    assert_eq!(listing["counts"]["by_status"]["under_review"], json!(1));
    assert_eq!(listing["applications"][0]["college_name"], json!(COLLEGE));

    let listing = json_body(
        call(
            &router,
            Method::GET,
            "/api/v1/student/dashboard?q=hillcrest",
            None,
        )
        .await,
    )
    .await;
    assert_eq!(listing["counts"]["total"], json!(1));
    assert!(listing["applications"]
        .as_array()
        .map_or(false, Vec::is_empty));
}
