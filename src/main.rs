use admission_portal::admissions::{
    admission_router, scholarship_router, AcademicRecord, AdminDashboard, AdmissionService,
    ApplicationDraft, CoursePreference, Credentials, DashboardEvent, DocumentFlags, FeeAssignment,
    InMemoryApplicationStore, InMemoryIdentityProvider, PersonalDetails, PortalState,
    Registration, Role,
};
use admission_portal::config::AppConfig;
use admission_portal::error::AppError;
use admission_portal::scholarship::import::{read_candidates_from_path, read_slabs_from_path};
use admission_portal::scholarship::{default_slabs, AllocationReport, ScholarshipAllocator};
use admission_portal::telemetry;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Admission Portal",
    about = "Run the admission portal service or its offline tools",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Offline scholarship tooling
    Scholarship {
        #[command(subcommand)]
        command: ScholarshipCommand,
    },
    /// Walk one application through the pipeline in memory and print each step
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum ScholarshipCommand {
    /// Allocate scholarships to candidates read from CSV
    Allocate(AllocateArgs),
}

#[derive(Args, Debug)]
struct AllocateArgs {
    /// Candidate CSV (id,name,academic_score,family_income,extracurricular_score,special_quota)
    #[arg(long)]
    candidates: PathBuf,
    /// Slab CSV (name,min_score,max_income,amount); defaults to the built-in slabs
    #[arg(long)]
    slabs: Option<PathBuf>,
    /// Total budget; defaults to PORTAL_SCHOLARSHIP_BUDGET
    #[arg(long)]
    budget: Option<u64>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Scholarship {
            command: ScholarshipCommand::Allocate(args),
        } => run_allocation(args),
        Command::Demo => run_demo(),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = AdmissionService::new(
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemoryIdentityProvider::default()),
    );
    let portal = Arc::new(PortalState::new(
        Arc::new(service),
        config.portal.dashboard_settings(),
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(admission_router(portal))
        .merge(scholarship_router(config.portal.scholarship_budget))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        recent_view_capacity = config.portal.recent_view_capacity,
        search_limit = config.portal.search_limit,
        "admission portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_allocation(args: AllocateArgs) -> Result<(), AppError> {
    let AllocateArgs {
        candidates,
        slabs,
        budget,
    } = args;

    let budget = match budget {
        Some(budget) => budget,
        None => AppConfig::load()?.portal.scholarship_budget,
    };
    let candidates = read_candidates_from_path(candidates)?;
    let slabs = match slabs {
        Some(path) => read_slabs_from_path(path)?,
        None => default_slabs(),
    };

    let allocator = ScholarshipAllocator::new(budget, slabs);
    let report = allocator.allocate(&candidates);
    render_allocation(&allocator, &report, candidates.len());
    Ok(())
}

fn render_allocation(allocator: &ScholarshipAllocator, report: &AllocationReport, total: usize) {
    println!("Scholarship allocation");
    println!(
        "Budget: {} across {} slab(s), {} candidate(s)",
        allocator.budget(),
        allocator.slabs().len(),
        total
    );

    if report.allocations.is_empty() {
        println!("\nAwards: none");
    } else {
        println!("\nAwards");
        for (id, allocation) in &report.allocations {
            println!(
                "- {} ({}): {} {} [score {:.2}]",
                id,
                allocation.candidate.name,
                allocation.slab.name,
                allocation.slab.amount,
                allocation.score
            );
        }
    }

    println!(
        "\nAllocated {} / remaining {}",
        report.total_allocated, report.remaining_budget
    );
}

const DEMO_COLLEGE: &str = "Riverside Institute of Technology";
const DEMO_PASSWORD: &str = "demo-password";

fn run_demo() -> Result<(), AppError> {
    let service = AdmissionService::new(
        Arc::new(InMemoryApplicationStore::default()),
        Arc::new(InMemoryIdentityProvider::default()),
    );

    println!("Admission pipeline demo");

    let admin = service.sign_up(Registration {
        email: "registrar@riverside.edu".to_string(),
        password: DEMO_PASSWORD.to_string(),
        role: Role::Admin,
        college: Some(DEMO_COLLEGE.to_string()),
    })?;
    let student = service.sign_up(Registration {
        email: "asha@example.com".to_string(),
        password: DEMO_PASSWORD.to_string(),
        role: Role::Student,
        college: None,
    })?;
    println!(
        "Registered {} ({}) and {} ({})",
        admin.email, admin.role, student.email, student.role
    );

    let submitted = service.submit(demo_draft())?;
    println!(
        "\nSubmitted {} for {}: {} / {}",
        submitted.id,
        submitted.full_name(),
        submitted.stage,
        submitted.status
    );

    service.sign_in(&Credentials {
        email: admin.email.clone(),
        password: DEMO_PASSWORD.to_string(),
        role: Role::Admin,
    })?;
    let due_date = Utc::now().date_naive() + Duration::days(30);
    let with_fees = service.assign_fees(&submitted.id, demo_fees(due_date))?;
    if let Some(fees) = &with_fees.fee_details {
        println!(
            "Fees assigned: total {} due {} ({:?}); now {}",
            fees.total(),
            fees.due_date(),
            fees.payment_status(),
            with_fees.stage
        );
    }

    service.sign_in(&Credentials {
        email: student.email.clone(),
        password: DEMO_PASSWORD.to_string(),
        role: Role::Student,
    })?;
    let accepted = service.accept_offer(&submitted.id)?;
    println!("Offer accepted: {} / {}", accepted.stage, accepted.status);

    let mut dashboard = AdminDashboard::new(DEMO_COLLEGE, 10, 5);
    dashboard.apply(DashboardEvent::Loaded(vec![submitted.clone()]));
    dashboard.apply(DashboardEvent::Updated(with_fees));
    dashboard.apply(DashboardEvent::Updated(accepted));

    let counts = dashboard.stage_counts();
    println!(
        "\nDashboard for {}: stage1 {}, stage2 {}, stage3 {}",
        dashboard.college(),
        counts.stage1,
        counts.stage2,
        counts.stage3
    );
    println!("Stage history");
    for transition in dashboard.stage_history(&submitted.id) {
        println!("- {} -> {} at {}", transition.from, transition.to, transition.at);
    }
    println!(
        "Audit snapshots: {}",
        dashboard.audit_history(&submitted.id).len()
    );

    Ok(())
}

fn demo_draft() -> ApplicationDraft {
    ApplicationDraft {
        personal: PersonalDetails {
            full_name: "Asha Verma".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2007, 3, 14),
            gender: "female".to_string(),
            nationality: Some("Indian".to_string()),
            email: "asha@example.com".to_string(),
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
            college_name: DEMO_COLLEGE.to_string(),
            why_join: None,
        },
        documents: DocumentFlags {
            transcript: true,
            recommendation: true,
        },
    }
}

fn demo_fees(due_date: NaiveDate) -> FeeAssignment {
    FeeAssignment {
        tuition_fee: Some(85_000),
        admission_fee: Some(5_000),
        library_fee: Some(1_500),
        laboratory_fee: Some(3_500),
        other_fees: None,
        due_date: Some(due_date),
        payment_status: None,
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["admission-portal"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn allocate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "admission-portal",
            "scholarship",
            "allocate",
            "--candidates",
            "candidates.csv",
            "--budget",
            "75000",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Scholarship {
                command: ScholarshipCommand::Allocate(args),
            }) => {
                assert_eq!(args.candidates, PathBuf::from("candidates.csv"));
                assert_eq!(args.budget, Some(75_000));
                assert!(args.slabs.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn demo_fees_are_due_on_the_requested_date() {
        let due = NaiveDate::from_ymd_opt(2030, 1, 31).expect("valid date");
        let fees = demo_fees(due)
            .into_fee_details(NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date"))
            .expect("valid fees");
        assert_eq!(fees.total(), 95_000);
        assert_eq!(fees.due_date(), due);
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: recorder.handle(),
        };

        let response = readiness_endpoint(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
