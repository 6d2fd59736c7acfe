// Drought Payout Agent - Web Server
// REST API over one long-lived InsuranceAgent (axum)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use drought_payout::{
    load_csv, CycleOutcome, InsuranceAgent, MonitorConfig, PayoutError, SqliteLedger,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "payout-server", version, about = "Drought payout agent REST API")]
struct Args {
    /// Observation feed (CSV)
    #[arg(long)]
    data: PathBuf,

    /// Threshold config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ledger database
    #[arg(long, default_value = "payouts.db")]
    ledger: PathBuf,

    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    agent: Arc<InsuranceAgent<SqliteLedger>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Request understood but refused; the payload explains the refusal
    fn rejected(data: T, message: String) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn storage_failure<T: Serialize>(context: &str, e: PayoutError) -> Response {
    error!(error = %e, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<T>::fail(e.to_string())),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/summary - Monitored farmers, payouts made, total disbursed
async fn get_summary(State(state): State<AppState>) -> Response {
    match state.agent.summary() {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response(),
        Err(e) => storage_failure::<()>("Error building summary", e),
    }
}

/// GET /api/farmers - Farmer roster
async fn get_farmers(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.agent.farmers()))
}

/// GET /api/farmers/:id/report - Verdict, forecast and risk
async fn get_report(State(state): State<AppState>, Path(farmer_id): Path<String>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.agent.report_farmer(&farmer_id)))
}

/// POST /api/farmers/:id/payout - Run one monitoring cycle
async fn run_payout(State(state): State<AppState>, Path(farmer_id): Path<String>) -> Response {
    match state.agent.run_farmer(&farmer_id) {
        Ok(outcome) => {
            let (status, body) = payout_response(outcome);
            (status, Json(body)).into_response()
        }
        Err(e) => storage_failure::<()>("Error running payout cycle", e),
    }
}

/// 409 with `success: false` when the farmer was already paid
fn payout_response(outcome: CycleOutcome) -> (StatusCode, ApiResponse<CycleOutcome>) {
    let blocked = match &outcome {
        CycleOutcome::Blocked { reason, .. } => Some(reason.clone()),
        _ => None,
    };

    match blocked {
        Some(reason) => (StatusCode::CONFLICT, ApiResponse::rejected(outcome, reason)),
        None => (StatusCode::OK, ApiResponse::ok(outcome)),
    }
}

/// GET /api/ledger - Payout ledger in insertion order
async fn get_ledger(State(state): State<AppState>) -> Response {
    match state.agent.ledger() {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::ok(records))).into_response(),
        Err(e) => storage_failure::<()>("Error reading ledger", e),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🌐 Drought Payout Agent - Web Server");

    let config = match &args.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    let observations = load_csv(&args.data)?;
    let ledger = SqliteLedger::open(&args.ledger)?;
    info!(rows = observations.len(), ledger = ?args.ledger, "loaded feed and ledger");

    // Create shared state
    let state = AppState {
        agent: Arc::new(InsuranceAgent::new(config, observations, ledger)?),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/summary", get(get_summary))
        .route("/farmers", get(get_farmers))
        .route("/farmers/:id/report", get(get_report))
        .route("/farmers/:id/payout", post(run_payout))
        .route("/ledger", get(get_ledger))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    info!("🚀 Server running on http://{}", args.addr);

    axum::serve(listener, app).await?;

    Ok(())
}
