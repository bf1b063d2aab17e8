//! services/expiry_worker/src/web/rest.rs
//!
//! Contains the Axum handlers for the operator endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::NaiveDateTime;
use freshness_core::SweepReport;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        run_sweep_handler,
    ),
    components(
        schemas(HealthResponse, SweepReportResponse)
    ),
    tags(
        (
            name = "Expiry Worker API",
            description = "Operator endpoints for the expiry notification sweep."
        )
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    /// `online` when a push transport is configured, `offline` otherwise.
    push_mode: String,
    /// Local time of the daily sweep, `HH:MM`.
    sweep_at: String,
}

/// The summary of one sweep run.
#[derive(Serialize, ToSchema)]
pub struct SweepReportResponse {
    started_at: NaiveDateTime,
    finished_at: NaiveDateTime,
    candidates: usize,
    notified: usize,
    already_notified: usize,
    not_due: usize,
    malformed: usize,
    failed: usize,
    records_written: usize,
    push_delivered: usize,
    push_failed: usize,
    push_timed_out: usize,
    push_skipped: usize,
}

impl From<SweepReport> for SweepReportResponse {
    fn from(r: SweepReport) -> Self {
        Self {
            started_at: r.started_at,
            finished_at: r.finished_at,
            candidates: r.candidates,
            notified: r.notified,
            already_notified: r.already_notified,
            not_due: r.not_due,
            malformed: r.malformed,
            failed: r.failed,
            records_written: r.records_written,
            push_delivered: r.push_delivered,
            push_failed: r.push_failed,
            push_timed_out: r.push_timed_out,
            push_skipped: r.push_skipped,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The worker is running", body = HealthResponse)
    )
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let push_mode = if app_state.runner.push_online() {
        "online"
    } else {
        "offline"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        push_mode: push_mode.to_string(),
        sweep_at: app_state.config.sweep_at.format("%H:%M").to_string(),
    })
}

/// Run one expiry sweep now.
///
/// Waits for a scheduled sweep already in progress. Items notified earlier
/// today are not notified again.
#[utoipa::path(
    post,
    path = "/sweeps",
    responses(
        (status = 200, description = "Sweep completed", body = SweepReportResponse),
        (status = 500, description = "The candidate query failed")
    )
)]
pub async fn run_sweep_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    info!("Manual expiry sweep requested.");
    match app_state.runner.run().await {
        Ok(report) => Ok(Json(SweepReportResponse::from(report))),
        Err(e) => {
            error!("Manual expiry sweep failed: {:?}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Expiry sweep failed".to_string(),
            ))
        }
    }
}
