//! API routes for sightd
//!
//! `/analisar` is kept as an alias of `/v1/analyze` for pages that still post
//! to the old path.

use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sight_common::rpc::{LocalBackendInfo, RemoteBackendInfo};
use sight_common::{
    normalize, AnalyzeRequest, AnalyzeResponse, BackendsResponse, ErrorResponse, HealthResponse,
    SightError,
};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Errors
// ============================================================================

/// Error body plus status for any failed request
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<SightError> for ApiError {
    fn from(e: SightError) -> Self {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Oversized bodies keep their 413; every other body problem is a bad request
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: SightError::Validation(rejection.body_text()).to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("  Request failed ({}): {}", self.status, self.message);
        } else {
            info!("  Request rejected ({}): {}", self.status, self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Analyze Routes
// ============================================================================

pub fn analyze_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/analyze", post(analyze))
        .route("/analisar", post(analyze))
}

async fn analyze(
    State(state): State<AppStateArc>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(raw) = payload?;
    let request = normalize(&raw)?;

    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("analyze", %request_id);
    let orchestrator = Arc::clone(&state.orchestrator);

    // Detached so a dropped connection does not cancel an in-flight attempt
    let task = tokio::spawn(async move { orchestrator.run(&request).await }.instrument(span));
    let report = task
        .await
        .map_err(|e| SightError::Internal(format!("orchestration task failed: {}", e)))?;

    let result = report.into_result()?;
    Ok(Json(AnalyzeResponse {
        text: result.into_text(),
    }))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/health", get(health_check))
        .route("/v1/backends", get(backends))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: sight_common::VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Live probe results and the routing configuration
async fn backends(State(state): State<AppStateArc>) -> Json<BackendsResponse> {
    let orchestrator = &state.orchestrator;
    let reachability = orchestrator.probe().probe_all().await;
    let config = &state.config;

    Json(BackendsResponse {
        network_reachable: reachability.network,
        local_reachable: reachability.local,
        remote_credential: orchestrator.remote_credential(),
        routing_policy: orchestrator.policy().to_string(),
        offline_image_policy: orchestrator.offline_image().to_string(),
        local: LocalBackendInfo {
            base_url: config.local.base_url.clone(),
            vision_model: config.local.vision_model.clone(),
            text_model: config.local.text_model.clone(),
        },
        remote: RemoteBackendInfo {
            model: config.remote.model.clone(),
        },
    })
}
