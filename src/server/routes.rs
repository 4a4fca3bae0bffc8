//! Webhook route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerState>`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::data::PlayerSource;
use crate::selection::{SelectionPipeline, SquadResponse};
use crate::types::SelectionError;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub source: Arc<dyn PlayerSource>,
    pub pipeline: Arc<SelectionPipeline>,
    /// How long one selection run may take before the request gives up.
    pub solve_timeout: Duration,
    pub latest: RwLock<Option<SquadResponse>>,
}

impl ServerState {
    pub fn new(
        source: Arc<dyn PlayerSource>,
        pipeline: Arc<SelectionPipeline>,
        solve_timeout: Duration,
    ) -> Self {
        Self {
            source,
            pipeline,
            solve_timeout,
            latest: RwLock::new(None),
        }
    }
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub suggestion: String,
}

/// An error with the status code it maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                suggestion: suggestion.into(),
            },
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        let status = match &err {
            SelectionError::EmptyPool => StatusCode::NOT_FOUND,
            SelectionError::Infeasible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SelectionError::Solver(_) | SelectionError::DegenerateLineup { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, err.to_string(), err.suggestion())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /generate-squad
pub async fn generate_squad(
    State(state): State<AppState>,
) -> Result<Json<SquadResponse>, ApiError> {
    info!(source = state.source.name(), "Webhook received, generating squad");

    let pool = state.source.fetch_pool().await.map_err(|e| {
        error!(error = %e, "Failed to fetch player pool");
        ApiError::new(
            StatusCode::BAD_GATEWAY,
            format!("Could not retrieve player data: {e:#}"),
            "The data source is unreachable; try again shortly",
        )
    })?;

    let clubs = pool.clubs.clone();
    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::task::spawn_blocking(move || pipeline.run(&pool));

    let recommendation = match tokio::time::timeout(state.solve_timeout, task).await {
        Err(_) => {
            warn!(
                timeout_secs = state.solve_timeout.as_secs(),
                "Selection timed out"
            );
            return Err(ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "Squad selection timed out",
                "Retry, or raise server.solve_timeout_secs",
            ));
        }
        Ok(Err(join_err)) => {
            error!(error = %join_err, "Selection task failed");
            return Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Squad selection task failed",
                "Check the server logs",
            ));
        }
        Ok(Ok(Err(sel_err))) => {
            warn!(error = %sel_err, "Selection failed");
            return Err(sel_err.into());
        }
        Ok(Ok(Ok(rec))) => rec,
    };

    let response = recommendation.to_response(&clubs);
    *state.latest.write().await = Some(response.clone());

    info!(
        run_id = %response.run_id,
        predicted_points = response.predicted_points,
        total_cost = %response.total_cost,
        "Squad sent"
    );

    Ok(Json(response))
}

/// GET /api/squad/latest
pub async fn latest_squad(State(state): State<AppState>) -> Result<Json<SquadResponse>, ApiError> {
    state.latest.read().await.clone().map(Json).ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "No squad generated yet",
            "POST /generate-squad first",
        )
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
