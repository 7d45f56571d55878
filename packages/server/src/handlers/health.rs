use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    #[schema(example = "running")]
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Liveness probe, also polled by the service registry.
pub async fn health() -> Json<&'static str> {
    Json("OK")
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
