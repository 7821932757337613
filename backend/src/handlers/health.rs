//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// Liveness plus a database round trip; public
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    Json(HealthResponse {
        status: if reachable { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if reachable { "connected" } else { "disconnected" },
    })
}
