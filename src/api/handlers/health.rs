use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::error;
use crate::api::dtos::responses::HealthResponse;
use crate::error::AppError;
use crate::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match ping(&state).await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok", database: "up" })),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: "degraded", database: "down" }))
        }
    }
}

async fn ping(state: &AppState) -> Result<(), AppError> {
    let mut tx = state.gateway.unscoped().begin().await?;
    sqlx::query("SELECT 1").execute(tx.conn()).await?;
    tx.commit().await
}
