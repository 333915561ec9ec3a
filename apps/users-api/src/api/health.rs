//! Readiness endpoint backed by a MongoDB ping

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use serde_json::Value;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

/// Readiness check
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "MongoDB reachable"),
        (status = 503, description = "MongoDB unreachable")
    )
)]
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mongodb_check: HealthCheckFuture = Box::pin(async {
        let status = database::mongodb::check_health(&state.mongo_client).await;
        if status.healthy {
            tracing::debug!(response_time_ms = status.response_time_ms, "MongoDB ping ok");
            Ok(())
        } else {
            Err(status
                .message
                .unwrap_or_else(|| "MongoDB unreachable".to_string()))
        }
    });

    run_health_checks(vec![("mongodb", mongodb_check)]).await
}
