use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub record_store: String,
    pub storage: String,
}

/// Runs one dependency check. Failure details stay in the log; callers only see
/// `ok`, `unhealthy` or `timeout`.
async fn check_dependency<T, E: Display>(
    component: &'static str,
    limit: Duration,
    check: impl Future<Output = Result<T, E>>,
) -> &'static str {
    match tokio::time::timeout(limit, check).await {
        Ok(Ok(_)) => "ok",
        Ok(Err(e)) => {
            tracing::error!(component, error = %e, "Health check failed");
            "unhealthy"
        }
        Err(_) => {
            tracing::error!(component, "Health check timed out");
            "timeout"
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "A backing store is unreachable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let record_store = check_dependency("record_store", TIMEOUT, state.records.health_check()).await;
    // Looking up a key that never exists checks connectivity without writing.
    let storage = check_dependency(
        "storage",
        TIMEOUT,
        state.storage.exists("health-check/non-existent-key"),
    )
    .await;

    let (status_code, status) = if record_store == "ok" && storage == "ok" {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthCheckResponse {
            status: status.to_string(),
            record_store: record_store.to_string(),
            storage: storage.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failure_text_is_not_exposed() {
        let status = check_dependency(
            "record_store",
            TIMEOUT,
            async { Err::<(), _>("connect to db.internal:5432 as admin refused") },
        )
        .await;
        assert_eq!(status, "unhealthy");
    }

    #[tokio::test]
    async fn slow_check_times_out() {
        let status = check_dependency("storage", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })
        .await;
        assert_eq!(status, "timeout");
    }

    #[tokio::test]
    async fn passing_check_is_ok() {
        assert_eq!(check_dependency("storage", TIMEOUT, async { Ok::<_, String>(true) }).await, "ok");
    }
}
