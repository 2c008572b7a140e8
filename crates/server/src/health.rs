use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use scoopy_db::DbPool;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (ready, database) =
        match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db_pool).await {
            Ok(_) => (true, "reachable".to_string()),
            Err(error) => (false, format!("query failed: {error}")),
        };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };
    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
