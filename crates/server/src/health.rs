use autoreply_core::errors::{ApplicationError, InterfaceError};
use autoreply_db::{DbPool, SqlUserConfigurationRepository};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::webhooks::status_for;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, database) = match database_check(&state.db_pool).await {
        Ok(configured_users) => (
            StatusCode::OK,
            HealthCheck {
                status: "ready",
                detail: format!("database reachable; {configured_users} reply configurations stored"),
            },
        ),
        Err(error) => (
            status_for(&error),
            HealthCheck { status: "degraded", detail: error.message().to_owned() },
        ),
    };
    let ready = status_code == StatusCode::OK;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "autoreply-server runtime initialized".to_string(),
        },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    (status_code, Json(payload))
}

// Counting rows proves both connectivity and that migrations ran.
async fn database_check(pool: &DbPool) -> Result<i64, InterfaceError> {
    SqlUserConfigurationRepository::new(pool.clone())
        .count()
        .await
        .map_err(|error| ApplicationError::from(error).into_interface("health"))
}
