//! Liveness endpoint. The gateway is only useful while the roster database
//! answers, so that is the one dependency probed.

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `healthy` or `degraded`
    pub status: &'static str,
    pub services: Dependencies,
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub database: Probe,
}

#[derive(Debug, Serialize)]
pub struct Probe {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Probe {
    fn up() -> Self {
        Self {
            status: "healthy",
            error: None,
        }
    }

    fn down(error: String) -> Self {
        Self {
            status: "unhealthy",
            error: Some(error),
        }
    }

    fn is_up(&self) -> bool {
        self.error.is_none()
    }
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// 200 while the database answers a ping, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = match state.roster.ping().await {
        Ok(()) => Probe::up(),
        Err(e) => Probe::down(e.user_message()),
    };

    let (code, status) = if database.is_up() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthReport {
            status,
            services: Dependencies { database },
        }),
    )
}
