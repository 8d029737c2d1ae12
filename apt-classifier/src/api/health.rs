//! Service health: store reachability and the state of the latest batch run

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::db::{profiles, runs};
use crate::models::{BatchRun, BatchState};
use crate::AppState;

/// Latest run as shown on the health page
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub state: BatchState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classified: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchRun> for RunSummary {
    fn from(run: BatchRun) -> Self {
        Self {
            run_id: run.run_id,
            state: run.state,
            started_at: run.started_at,
            ended_at: run.ended_at,
            classified: run.report.map(|r| r.classified),
            error: run.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the profile store cannot be read
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Stored profiles; absent when the store is unreadable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let profiles = match profiles::count_profiles(&state.db).await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Health check could not count profiles");
            None
        }
    };
    let last_run = runs::load_latest_run(&state.db)
        .await
        .ok()
        .flatten()
        .map(RunSummary::from);

    Json(HealthResponse {
        status: if profiles.is_some() { "ok" } else { "degraded" },
        module: "apt-classifier",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        profiles,
        last_run,
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
