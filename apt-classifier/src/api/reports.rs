//! Batch report endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::db::runs;
use crate::error::{ApiError, ApiResult};
use crate::models::BatchRun;
use crate::AppState;

/// GET /reports/latest
///
/// Most recent classification run with its report. Runs still in progress
/// are returned without a report.
pub async fn latest_report(State(state): State<AppState>) -> ApiResult<Json<BatchRun>> {
    match runs::load_latest_run(&state.db).await {
        Ok(Some(run)) => Ok(Json(run)),
        Ok(None) => Err(ApiError::NotFound("no classification runs yet".to_string())),
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            Err(e.into())
        }
    }
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new().route("/reports/latest", get(latest_report))
}
