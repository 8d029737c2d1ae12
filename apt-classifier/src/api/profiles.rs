//! Profile lookup endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::profiles::{self, HistoryEntry};
use crate::error::{ApiError, ApiResult};
use crate::types::AptProfile;
use crate::AppState;

/// Default and maximum history page sizes
const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

fn parse_artist_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid artist id: {}", raw)))
}

/// GET /profiles/:artist_id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
) -> ApiResult<Json<AptProfile>> {
    let artist_id = parse_artist_id(&artist_id)?;
    profiles::load_profile(&state.db, artist_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no profile for artist {}", artist_id)))
}

/// GET /profiles/:artist_id/history?limit=N
pub async fn get_history(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let artist_id = parse_artist_id(&artist_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let entries = profiles::load_history(&state.db, artist_id, limit).await?;
    Ok(Json(entries))
}

/// Build profile routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/:artist_id", get(get_profile))
        .route("/profiles/:artist_id/history", get(get_history))
}
