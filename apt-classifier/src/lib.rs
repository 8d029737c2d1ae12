//! apt-classifier library interface
//!
//! Batch pipeline that assigns each artist an Artist Persona Type (APT):
//! a four-axis personality profile with primary/secondary/tertiary codes.
//! Exposes public APIs for the binary and for integration testing.

pub mod api;
pub mod assembler;
pub mod classifier;
pub mod config;
pub mod db;
pub mod derivation;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod rebalancer;
pub mod scoring;
pub mod tiering;
pub mod types;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, ClassifyError, ClassifyResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build the read-only reporting router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::report_routes())
        .merge(api::profile_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
