//! Shared fakes and fixtures for apt-classifier integration tests
//!
//! Every collaborator trait gets an in-process implementation so tests
//! control exactly what the pipeline sees.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apt_classifier::classifier::ArtistClassifier;
use apt_classifier::db::{ProfileSink, SelectionPredicate, WorkSelector};
use apt_classifier::derivation::TypeWeights;
use apt_classifier::enrichment::{Enricher, ReferenceFacts, ReferenceSource};
use apt_classifier::error::{ClassifyError, ClassifyResult};
use apt_classifier::models::{BatchRun, RawArtistRecord};
use apt_classifier::orchestrator::{BatchConfig, BatchOrchestrator};
use apt_classifier::rebalancer::{RebalanceConfig, Rebalancer};
use apt_classifier::scoring::ai_assisted::AiScorer;
use apt_classifier::scoring::generative_client::GenerativeClient;
use apt_classifier::scoring::ScoringEngine;
use apt_classifier::types::AptProfile;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

// ============================================================================
// Generative service
// ============================================================================

/// Replies with a fixed text and counts calls
pub struct ScriptedGenerative {
    reply: String,
    pub calls: AtomicUsize,
}

impl ScriptedGenerative {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GenerativeClient for ScriptedGenerative {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _system: &str, _user: &str) -> ClassifyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// Always fails like an unreachable service
pub struct DownGenerative;

#[async_trait::async_trait]
impl GenerativeClient for DownGenerative {
    fn name(&self) -> &str {
        "down"
    }

    async fn complete(&self, _system: &str, _user: &str) -> ClassifyResult<String> {
        Err(ClassifyError::external("down", "connection refused"))
    }
}

/// Reply scoring every axis strongly toward L, A, E, F
pub const SOLITARY_ABSTRACT_REPLY: &str = r#"{"scores": {"L": 88, "S": 12, "A": 90, "R": 10, "E": 85, "M": 15, "F": 82, "C": 18}, "rationale": "Reclusive gestural abstraction driven by feeling."}"#;

/// Same as above with the Affect axis missing
pub const MISSING_AFFECT_REPLY: &str = r#"{"scores": {"L": 88, "S": 12, "A": 90, "R": 10, "F": 82, "C": 18}, "rationale": "Partial answer."}"#;

pub fn ai_classifier(client: Arc<dyn GenerativeClient>) -> ArtistClassifier {
    ArtistClassifier::new(
        ScoringEngine::new(Some(AiScorer::new(client, Duration::from_secs(2)))),
        None,
        TypeWeights::default(),
    )
}

// ============================================================================
// Reference source
// ============================================================================

/// Serves canned facts by exact name
#[derive(Default)]
pub struct StaticReference {
    facts: HashMap<String, ReferenceFacts>,
    delay: Duration,
    pub lookups: AtomicUsize,
}

impl StaticReference {
    pub fn with(mut self, name: &str, facts: ReferenceFacts) -> Self {
        self.facts.insert(name.to_string(), facts);
        self
    }

    /// Simulated per-lookup latency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReferenceSource for StaticReference {
    fn name(&self) -> &str {
        "static"
    }

    async fn lookup(&self, name: &str) -> ClassifyResult<Option<ReferenceFacts>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.facts.get(name).cloned())
    }
}

pub fn enriching_classifier(source: Arc<dyn ReferenceSource>) -> ArtistClassifier {
    ArtistClassifier::new(
        ScoringEngine::offline(),
        Some(Enricher::new(source, Duration::from_secs(2))),
        TypeWeights::default(),
    )
}

// ============================================================================
// Work selection
// ============================================================================

/// Returns a fixed record list for `Unprofiled`, nothing for the rest
pub struct FixedSelector {
    records: Vec<RawArtistRecord>,
}

impl FixedSelector {
    pub fn new(records: Vec<RawArtistRecord>) -> Self {
        Self { records }
    }
}

#[async_trait::async_trait]
impl WorkSelector for FixedSelector {
    async fn select(
        &self,
        predicate: &SelectionPredicate,
        limit: usize,
    ) -> ClassifyResult<Vec<RawArtistRecord>> {
        match predicate {
            SelectionPredicate::Unprofiled => Ok(self.records.iter().take(limit).cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }
}

/// Selection that always fails
pub struct BrokenSelector;

#[async_trait::async_trait]
impl WorkSelector for BrokenSelector {
    async fn select(
        &self,
        _predicate: &SelectionPredicate,
        _limit: usize,
    ) -> ClassifyResult<Vec<RawArtistRecord>> {
        Err(ClassifyError::Selection("artist store unreachable".to_string()))
    }
}

// ============================================================================
// Profile sink
// ============================================================================

/// Keeps profiles and runs in memory
///
/// Artists listed in `fail_for` always fail to persist with a transient
/// error, so the orchestrator retries them before giving up.
#[derive(Default)]
pub struct MemorySink {
    pub profiles: Mutex<HashMap<Uuid, AptProfile>>,
    pub history: Mutex<Vec<(Uuid, Option<Uuid>)>>,
    pub runs: Mutex<Vec<BatchRun>>,
    pub attempts: AtomicUsize,
    fail_for: Vec<Uuid>,
}

impl MemorySink {
    pub fn failing_for(ids: Vec<Uuid>) -> Self {
        Self {
            fail_for: ids,
            ..Default::default()
        }
    }

    pub fn profile(&self, id: Uuid) -> Option<AptProfile> {
        self.profiles.lock().unwrap().get(&id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn last_run(&self) -> Option<BatchRun> {
        self.runs.lock().unwrap().last().cloned()
    }
}

fn transient_error() -> ClassifyError {
    ClassifyError::Persistence(apt_common::Error::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait::async_trait]
impl ProfileSink for MemorySink {
    async fn upsert_profile(&self, profile: &AptProfile, _run_id: Option<Uuid>) -> ClassifyResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.contains(&profile.artist_id) {
            return Err(transient_error());
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.artist_id, profile.clone());
        Ok(())
    }

    async fn append_history(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()> {
        self.history.lock().unwrap().push((profile.artist_id, run_id));
        Ok(())
    }

    async fn record_run(&self, run: &BatchRun) -> ClassifyResult<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Fast batch settings for tests
pub fn test_batch_config(limit: usize) -> BatchConfig {
    BatchConfig {
        limit,
        sub_batch_size: 10,
        max_concurrency: 4,
        pause_between_sub_batches: Duration::from_millis(0),
        persistence_max_attempts: 3,
        ..BatchConfig::default()
    }
}

pub fn orchestrator(
    selector: Arc<dyn WorkSelector>,
    sink: Arc<dyn ProfileSink>,
    limit: usize,
) -> BatchOrchestrator {
    BatchOrchestrator::new(
        selector,
        sink,
        Arc::new(ArtistClassifier::offline()),
        Rebalancer::new(RebalanceConfig::default()),
        test_batch_config(limit),
    )
}

/// Name-only records: minimal tier, neutral scores
pub fn name_only_records(count: usize) -> Vec<RawArtistRecord> {
    (0..count)
        .map(|i| RawArtistRecord::new(Uuid::new_v4(), format!("Unknown Painter {}", i)))
        .collect()
}

/// A biography long enough for the rich tier
pub fn rich_record(name: &str) -> RawArtistRecord {
    let mut raw = RawArtistRecord::new(Uuid::new_v4(), name);
    raw.nationality = Some("American".to_string());
    raw.movements = vec!["Abstract Expressionism".to_string()];
    raw.birth_year = Some(1912);
    raw.death_year = Some(1956);
    raw.medium = Some("oil and enamel on canvas".to_string());
    raw.biography = Some(
        "A reclusive painter who worked alone for weeks in a barn studio, rarely receiving \
         visitors and avoiding the gallery circuit. The canvases are purely abstract fields \
         of poured and dripped paint with no recognizable figures, driven by raw emotion, \
         anguish and ecstatic feeling rather than theory. Working on the floor, the artist \
         moved around the canvas in spontaneous, improvised gestures, never sketching a plan \
         in advance and letting accident and intuition decide the composition. "
            .repeat(3),
    );
    raw
}

/// Temporary SQLite database with the full schema
pub async fn temp_database() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("apt.db");
    let pool = apt_common::db::init_database(&path)
        .await
        .expect("init database");
    (dir, pool)
}
