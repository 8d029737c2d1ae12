//! Batch Orchestrator
//!
//! Drives one classification run through the state machine:
//! SELECTING → PROCESSING → REBALANCING → REPORTING → DONE
//!
//! # Architecture
//! - Work is selected by priority: unprofiled, then low confidence, then stale
//! - PROCESSING runs fixed-size sub-batches; records inside a sub-batch are
//!   evaluated concurrently via `futures::stream::buffer_unordered`
//! - The orchestrator pauses between sub-batches and checks cancellation
//!   only there, so in-flight sub-batches always finish
//! - Raw profiles are persisted as each record completes
//! - REBALANCING redraws over-represented low-confidence primaries once over
//!   the whole batch and re-persists the changed profiles
//!
//! A failed record never aborts the batch; only a failed work selection does.

pub mod statistics;

use anyhow::Context;
use apt_common::config::BatchSection;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classifier::{ArtistClassifier, ClassifiedArtist};
use crate::db::{ProfileSink, SelectionPredicate, WorkSelector};
use crate::enrichment::EnrichmentCache;
use crate::error::{ClassifyError, ClassifyResult};
use crate::models::{BatchRun, BatchState, RawArtistRecord, StateTransition};
use crate::rebalancer::{self, PopulationDistribution, Rebalancer};
use crate::types::TypeCode;
use crate::utils::retry::retry_with_backoff;
pub use statistics::BatchReport;

/// Run-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub limit: usize,
    pub sub_batch_size: usize,
    pub max_concurrency: usize,
    pub pause_between_sub_batches: Duration,
    pub confidence_threshold: u8,
    pub max_profile_age: chrono::Duration,
    pub persistence_max_attempts: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&BatchSection::default())
    }
}

impl From<&BatchSection> for BatchConfig {
    fn from(section: &BatchSection) -> Self {
        Self {
            limit: section.limit,
            sub_batch_size: section.sub_batch_size.max(1),
            max_concurrency: section.max_concurrency.max(1),
            pause_between_sub_batches: Duration::from_millis(section.pause_between_sub_batches_ms),
            confidence_threshold: section.confidence_threshold,
            max_profile_age: chrono::Duration::days(section.max_profile_age_days.max(0)),
            persistence_max_attempts: section.persistence_max_attempts.max(1),
        }
    }
}

/// Progress events emitted during a run
#[derive(Debug, Clone)]
pub enum BatchEvent {
    StateChanged(StateTransition),
    RecordClassified {
        artist_id: Uuid,
        primary_type: Option<TypeCode>,
        confidence: u8,
    },
    RecordSkipped {
        artist_id: Uuid,
        reason: String,
    },
    RecordFailed {
        artist_id: Uuid,
        reason: String,
    },
    SubBatchCompleted {
        index: usize,
        total: usize,
    },
    Completed(BatchReport),
}

/// Per-record result of the processing phase
enum RecordOutcome {
    Classified(ClassifiedArtist),
    SkippedInvalid,
    FailedPersistence,
}

/// Batch orchestrator
pub struct BatchOrchestrator {
    selector: Arc<dyn WorkSelector>,
    sink: Arc<dyn ProfileSink>,
    classifier: Arc<ArtistClassifier>,
    rebalancer: Rebalancer,
    config: BatchConfig,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl BatchOrchestrator {
    pub fn new(
        selector: Arc<dyn WorkSelector>,
        sink: Arc<dyn ProfileSink>,
        classifier: Arc<ArtistClassifier>,
        rebalancer: Rebalancer,
        config: BatchConfig,
    ) -> Self {
        Self {
            selector,
            sink,
            classifier,
            rebalancer,
            config,
            events: None,
        }
    }

    /// Emit progress events on `sender`
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(sender) = &self.events {
            // Receiver may be gone; progress events are best-effort
            let _ = sender.send(event);
        }
    }

    fn transition(&self, run: &mut BatchRun, state: BatchState) {
        let transition = run.transition_to(state);
        info!(
            run_id = %run.run_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Batch state transition"
        );
        self.emit(BatchEvent::StateChanged(transition));
    }

    /// Execute one classification run
    ///
    /// Returns the finished run (DONE, FAILED or CANCELLED). Errors are only
    /// returned when the run row itself cannot be recorded.
    pub async fn run(&self, cancel_token: CancellationToken) -> anyhow::Result<BatchRun> {
        let start_time = Instant::now();
        let mut run = BatchRun::new();
        let mut report = BatchReport::new(run.run_id);

        info!(run_id = %run.run_id, limit = self.config.limit, "Classification run started");
        self.record_run(&run).await?;

        // SELECTING
        let work = match self.select_work().await {
            Ok(work) => work,
            Err(e) => {
                error!(run_id = %run.run_id, error = %e, "Work selection failed, aborting run");
                let transition = run.fail(e.to_string());
                self.emit(BatchEvent::StateChanged(transition));
                self.record_run(&run).await?;
                return Ok(run);
            }
        };
        report.selected = work.len();
        info!(run_id = %run.run_id, selected = work.len(), "Work set selected");

        // PROCESSING
        self.transition(&mut run, BatchState::Processing);
        let distribution = Arc::new(PopulationDistribution::new());
        let cache = Arc::new(EnrichmentCache::new());
        let mut classified: Vec<ClassifiedArtist> = Vec::new();
        let mut cancelled = false;

        let sub_batches: Vec<Vec<RawArtistRecord>> = work
            .chunks(self.config.sub_batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total_sub_batches = sub_batches.len();

        for (index, sub_batch) in sub_batches.into_iter().enumerate() {
            if cancel_token.is_cancelled() {
                cancelled = true;
                break;
            }
            if index > 0 {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.pause_between_sub_batches) => {}
                }
            }

            let outcomes = self
                .process_sub_batch(run.run_id, sub_batch, &distribution, &cache)
                .await;

            for outcome in outcomes {
                match outcome {
                    RecordOutcome::Classified(artist) => {
                        report.classified += 1;
                        classified.push(artist);
                    }
                    RecordOutcome::SkippedInvalid => report.skipped_invalid += 1,
                    RecordOutcome::FailedPersistence => report.failed_persistence += 1,
                }
            }

            debug!(
                run_id = %run.run_id,
                sub_batch = index + 1,
                total = total_sub_batches,
                classified = report.classified,
                "Sub-batch complete"
            );
            self.emit(BatchEvent::SubBatchCompleted {
                index: index + 1,
                total: total_sub_batches,
            });
        }

        if cancelled {
            warn!(
                run_id = %run.run_id,
                classified = report.classified,
                "Run cancelled between sub-batches, skipping rebalancing"
            );
        } else {
            // REBALANCING
            self.transition(&mut run, BatchState::Rebalancing);
            let (rebalanced, failures) = self
                .rebalance(run.run_id, &mut classified, &distribution)
                .await;
            report.rebalanced = rebalanced;
            report.rebalance_write_failures = failures;

            self.transition(&mut run, BatchState::Reporting);
        }

        // REPORTING
        report.tally(classified.iter().map(|c| &c.profile));
        report.cancelled = cancelled;
        report.duration_ms = start_time.elapsed().as_millis() as u64;
        log_report(&report);

        run.report = Some(report.clone());
        self.transition(
            &mut run,
            if cancelled {
                BatchState::Cancelled
            } else {
                BatchState::Done
            },
        );
        self.record_run(&run).await?;
        self.emit(BatchEvent::Completed(report));

        Ok(run)
    }

    async fn record_run(&self, run: &BatchRun) -> anyhow::Result<()> {
        retry_with_backoff("record run", self.config.persistence_max_attempts, || {
            self.sink.record_run(run)
        })
        .await
        .with_context(|| format!("Failed to record classification run {}", run.run_id))
    }

    /// Prioritized work set: unprofiled, then low confidence, then stale
    pub async fn select_work(&self) -> ClassifyResult<Vec<RawArtistRecord>> {
        let stale_before = Utc::now() - self.config.max_profile_age;
        let predicates = [
            SelectionPredicate::Unprofiled,
            SelectionPredicate::ConfidenceBelow(self.config.confidence_threshold),
            SelectionPredicate::ClassifiedBefore(stale_before),
        ];

        let mut work: Vec<RawArtistRecord> = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();

        for predicate in &predicates {
            let remaining = self.config.limit.saturating_sub(work.len());
            if remaining == 0 {
                break;
            }
            let records = self
                .selector
                .select(predicate, remaining)
                .await
                .map_err(|e| match e {
                    ClassifyError::Selection(_) => e,
                    other => ClassifyError::Selection(other.to_string()),
                })?;
            debug!(predicate = ?predicate, count = records.len(), "Selected records");
            for record in records {
                if seen.insert(record.id) {
                    work.push(record);
                }
            }
        }

        work.truncate(self.config.limit);
        Ok(work)
    }

    async fn process_sub_batch(
        &self,
        run_id: Uuid,
        records: Vec<RawArtistRecord>,
        distribution: &Arc<PopulationDistribution>,
        cache: &Arc<EnrichmentCache>,
    ) -> Vec<RecordOutcome> {
        stream::iter(records)
            .map(|raw| {
                let classifier = self.classifier.clone();
                let sink = self.sink.clone();
                let distribution = distribution.clone();
                let cache = cache.clone();
                let attempts = self.config.persistence_max_attempts;

                async move {
                    let artist = match classifier.classify(&raw, &cache).await {
                        Ok(artist) => artist,
                        Err(e) => {
                            warn!(artist_id = %raw.id, error = %e, "Skipping record");
                            self.emit(BatchEvent::RecordSkipped {
                                artist_id: raw.id,
                                reason: e.to_string(),
                            });
                            return RecordOutcome::SkippedInvalid;
                        }
                    };

                    let persisted = retry_with_backoff("profile persist", attempts, || {
                        sink.persist(&artist.profile, Some(run_id))
                    })
                    .await;

                    match persisted {
                        Ok(()) => {
                            if let Some(code) = artist.profile.primary_code() {
                                distribution.record(code);
                            }
                            self.emit(BatchEvent::RecordClassified {
                                artist_id: raw.id,
                                primary_type: artist.profile.primary_code(),
                                confidence: artist.profile.confidence(),
                            });
                            RecordOutcome::Classified(artist)
                        }
                        Err(e) => {
                            error!(
                                artist_id = %raw.id,
                                error = %e,
                                "Profile persistence failed after retries"
                            );
                            self.emit(BatchEvent::RecordFailed {
                                artist_id: raw.id,
                                reason: e.to_string(),
                            });
                            RecordOutcome::FailedPersistence
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await
    }

    /// Redraw and re-persist; returns (rebalanced, write failures)
    async fn rebalance(
        &self,
        run_id: Uuid,
        classified: &mut [ClassifiedArtist],
        distribution: &PopulationDistribution,
    ) -> (usize, usize) {
        let items: Vec<_> = classified
            .iter()
            .filter_map(ClassifiedArtist::rebalance_item)
            .collect();
        let redraws = self.rebalancer.plan(&items, distribution);
        if redraws.is_empty() {
            return (0, 0);
        }

        let positions: HashMap<Uuid, usize> = classified
            .iter()
            .enumerate()
            .map(|(i, c)| (c.profile.artist_id, i))
            .collect();

        let mut rebalanced = 0;
        let mut failures = 0;
        for redraw in &redraws {
            let Some(&position) = positions.get(&redraw.artist_id) else {
                continue;
            };
            let artist = &mut classified[position];
            let profile = crate::assembler::finalize(
                rebalancer::apply(&artist.profile, redraw, self.classifier.weights()),
                self.classifier.weights(),
            );

            let persisted = retry_with_backoff(
                "rebalanced profile persist",
                self.config.persistence_max_attempts,
                || self.sink.persist(&profile, Some(run_id)),
            )
            .await;

            match persisted {
                Ok(()) => {
                    artist.profile = profile;
                    rebalanced += 1;
                }
                Err(e) => {
                    error!(
                        artist_id = %redraw.artist_id,
                        error = %e,
                        "Rebalanced profile could not be persisted, keeping raw profile"
                    );
                    distribution.reassign(redraw.to, redraw.from);
                    failures += 1;
                }
            }
        }

        (rebalanced, failures)
    }
}

fn log_report(report: &BatchReport) {
    let dominant = report
        .dominant_type()
        .map(|(code, count)| format!("{} ({})", code, count))
        .unwrap_or_default();

    info!(
        run_id = %report.run_id,
        selected = report.selected,
        classified = report.classified,
        skipped_invalid = report.skipped_invalid,
        failed_persistence = report.failed_persistence,
        rebalanced = report.rebalanced,
        max_type_share = report.max_type_share,
        dominant_type = %dominant,
        cancelled = report.cancelled,
        duration_ms = report.duration_ms,
        "Batch report"
    );

    match serde_json::to_string(report) {
        Ok(json) => debug!(report = %json, "Batch report detail"),
        Err(e) => warn!(error = %e, "Failed to serialize batch report"),
    }
}
