//! Enrichment Connector
//!
//! Best-effort lookup of supplementary facts for thin records (sparse and
//! minimal tiers). Enrichment is advisory:
//! - fields the record already knows are never overwritten
//! - a short existing biography is kept, with the reference summary appended
//! - lookup failures, timeouts and "no match" are logged and skipped
//!
//! Lookups are cached per batch by normalized name, including misses, so
//! one batch never asks the reference source about the same name twice.
//! Each name owns a `OnceCell`: concurrent records with the same name wait
//! on the first lookup instead of starting their own.

pub mod wikipedia;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::ClassifyResult;
use crate::models::{Field, NormalizedRecord};
use crate::normalizer::name_key;

/// Facts returned by a reference source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFacts {
    /// Title of the matched reference entry
    pub title: String,
    pub summary: String,
    pub nationality: Option<String>,
    pub movements: Vec<String>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub source_url: Option<String>,
}

/// External reference lookup by artist name
#[async_trait::async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Source name for provenance ("wikipedia")
    fn name(&self) -> &str;

    /// `Ok(None)` means the source has no confident match for the name
    async fn lookup(&self, name: &str) -> ClassifyResult<Option<ReferenceFacts>>;
}

/// Per-batch lookup cache keyed by normalized name
#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Option<ReferenceFacts>>>>>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell for `key`, created empty on first use
    fn slot(&self, key: &str) -> Arc<OnceCell<Option<ReferenceFacts>>> {
        match self.entries.lock() {
            Ok(mut entries) => entries.entry(key.to_string()).or_default().clone(),
            // Poisoned map: look up unshared
            Err(_) => Arc::new(OnceCell::new()),
        }
    }

    /// `Some(None)` is a cached miss; `None` means not looked up (yet)
    pub fn get(&self, key: &str) -> Option<Option<ReferenceFacts>> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Names with a finished lookup
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|e| e.values().filter(|cell| cell.initialized()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reference lookups with timeout, caching and merge rules
pub struct Enricher {
    source: Arc<dyn ReferenceSource>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(source: Arc<dyn ReferenceSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Return an enriched copy of `record`, or `None` if nothing was added
    pub async fn enrich(
        &self,
        record: &NormalizedRecord,
        cache: &EnrichmentCache,
    ) -> Option<NormalizedRecord> {
        let key = name_key(&record.lookup_name);
        if key.is_empty() {
            return None;
        }

        let slot = cache.slot(&key);
        if slot.initialized() {
            debug!(artist_id = %record.id, name = %key, "Enrichment cache hit");
        }
        let facts = slot.get_or_init(|| self.fetch(record)).await.clone()?;

        let merged = merge(record, &facts, self.source.name());
        if merged == *record {
            None
        } else {
            Some(merged)
        }
    }

    async fn fetch(&self, record: &NormalizedRecord) -> Option<ReferenceFacts> {
        match tokio::time::timeout(self.timeout, self.source.lookup(&record.lookup_name)).await {
            Ok(Ok(Some(facts))) => {
                debug!(
                    artist_id = %record.id,
                    source = %self.source.name(),
                    title = %facts.title,
                    "Reference match found"
                );
                Some(facts)
            }
            Ok(Ok(None)) => {
                debug!(artist_id = %record.id, name = %record.lookup_name, "No reference match");
                None
            }
            Ok(Err(e)) => {
                warn!(artist_id = %record.id, error = %e, "Reference lookup failed, skipping enrichment");
                None
            }
            Err(_) => {
                warn!(
                    artist_id = %record.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Reference lookup timed out, skipping enrichment"
                );
                None
            }
        }
    }
}

/// Merge reference facts into a record without overriding known fields
pub fn merge(record: &NormalizedRecord, facts: &ReferenceFacts, source: &str) -> NormalizedRecord {
    let mut merged = record.clone();
    let mut changed = false;

    let summary = facts.summary.trim();
    if !summary.is_empty() {
        merged.biography = match &record.biography {
            Field::Known(existing) if existing.contains(summary) => Field::Known(existing.clone()),
            Field::Known(existing) => Field::Known(format!("{}\n\n{}", existing, summary)),
            Field::Unknown => Field::Known(summary.to_string()),
        };
        changed |= merged.biography != record.biography;
    }

    if !record.nationality.is_known() {
        if let Some(nationality) = &facts.nationality {
            merged.nationality = Field::Known(nationality.clone());
            changed = true;
        }
    }

    if !record.movements.is_known() && !facts.movements.is_empty() {
        merged.movements = Field::Known(facts.movements.iter().map(|m| m.to_lowercase()).collect());
        changed = true;
    }

    // Life dates are only taken as a pair so a partial record stays consistent
    if !record.birth_year.is_known() && !record.death_year.is_known() {
        if let Some(birth) = facts.birth_year {
            merged.birth_year = Field::Known(birth);
            changed = true;
            if let Some(death) = facts.death_year.filter(|d| *d >= birth) {
                merged.death_year = Field::Known(death);
            }
        }
    }

    if changed && !merged.enriched_from.iter().any(|s| s == source) {
        merged.enriched_from.push(source.to_string());
    }

    merged
}
