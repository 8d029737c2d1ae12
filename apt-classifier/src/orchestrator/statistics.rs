//! Batch report aggregation
//!
//! Counts are taken over the final (post-rebalancing) profiles of records
//! that were persisted. Failures are counted separately and never mixed
//! into the per-type numbers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::{AptProfile, DataTier, TypeCode};

/// Summary of one classification run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    /// Records pulled by work selection
    pub selected: usize,
    /// Records whose profile was persisted
    pub classified: usize,
    /// Records rejected by normalization
    pub skipped_invalid: usize,
    /// Records whose profile could not be written after retries
    pub failed_persistence: usize,
    /// Profiles whose primary was redrawn by the rebalancer
    pub rebalanced: usize,
    /// Redraws that could not be written (the raw profile stands)
    pub rebalance_write_failures: usize,
    /// Primary type counts, all 16 codes
    pub type_counts: BTreeMap<String, usize>,
    pub tier_counts: BTreeMap<String, usize>,
    /// Overall confidence in 10-point buckets ("0-9" ... "90-100")
    pub confidence_histogram: BTreeMap<String, usize>,
    /// Profile strategy summaries, e.g. "text_grounded+heuristic"
    pub strategy_counts: BTreeMap<String, usize>,
    /// Largest single-type share of primaries (0.0-1.0)
    pub max_type_share: f64,
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// Histogram bucket label for a confidence value
pub fn confidence_bucket(confidence: u8) -> String {
    match confidence {
        90..=u8::MAX => "90-100".to_string(),
        c => {
            let low = c / 10 * 10;
            format!("{}-{}", low, low + 9)
        }
    }
}

impl BatchReport {
    pub fn new(run_id: Uuid) -> Self {
        let mut report = Self {
            run_id,
            ..Default::default()
        };
        for code in TypeCode::ALL {
            report.type_counts.insert(code.to_string(), 0);
        }
        for tier in DataTier::ALL {
            report.tier_counts.insert(tier.as_str().to_string(), 0);
        }
        for low in (0..90).step_by(10) {
            report.confidence_histogram.insert(confidence_bucket(low), 0);
        }
        report.confidence_histogram.insert(confidence_bucket(90), 0);
        report
    }

    /// Tally the final profiles of a run
    pub fn tally<'a>(&mut self, profiles: impl IntoIterator<Item = &'a AptProfile>) {
        for profile in profiles {
            if let Some(code) = profile.primary_code() {
                *self.type_counts.entry(code.to_string()).or_insert(0) += 1;
            }
            *self
                .tier_counts
                .entry(profile.meta.tier.as_str().to_string())
                .or_insert(0) += 1;
            *self
                .confidence_histogram
                .entry(confidence_bucket(profile.confidence()))
                .or_insert(0) += 1;
            *self
                .strategy_counts
                .entry(profile.meta.strategy.clone())
                .or_insert(0) += 1;
        }

        let total: usize = self.type_counts.values().sum();
        self.max_type_share = if total == 0 {
            0.0
        } else {
            self.type_counts.values().copied().max().unwrap_or(0) as f64 / total as f64
        };
    }

    /// Most frequent primary type, ties to alphabetical order
    pub fn dominant_type(&self) -> Option<(&str, usize)> {
        self.type_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .fold(None, |best: Option<(&str, usize)>, (code, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((code.as_str(), *count)),
            })
    }
}
