//! Diversity Rebalancer
//!
//! Runs once over a batch's collected primary assignments. When one type
//! holds more than `ceiling_share` of the batch, low-confidence records of
//! that type are redrawn toward under-represented types.
//!
//! **Algorithm:**
//! 1. cap = max(1, ⌊ceiling_share × N⌋)
//! 2. Visit records lowest confidence first (ties by artist id)
//! 3. Skip records at/above `confidence_floor` or whose type is within the cap
//! 4. Candidates: one-letter flips on weak axes (margin < 30) plus the
//!    record's movement archetypes, restricted to types below the cap
//! 5. Widen to all 16 types when no candidate has room, and always for
//!    minimal/attribution records
//! 6. Draw one candidate weighted by remaining room (cap − count)
//!
//! Draws use a `StdRng` seeded from the configured seed and the artist id,
//! so the same batch always rebalances the same way.

use apt_common::config::RebalancerSection;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::derivation::{self, TypeWeights};
use crate::types::{Axis, AptProfile, AxisScores, DataTier, TypeCode, REBALANCED_CAVEAT};

/// Axes decided by less than this margin may be flipped
pub const WEAK_AXIS_MARGIN: u8 = 30;

/// Strategy suffix for redrawn profiles
pub const REBALANCED_SUFFIX: &str = "+rebalanced";

/// Rebalancer settings
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceConfig {
    pub enabled: bool,
    pub ceiling_share: f64,
    pub confidence_floor: u8,
    pub seed: u64,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self::from(&RebalancerSection::default())
    }
}

impl From<&RebalancerSection> for RebalanceConfig {
    fn from(section: &RebalancerSection) -> Self {
        Self {
            enabled: section.enabled,
            ceiling_share: section.ceiling_share.clamp(0.0, 1.0),
            confidence_floor: section.confidence_floor.min(100),
            seed: section.seed,
        }
    }
}

/// Per-type primary counts for one batch
///
/// Shared via `Arc` by the concurrent evaluations of a batch; the counts are
/// transient and never persisted.
#[derive(Debug, Default)]
pub struct PopulationDistribution {
    counts: Mutex<[usize; 16]>,
}

impl PopulationDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of primary codes
    pub fn from_codes(codes: impl IntoIterator<Item = TypeCode>) -> Self {
        let distribution = Self::new();
        for code in codes {
            distribution.record(code);
        }
        distribution
    }

    pub fn record(&self, code: TypeCode) {
        if let Ok(mut counts) = self.counts.lock() {
            counts[code.index()] += 1;
        }
    }

    /// Move one record's primary from `from` to `to`
    pub fn reassign(&self, from: TypeCode, to: TypeCode) {
        if let Ok(mut counts) = self.counts.lock() {
            counts[from.index()] = counts[from.index()].saturating_sub(1);
            counts[to.index()] += 1;
        }
    }

    pub fn count(&self, code: TypeCode) -> usize {
        self.counts.lock().map(|c| c[code.index()]).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().map(|c| c.iter().sum()).unwrap_or(0)
    }

    pub fn snapshot(&self) -> [usize; 16] {
        self.counts.lock().map(|c| *c).unwrap_or([0; 16])
    }

    /// Largest single-type share (0.0 for an empty batch)
    pub fn max_share(&self) -> f64 {
        let counts = self.snapshot();
        let total: usize = counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        counts.iter().copied().max().unwrap_or(0) as f64 / total as f64
    }
}

/// What the rebalancer needs to know about one classified record
#[derive(Debug, Clone)]
pub struct RebalanceItem {
    pub artist_id: Uuid,
    pub primary: TypeCode,
    pub confidence: u8,
    pub tier: DataTier,
    pub scores: AxisScores,
    /// Movement archetypes consistent with the record's metadata
    pub archetypes: Vec<TypeCode>,
}

/// One redrawn primary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redraw {
    pub artist_id: Uuid,
    pub from: TypeCode,
    pub to: TypeCode,
    /// Count of `from` in the batch when the record was visited
    pub from_count: usize,
    pub cap: usize,
}

/// Batch-level diversity pass
#[derive(Debug, Clone)]
pub struct Rebalancer {
    config: RebalanceConfig,
}

impl Rebalancer {
    pub fn new(config: RebalanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RebalanceConfig {
        &self.config
    }

    /// Largest per-type count allowed for a batch of `total` records
    pub fn cap(&self, total: usize) -> usize {
        ((self.config.ceiling_share * total as f64).floor() as usize).max(1)
    }

    /// Plan redraws for a batch, updating `distribution` as records move
    pub fn plan(&self, items: &[RebalanceItem], distribution: &PopulationDistribution) -> Vec<Redraw> {
        if !self.config.enabled || items.is_empty() {
            return Vec::new();
        }

        let cap = self.cap(distribution.total().max(items.len()));

        let mut order: Vec<&RebalanceItem> = items
            .iter()
            .filter(|item| item.confidence < self.config.confidence_floor)
            .collect();
        order.sort_by(|a, b| {
            a.confidence
                .cmp(&b.confidence)
                .then_with(|| a.artist_id.cmp(&b.artist_id))
        });

        let mut redraws = Vec::new();
        for item in order {
            let from_count = distribution.count(item.primary);
            if from_count <= cap {
                continue;
            }

            let counts = distribution.snapshot();
            let candidates = self.candidates(item, &counts, cap);
            let Some(to) = self.draw(item.artist_id, &candidates, &counts, cap) else {
                debug!(artist_id = %item.artist_id, "No rebalancing candidate with room");
                continue;
            };

            debug!(
                artist_id = %item.artist_id,
                from = %item.primary,
                to = %to,
                from_count,
                cap,
                "Redrawing over-represented primary type"
            );

            distribution.reassign(item.primary, to);
            redraws.push(Redraw {
                artist_id: item.artist_id,
                from: item.primary,
                to,
                from_count,
                cap,
            });
        }

        if !redraws.is_empty() {
            info!(
                redrawn = redraws.len(),
                cap,
                max_share = distribution.max_share(),
                "Diversity rebalancing complete"
            );
        }

        redraws
    }

    /// Candidate codes for one record, all below the cap
    pub fn candidates(&self, item: &RebalanceItem, counts: &[usize; 16], cap: usize) -> Vec<TypeCode> {
        let has_room = |code: &TypeCode| *code != item.primary && counts[code.index()] < cap;

        let widen = matches!(item.tier, DataTier::Minimal | DataTier::Attribution);
        if !widen {
            let mut near: Vec<TypeCode> = Axis::ALL
                .iter()
                .filter(|axis| item.scores.get(**axis).margin() < WEAK_AXIS_MARGIN)
                .map(|axis| item.primary.flip(*axis))
                .collect();
            for code in &item.archetypes {
                if !near.contains(code) {
                    near.push(*code);
                }
            }
            near.retain(has_room);
            if !near.is_empty() {
                return near;
            }
        }

        TypeCode::ALL.into_iter().filter(has_room).collect()
    }

    fn draw(
        &self,
        artist_id: Uuid,
        candidates: &[TypeCode],
        counts: &[usize; 16],
        cap: usize,
    ) -> Option<TypeCode> {
        let weights: Vec<usize> = candidates
            .iter()
            .map(|code| cap.saturating_sub(counts[code.index()]))
            .collect();
        let index = WeightedIndex::new(&weights).ok()?;
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ fold_id(artist_id));
        candidates.get(index.sample(&mut rng)).copied()
    }
}

fn fold_id(id: Uuid) -> u64 {
    let value = id.as_u128();
    (value >> 64) as u64 ^ value as u64
}

/// Rewrite a profile around a redrawn primary
///
/// The old primary becomes the secondary and the tertiary is re-derived.
/// Confidence is recomputed against the unchanged dimensions.
pub fn apply(profile: &AptProfile, redraw: &Redraw, weights: &TypeWeights) -> AptProfile {
    let scores = profile.scores();
    let ceiling = profile.meta.tier.ceiling();
    let overall = crate::tiering::confidence_for(profile.meta.tier, &scores);

    let derived = derivation::derive_codes(redraw.to, scores.margins(), Some(redraw.from));
    let primary_types = derivation::assignments(&derived, &scores, overall, ceiling, weights);

    let mut rebalanced = profile.clone();
    rebalanced.meta.confidence = primary_types
        .first()
        .map(|a| a.confidence)
        .unwrap_or(overall);
    rebalanced.primary_types = primary_types;
    if !rebalanced.meta.strategy.ends_with(REBALANCED_SUFFIX) {
        rebalanced.meta.strategy.push_str(REBALANCED_SUFFIX);
    }
    if !rebalanced.meta.caveats.iter().any(|c| c == REBALANCED_CAVEAT) {
        rebalanced.meta.caveats.push(REBALANCED_CAVEAT.to_string());
    }
    rebalanced.meta.reasoning.push(format!(
        "rebalanced: {} held {} of a {}-per-type cap, redrawn to {}",
        redraw.from, redraw.from_count, redraw.cap, redraw.to
    ));
    rebalanced.meta.classified_at = chrono::Utc::now();
    rebalanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AxisScore;

    fn item(primary: &str, confidence: u8, tier: DataTier) -> RebalanceItem {
        RebalanceItem {
            artist_id: Uuid::new_v4(),
            primary: primary.parse().unwrap(),
            confidence,
            tier,
            scores: AxisScores::neutral(),
            archetypes: vec![],
        }
    }

    fn rebalancer() -> Rebalancer {
        Rebalancer::new(RebalanceConfig::default())
    }

    #[test]
    fn test_cap_has_minimum_of_one() {
        assert_eq!(rebalancer().cap(3), 1);
        assert_eq!(rebalancer().cap(50), 10);
        assert_eq!(rebalancer().cap(99), 19);
    }

    #[test]
    fn test_collapsed_batch_spreads_below_cap() {
        let items: Vec<RebalanceItem> = (0..60).map(|_| item("LREC", 35, DataTier::Minimal)).collect();
        let distribution = PopulationDistribution::from_codes(items.iter().map(|i| i.primary));

        let redraws = rebalancer().plan(&items, &distribution);

        let cap = rebalancer().cap(60);
        assert_eq!(redraws.len(), 60 - cap);
        assert!(distribution.snapshot().iter().all(|c| *c <= cap));
        assert_eq!(distribution.total(), 60);
    }

    #[test]
    fn test_high_confidence_never_redrawn() {
        let items: Vec<RebalanceItem> = (0..20).map(|_| item("LAEF", 85, DataTier::Rich)).collect();
        let distribution = PopulationDistribution::from_codes(items.iter().map(|i| i.primary));

        assert!(rebalancer().plan(&items, &distribution).is_empty());
        assert_eq!(distribution.count("LAEF".parse().unwrap()), 20);
    }

    #[test]
    fn test_lowest_confidence_redrawn_first() {
        let mut items: Vec<RebalanceItem> = (0..4).map(|_| item("LREC", 55, DataTier::Sparse)).collect();
        items.push(item("LREC", 30, DataTier::Sparse));
        let low_id = items[4].artist_id;
        let distribution = PopulationDistribution::from_codes(items.iter().map(|i| i.primary));

        // cap for 5 records is 1, so four of five move; the lowest goes first
        let redraws = rebalancer().plan(&items, &distribution);
        assert_eq!(redraws.len(), 4);
        assert_eq!(redraws[0].artist_id, low_id);
    }

    #[test]
    fn test_candidates_prefer_weak_axis_flips_and_archetypes() {
        let mut record = item("LREC", 40, DataTier::Sparse);
        // Only A/R is weak
        record.scores = AxisScores::new([90, 45, 90, 10].map(AxisScore::from_first));
        record.archetypes = vec!["LRMC".parse().unwrap()];
        let counts = [0usize; 16];

        let candidates = rebalancer().candidates(&record, &counts, 2);
        assert_eq!(
            candidates,
            vec!["LAEC".parse::<TypeCode>().unwrap(), "LRMC".parse().unwrap()]
        );
    }

    #[test]
    fn test_minimal_tier_always_widens() {
        let record = item("LREC", 30, DataTier::Minimal);
        let candidates = rebalancer().candidates(&record, &[0; 16], 3);
        assert_eq!(candidates.len(), 15);
        assert!(!candidates.contains(&record.primary));
    }

    #[test]
    fn test_full_candidates_widen_to_all_codes() {
        let mut record = item("LREC", 40, DataTier::Sparse);
        record.scores = AxisScores::new([90, 45, 90, 10].map(AxisScore::from_first));
        let mut counts = [0usize; 16];
        counts["LAEC".parse::<TypeCode>().unwrap().index()] = 2;

        let candidates = rebalancer().candidates(&record, &counts, 2);
        assert_eq!(candidates.len(), 14);
    }

    #[test]
    fn test_draws_are_reproducible() {
        let items: Vec<RebalanceItem> = (0..30).map(|_| item("SRMC", 20, DataTier::Minimal)).collect();

        let first = rebalancer().plan(&items, &PopulationDistribution::from_codes(items.iter().map(|i| i.primary)));
        let second = rebalancer().plan(&items, &PopulationDistribution::from_codes(items.iter().map(|i| i.primary)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_disabled_rebalancer_is_noop() {
        let config = RebalanceConfig {
            enabled: false,
            ..RebalanceConfig::default()
        };
        let items: Vec<RebalanceItem> = (0..10).map(|_| item("LREC", 10, DataTier::Minimal)).collect();
        let distribution = PopulationDistribution::from_codes(items.iter().map(|i| i.primary));
        assert!(Rebalancer::new(config).plan(&items, &distribution).is_empty());
    }
}
