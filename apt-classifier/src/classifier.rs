//! Per-record classification pipeline
//!
//! normalize → tier → (enrich → re-tier) → score → confidence → derive → assemble
//!
//! Only an unusable record (`InvalidRecord`) fails here. External service
//! problems degrade the scoring strategy and never fail the record.

use chrono::Utc;
use tracing::{debug, info};

use crate::assembler::{self, ProfileDraft};
use crate::derivation::{self, TypeWeights};
use crate::enrichment::{EnrichmentCache, Enricher};
use crate::error::ClassifyResult;
use crate::models::RawArtistRecord;
use crate::normalizer;
use crate::rebalancer::RebalanceItem;
use crate::scoring::{heuristic, ScoringEngine};
use crate::tiering;
use crate::types::{AptProfile, DataTier, TypeCode, ATTRIBUTION_CAVEAT};

/// A finished profile plus what the rebalancer needs about its record
#[derive(Debug, Clone)]
pub struct ClassifiedArtist {
    pub profile: AptProfile,
    /// Movement archetypes consistent with the record's metadata
    pub archetypes: Vec<TypeCode>,
}

impl ClassifiedArtist {
    pub fn tier(&self) -> DataTier {
        self.profile.meta.tier
    }

    pub fn rebalance_item(&self) -> Option<RebalanceItem> {
        Some(RebalanceItem {
            artist_id: self.profile.artist_id,
            primary: self.profile.primary_code()?,
            confidence: self.profile.confidence(),
            tier: self.tier(),
            scores: self.profile.scores(),
            archetypes: self.archetypes.clone(),
        })
    }
}

/// Classifies one artist record at a time
pub struct ArtistClassifier {
    scoring: ScoringEngine,
    enricher: Option<Enricher>,
    weights: TypeWeights,
}

impl ArtistClassifier {
    pub fn new(scoring: ScoringEngine, enricher: Option<Enricher>, weights: TypeWeights) -> Self {
        Self {
            scoring,
            enricher,
            weights,
        }
    }

    /// Heuristic and text scoring only, no enrichment
    pub fn offline() -> Self {
        Self::new(ScoringEngine::offline(), None, TypeWeights::default())
    }

    pub fn weights(&self) -> &TypeWeights {
        &self.weights
    }

    /// Classify one raw record
    pub async fn classify(
        &self,
        raw: &RawArtistRecord,
        cache: &EnrichmentCache,
    ) -> ClassifyResult<ClassifiedArtist> {
        let mut record = normalizer::normalize(raw)?;
        let mut assessment = tiering::assess(&record);

        if let Some(enricher) = &self.enricher {
            if matches!(assessment.tier, DataTier::Sparse | DataTier::Minimal) {
                if let Some(enriched) = enricher.enrich(&record, cache).await {
                    record = enriched;
                    let before = assessment.tier;
                    assessment = tiering::assess(&record);
                    debug!(
                        artist_id = %record.id,
                        from = %before,
                        to = %assessment.tier,
                        "Re-tiered after enrichment"
                    );
                }
            }
        }

        let tier = assessment.tier;
        let mut outcome = self.scoring.score(&record, tier).await;
        outcome
            .reasoning
            .insert(0, format!("tier {}: {}", tier, assessment.reason));
        for source in &record.enriched_from {
            outcome.sources.push(format!("reference:{}", source));
        }

        let scores = outcome.scores;
        let confidence = tiering::confidence_for(tier, &scores);
        let primary_types = derivation::expand(&scores, confidence, tier.ceiling(), &self.weights);

        let mut caveats = Vec::new();
        if tier == DataTier::Attribution {
            caveats.push(ATTRIBUTION_CAVEAT.to_string());
        }

        let profile = assembler::assemble(
            ProfileDraft {
                artist_id: record.id,
                scores,
                tier,
                confidence,
                primary_types,
                outcome,
                caveats,
                classified_at: Utc::now(),
            },
            &self.weights,
        );

        if let (Some(prior), Some(primary)) = (&record.prior, profile.primary_code()) {
            if prior.primary_type != primary {
                info!(
                    artist_id = %record.id,
                    previous = %prior.primary_type,
                    current = %primary,
                    "Primary type changed on reclassification"
                );
            }
        }

        debug!(
            artist_id = %record.id,
            primary = ?profile.primary_code(),
            confidence = profile.confidence(),
            tier = %tier,
            strategy = %profile.meta.strategy,
            "Record classified"
        );

        Ok(ClassifiedArtist {
            archetypes: heuristic::archetypes_for(&record),
            profile,
        })
    }
}
