//! Profile Assembler
//!
//! Builds the persisted [`AptProfile`] and enforces its invariants before it
//! reaches the store:
//! - every axis pair sums to 100
//! - 1-3 distinct assignments, sorted by weight, ranks contiguous from 1
//! - weights sum to 1.0
//! - no confidence above the tier ceiling
//!
//! Violations are repaired deterministically and logged at WARN; a record
//! is never discarded for an invariant violation.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::derivation::{self, TypeWeights};
use crate::error::{ClassifyError, ClassifyResult};
use crate::scoring::ScoringOutcome;
use crate::types::{AptProfile, AxisScores, DataTier, Dimensions, ProfileMeta, TypeAssignment};

/// Version string stamped into every profile
pub const CLASSIFIER_VERSION: &str = concat!("apt-classifier/", env!("CARGO_PKG_VERSION"));

/// Allowed drift of the weight sum from 1.0
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Most assignments a profile may carry
const MAX_ASSIGNMENTS: usize = 3;

/// Everything needed to assemble one profile
#[derive(Debug, Clone)]
pub struct ProfileDraft {
    pub artist_id: Uuid,
    pub scores: AxisScores,
    pub tier: DataTier,
    pub confidence: u8,
    pub primary_types: Vec<TypeAssignment>,
    pub outcome: ScoringOutcome,
    pub caveats: Vec<String>,
    pub classified_at: DateTime<Utc>,
}

/// Build, validate and (if needed) repair a profile
pub fn assemble(draft: ProfileDraft, weights: &TypeWeights) -> AptProfile {
    let meta = ProfileMeta {
        strategy: draft.outcome.strategy_summary(),
        axis_strategies: draft.outcome.provenance(),
        tier: draft.tier,
        confidence: draft.confidence,
        reasoning: draft.outcome.reasoning,
        sources: draft.outcome.sources,
        caveats: draft.caveats,
        classified_at: draft.classified_at,
        classifier_version: CLASSIFIER_VERSION.to_string(),
    };

    let profile = AptProfile {
        artist_id: draft.artist_id,
        dimensions: Dimensions::from(&draft.scores),
        primary_types: draft.primary_types,
        meta,
    };

    finalize(profile, weights)
}

/// Validate a profile and repair it when any invariant is violated
pub fn finalize(profile: AptProfile, weights: &TypeWeights) -> AptProfile {
    match validate(&profile) {
        Ok(()) => profile,
        Err(err) => {
            warn!(artist_id = %profile.artist_id, error = %err, "Repairing profile");
            repair(profile, weights)
        }
    }
}

/// Check every profile invariant
pub fn validate(profile: &AptProfile) -> ClassifyResult<()> {
    let violations = violations(profile);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ClassifyError::Validation(violations.join("; ")))
    }
}

/// Human-readable list of invariant violations
pub fn violations(profile: &AptProfile) -> Vec<String> {
    let mut found = Vec::new();
    let ceiling = profile.meta.tier.ceiling();

    for axis in crate::types::Axis::ALL {
        let pair = profile.dimensions.pair(axis);
        if !pair.is_complementary() {
            found.push(format!(
                "{} pair sums to {}",
                axis.label(),
                u16::from(pair.first) + u16::from(pair.second)
            ));
        }
    }

    let types = &profile.primary_types;
    if types.is_empty() {
        found.push("no type assignments".to_string());
    }
    if types.len() > MAX_ASSIGNMENTS {
        found.push(format!("{} type assignments", types.len()));
    }
    for (i, assignment) in types.iter().enumerate() {
        if types[..i].iter().any(|a| a.type_code == assignment.type_code) {
            found.push(format!("duplicate type {}", assignment.type_code));
        }
        if assignment.rank as usize != i + 1 {
            found.push(format!("rank {} at position {}", assignment.rank, i + 1));
        }
        if assignment.confidence > ceiling {
            found.push(format!(
                "{} confidence {} above {} ceiling {}",
                assignment.type_code, assignment.confidence, profile.meta.tier, ceiling
            ));
        }
        if !(0.0..=1.0).contains(&assignment.weight) || assignment.weight.is_nan() {
            found.push(format!("{} weight {}", assignment.type_code, assignment.weight));
        }
    }
    if types.windows(2).any(|w| w[0].weight < w[1].weight) {
        found.push("assignments not sorted by weight".to_string());
    }
    if !types.is_empty() {
        let total: f64 = types.iter().map(|a| a.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            found.push(format!("weights sum to {:.4}", total));
        }
    }

    if profile.meta.confidence > ceiling {
        found.push(format!(
            "overall confidence {} above {} ceiling {}",
            profile.meta.confidence, profile.meta.tier, ceiling
        ));
    }
    if let Some(primary) = types.first() {
        if primary.confidence != profile.meta.confidence {
            found.push(format!(
                "overall confidence {} differs from primary {}",
                profile.meta.confidence, primary.confidence
            ));
        }
    }

    found
}

/// Deterministic repair of every invariant
pub fn repair(mut profile: AptProfile, weights: &TypeWeights) -> AptProfile {
    let ceiling = profile.meta.tier.ceiling();

    // Second pole always follows the first
    let scores = profile.dimensions.to_scores();
    profile.dimensions = Dimensions::from(&scores);

    let overall = profile.meta.confidence.min(ceiling);

    let mut types = std::mem::take(&mut profile.primary_types);
    let mut seen = Vec::new();
    types.retain(|a| {
        let fresh = !seen.contains(&a.type_code);
        seen.push(a.type_code);
        fresh && a.weight.is_finite()
    });

    if types.is_empty() {
        types = derivation::expand(&scores, overall, ceiling, weights);
    }

    // Stable sort keeps the prior rank order among equal weights
    types.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    types.truncate(MAX_ASSIGNMENTS);

    let total: f64 = types.iter().map(|a| a.weight.max(0.0)).sum();
    if total > 0.0 {
        for assignment in types.iter_mut() {
            assignment.weight = assignment.weight.max(0.0) / total;
        }
    } else {
        let slots = weights.for_slots(types.len());
        for (assignment, weight) in types.iter_mut().zip(slots) {
            assignment.weight = weight;
        }
    }

    for (i, assignment) in types.iter_mut().enumerate() {
        assignment.rank = (i + 1) as u8;
        assignment.confidence = assignment.confidence.min(ceiling);
    }

    profile.meta.confidence = types.first().map(|a| a.confidence).unwrap_or(overall);
    profile.primary_types = types;
    profile
}
