//! Type Derivation & Multi-Type Expansion
//!
//! Turns axis scores into up to three ranked type assignments:
//! - **Primary:** leading pole per axis (ties to L, R, E, C)
//! - **Secondary:** primary with its least decisive axis flipped
//! - **Tertiary:** primary with the next least decisive axis flipped
//!
//! Flips that collide with an already assigned code move on to the next
//! axis by margin; margin ties go to the fixed axis order. When no tertiary
//! code remains the slot is omitted and the weights are renormalized.

use apt_common::config::DerivationSection;

use crate::types::{Axis, AxisScores, TypeAssignment, TypeCode};

/// Slot weights for primary/secondary/tertiary assignments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeWeights {
    pub primary: f64,
    pub secondary: f64,
    pub tertiary: f64,
}

impl Default for TypeWeights {
    fn default() -> Self {
        Self {
            primary: 0.6,
            secondary: 0.25,
            tertiary: 0.15,
        }
    }
}

impl From<&DerivationSection> for TypeWeights {
    fn from(section: &DerivationSection) -> Self {
        let weights = Self {
            primary: section.primary_weight,
            secondary: section.secondary_weight,
            tertiary: section.tertiary_weight,
        };
        if weights.is_valid() {
            weights
        } else {
            tracing::warn!(
                primary = section.primary_weight,
                secondary = section.secondary_weight,
                tertiary = section.tertiary_weight,
                "Invalid derivation weights in config, using defaults"
            );
            Self::default()
        }
    }
}

impl TypeWeights {
    /// Weights must be positive and strictly descending
    pub fn is_valid(&self) -> bool {
        self.tertiary > 0.0 && self.secondary > self.tertiary && self.primary > self.secondary
    }

    /// Weights for `slots` assignments, renormalized to sum to 1.0
    pub fn for_slots(&self, slots: usize) -> Vec<f64> {
        let raw: Vec<f64> = [self.primary, self.secondary, self.tertiary]
            .into_iter()
            .take(slots.clamp(1, 3))
            .collect();
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }
}

/// Codes chosen for each slot, with the axis flipped to reach them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedCodes {
    pub primary: TypeCode,
    pub secondary: Option<(TypeCode, Axis)>,
    pub tertiary: Option<(TypeCode, Axis)>,
}

impl DerivedCodes {
    pub fn codes(&self) -> Vec<TypeCode> {
        std::iter::once(self.primary)
            .chain(self.secondary.map(|(code, _)| code))
            .chain(self.tertiary.map(|(code, _)| code))
            .collect()
    }
}

/// Axes ordered from least to most decisive; ties keep axis order
pub fn axes_by_margin(margins: [u8; 4]) -> [Axis; 4] {
    let mut axes = Axis::ALL;
    axes.sort_by_key(|axis| margins[axis.index()]);
    axes
}

/// Flip `base` on the first axis (least decisive first) that yields a code
/// outside `used`, skipping axes in `skip`
pub fn next_flip(
    base: TypeCode,
    margins: [u8; 4],
    skip: &[Axis],
    used: &[TypeCode],
) -> Option<(TypeCode, Axis)> {
    axes_by_margin(margins)
        .into_iter()
        .filter(|axis| !skip.contains(axis))
        .map(|axis| (base.flip(axis), axis))
        .find(|(code, _)| !used.contains(code))
}

/// Derive secondary and tertiary codes around a primary
///
/// `secondary` may be fixed by the caller (the rebalancer demotes the old
/// primary into that slot); otherwise it is derived by flipping.
pub fn derive_codes(
    primary: TypeCode,
    margins: [u8; 4],
    secondary: Option<TypeCode>,
) -> DerivedCodes {
    let mut used = vec![primary];

    let secondary = match secondary {
        Some(code) if code != primary => {
            // Differing axis, when the fixed code is one flip away
            let axis = Axis::ALL
                .into_iter()
                .find(|axis| primary.flip(*axis) == code);
            Some((code, axis))
        }
        _ => next_flip(primary, margins, &[], &used).map(|(code, axis)| (code, Some(axis))),
    };

    let mut skip = Vec::new();
    if let Some((code, axis)) = secondary {
        used.push(code);
        skip.extend(axis);
    }

    let tertiary = next_flip(primary, margins, &skip, &used);

    DerivedCodes {
        primary,
        secondary: secondary.map(|(code, axis)| {
            (code, axis.unwrap_or_else(|| weakest_differing(primary, code, margins)))
        }),
        tertiary,
    }
}

/// Least decisive axis on which two codes differ
fn weakest_differing(a: TypeCode, b: TypeCode, margins: [u8; 4]) -> Axis {
    axes_by_margin(margins)
        .into_iter()
        .find(|axis| a.pole(*axis) != b.pole(*axis))
        .unwrap_or(Axis::Sociality)
}

/// Confidence of `code` relative to what the scores support
///
/// Each axis on which `code` departs from the score-derived code costs that
/// axis's clarity, so a single flip gives `overall × (1 − clarity)`.
pub fn code_confidence(code: TypeCode, scores: &AxisScores, overall: u8, ceiling: u8) -> u8 {
    let natural = TypeCode::from_scores(scores);
    let factor: f64 = Axis::ALL
        .iter()
        .filter(|axis| code.pole(**axis) != natural.pole(**axis))
        .map(|axis| 1.0 - scores.get(*axis).clarity())
        .product();
    let value = f64::from(overall) * factor;
    (value.round() as u8).min(ceiling).min(overall)
}

/// Build ranked assignments for a set of derived codes
///
/// A primary that matches the scores keeps the overall confidence; a
/// redrawn primary pays for every axis it contradicts.
pub fn assignments(
    derived: &DerivedCodes,
    scores: &AxisScores,
    overall: u8,
    ceiling: u8,
    weights: &TypeWeights,
) -> Vec<TypeAssignment> {
    let codes = derived.codes();
    let slot_weights = weights.for_slots(codes.len());

    codes
        .into_iter()
        .zip(slot_weights)
        .enumerate()
        .map(|(i, (code, weight))| TypeAssignment {
            type_code: code,
            weight,
            confidence: code_confidence(code, scores, overall, ceiling),
            rank: (i + 1) as u8,
            display: code.display(),
        })
        .collect()
}

/// Primary, secondary and tertiary assignments straight from the scores
pub fn expand(
    scores: &AxisScores,
    overall: u8,
    ceiling: u8,
    weights: &TypeWeights,
) -> Vec<TypeAssignment> {
    let primary = TypeCode::from_scores(scores);
    let derived = derive_codes(primary, scores.margins(), None);
    assignments(&derived, scores, overall, ceiling, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AxisScore;

    fn scores(firsts: [i64; 4]) -> AxisScores {
        AxisScores::new(firsts.map(AxisScore::from_first))
    }

    fn code(s: &str) -> TypeCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_primary_from_leading_poles() {
        let assigned = expand(&scores([80, 70, 60, 90]), 80, 90, &TypeWeights::default());
        assert_eq!(assigned[0].type_code, code("LAEF"));
        assert_eq!(assigned[0].rank, 1);
        assert_eq!(assigned[0].confidence, 80);
    }

    #[test]
    fn test_ties_use_default_poles() {
        let assigned = expand(&AxisScores::neutral(), 40, 60, &TypeWeights::default());
        assert_eq!(assigned[0].type_code, code("LREC"));
    }

    #[test]
    fn test_secondary_flips_weakest_axis() {
        // E/M margin 20 is the weakest
        let assigned = expand(&scores([80, 70, 60, 90]), 80, 90, &TypeWeights::default());
        assert_eq!(assigned[1].type_code, code("LAMF"));
        // A/R margin 40 is next
        assert_eq!(assigned[2].type_code, code("LREF"));
    }

    #[test]
    fn test_margin_ties_follow_axis_order() {
        let derived = derive_codes(code("LAEF"), [10, 10, 10, 10], None);
        assert_eq!(derived.secondary, Some((code("SAEF"), Axis::Sociality)));
        assert_eq!(derived.tertiary, Some((code("LREF"), Axis::Abstraction)));
    }

    #[test]
    fn test_fixed_secondary_excludes_its_axis_from_tertiary() {
        // Demoted code is the S/L flip, so the tertiary must not reuse it
        let derived = derive_codes(code("SAEF"), [0, 30, 30, 30], Some(code("LAEF")));
        assert_eq!(derived.secondary, Some((code("LAEF"), Axis::Sociality)));
        assert_eq!(derived.tertiary, Some((code("SREF"), Axis::Abstraction)));
    }

    #[test]
    fn test_weights_sum_to_one_and_descend() {
        let assigned = expand(&scores([55, 65, 75, 85]), 70, 75, &TypeWeights::default());
        let total: f64 = assigned.iter().map(|a| a.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(assigned.windows(2).all(|w| w[0].weight > w[1].weight));
        let ranks: Vec<u8> = assigned.iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_renormalized_weights_for_two_slots() {
        let weights = TypeWeights::default().for_slots(2);
        assert!((weights[0] - 0.6 / 0.85).abs() < 1e-9);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flipped_confidence_uses_axis_clarity() {
        // E/M margin 20 -> clarity 0.5
        let assigned = expand(&scores([80, 70, 60, 90]), 80, 90, &TypeWeights::default());
        assert_eq!(assigned[1].confidence, 40);
        // A/R margin 40 -> clarity 1.0
        assert_eq!(assigned[2].confidence, 0);
    }

    #[test]
    fn test_invalid_config_weights_fall_back() {
        let section = DerivationSection {
            primary_weight: 0.1,
            secondary_weight: 0.5,
            tertiary_weight: 0.4,
        };
        assert_eq!(TypeWeights::from(&section), TypeWeights::default());
    }
}
