//! Data-Quality Tiering
//!
//! Buckets a normalized record by how much evidence it carries. The tier
//! picks the scoring strategy and caps the confidence we may claim.
//!
//! | Tier        | Rule                                              | Ceiling |
//! |-------------|---------------------------------------------------|---------|
//! | attribution | name carries "attributed to / workshop of / ..."  | 50      |
//! | rich        | biography ≥ 1000 chars and ≥ 2 metadata fields    | 90      |
//! | moderate    | biography ≥ 100 chars                             | 75      |
//! | sparse      | shorter biography, or some metadata               | 60      |
//! | minimal     | nothing beyond a name                             | 45      |

use serde::{Deserialize, Serialize};

use crate::models::NormalizedRecord;
use crate::types::{AxisScores, DataTier};

/// Biography length (chars) for the rich tier
pub const RICH_BIOGRAPHY_CHARS: usize = 1000;
/// Biography length (chars) for the moderate tier
pub const MODERATE_BIOGRAPHY_CHARS: usize = 100;
/// Corroborating metadata fields required for the rich tier
pub const RICH_METADATA_FIELDS: usize = 2;

/// Tier decision with the inputs that drove it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAssessment {
    pub tier: DataTier,
    pub biography_chars: usize,
    pub metadata_fields: usize,
    pub reason: String,
}

/// Assign a data tier to a normalized record
pub fn assess(record: &NormalizedRecord) -> TierAssessment {
    let biography_chars = record.biography_len();
    let metadata_fields = record.metadata_count();

    let (tier, reason) = if record.attribution.is_some() {
        (
            DataTier::Attribution,
            "name is an attribution, not an individual".to_string(),
        )
    } else if biography_chars >= RICH_BIOGRAPHY_CHARS && metadata_fields >= RICH_METADATA_FIELDS {
        (
            DataTier::Rich,
            format!(
                "{} char biography, {} corroborating fields",
                biography_chars, metadata_fields
            ),
        )
    } else if biography_chars >= MODERATE_BIOGRAPHY_CHARS {
        (
            DataTier::Moderate,
            format!(
                "{} char biography, {} corroborating fields",
                biography_chars, metadata_fields
            ),
        )
    } else if biography_chars > 0 || metadata_fields > 0 {
        (
            DataTier::Sparse,
            format!(
                "{} char biography, {} metadata fields",
                biography_chars, metadata_fields
            ),
        )
    } else {
        (DataTier::Minimal, "name only".to_string())
    };

    TierAssessment {
        tier,
        biography_chars,
        metadata_fields,
        reason,
    }
}

/// Overall confidence for a score vector at a tier
///
/// Interpolates from the tier floor to its ceiling by mean axis clarity,
/// so the result is monotone in tier for a fixed score vector and never
/// exceeds the ceiling.
pub fn confidence_for(tier: DataTier, scores: &AxisScores) -> u8 {
    let floor = f64::from(tier.floor());
    let ceiling = f64::from(tier.ceiling());
    let value = floor + (ceiling - floor) * scores.clarity();
    (value.round() as u8).min(tier.ceiling())
}
