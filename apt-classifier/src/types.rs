//! Core Types for APT Classification
//!
//! Defines the closed vocabulary the whole pipeline speaks:
//! - **Axis / AxisScore / AxisScores:** four bipolar axes, each a
//!   complementary integer pair summing to 100
//! - **TypeCode:** one of exactly 16 four-letter persona codes
//! - **TypeAssignment / AptProfile:** the persisted classification result
//! - **DataTier / ScoringStrategy:** provenance carried in profile metadata
//!
//! # Architecture
//! `TypeCode` is a 4-bit value, so an out-of-set code cannot be
//! constructed; parsing rejects anything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Axes
// ============================================================================

/// The four bipolar persona axes, in fixed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// Solitary (L) ↔ Social (S)
    Sociality,
    /// Abstract (A) ↔ Representational (R)
    Abstraction,
    /// Emotional (E) ↔ Meaning/Conceptual (M)
    Affect,
    /// Flow/Fluid (F) ↔ Constructive/Structured (C)
    Structure,
}

impl Axis {
    /// Fixed axis order, also used to break margin ties
    pub const ALL: [Axis; 4] = [
        Axis::Sociality,
        Axis::Abstraction,
        Axis::Affect,
        Axis::Structure,
    ];

    pub fn index(self) -> usize {
        match self {
            Axis::Sociality => 0,
            Axis::Abstraction => 1,
            Axis::Affect => 2,
            Axis::Structure => 3,
        }
    }

    /// Pole letters (first, second)
    pub fn letters(self) -> (char, char) {
        match self {
            Axis::Sociality => ('L', 'S'),
            Axis::Abstraction => ('A', 'R'),
            Axis::Affect => ('E', 'M'),
            Axis::Structure => ('F', 'C'),
        }
    }

    /// Short label used in logs and JSON, e.g. "L_S"
    pub fn label(self) -> &'static str {
        match self {
            Axis::Sociality => "L_S",
            Axis::Abstraction => "A_R",
            Axis::Affect => "E_M",
            Axis::Structure => "F_C",
        }
    }

    /// Pole chosen when both poles score exactly 50
    pub fn default_pole(self) -> Pole {
        match self {
            Axis::Sociality => Pole::First,     // L
            Axis::Abstraction => Pole::Second,  // R
            Axis::Affect => Pole::First,        // E
            Axis::Structure => Pole::Second,    // C
        }
    }

    /// Find the axis and pole a letter belongs to
    pub fn from_letter(letter: char) -> Option<(Axis, Pole)> {
        let upper = letter.to_ascii_uppercase();
        Axis::ALL.iter().find_map(|&axis| {
            let (first, second) = axis.letters();
            if upper == first {
                Some((axis, Pole::First))
            } else if upper == second {
                Some((axis, Pole::Second))
            } else {
                None
            }
        })
    }
}

/// One side of an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pole {
    First,
    Second,
}

/// Complementary score pair for one axis
///
/// Constructed through [`AxisScore::from_first`], which derives the second
/// pole from the first, so `first + second == 100` holds for every value
/// built in this crate. Deserialized values are re-checked by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisScore {
    pub first: u8,
    pub second: u8,
}

impl AxisScore {
    /// Build from the first pole's score (clamped to 0..=100)
    pub fn from_first(first: i64) -> Self {
        let first = first.clamp(0, 100) as u8;
        Self {
            first,
            second: 100 - first,
        }
    }

    /// Build from a fractional first-pole score
    pub fn from_first_f64(first: f64) -> Self {
        Self::from_first(first.round() as i64)
    }

    /// The 50/50 prior
    pub fn neutral() -> Self {
        Self::from_first(50)
    }

    /// Absolute difference between the poles (0 = undecided, 100 = certain)
    pub fn margin(&self) -> u8 {
        self.first.abs_diff(self.second)
    }

    pub fn is_complementary(&self) -> bool {
        u16::from(self.first) + u16::from(self.second) == 100
    }

    /// Winning pole; ties fall to the axis default
    pub fn leading_pole(&self, axis: Axis) -> Pole {
        match self.first.cmp(&self.second) {
            std::cmp::Ordering::Greater => Pole::First,
            std::cmp::Ordering::Less => Pole::Second,
            std::cmp::Ordering::Equal => axis.default_pole(),
        }
    }

    /// Share of the winning pole's lead, saturating at a 40-point margin
    pub fn clarity(&self) -> f64 {
        f64::from(self.margin().min(40)) / 40.0
    }
}

impl Default for AxisScore {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Scores for all four axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisScores([AxisScore; 4]);

impl AxisScores {
    pub fn new(scores: [AxisScore; 4]) -> Self {
        Self(scores)
    }

    /// All axes at the 50/50 prior
    pub fn neutral() -> Self {
        Self([AxisScore::neutral(); 4])
    }

    pub fn get(&self, axis: Axis) -> AxisScore {
        self.0[axis.index()]
    }

    pub fn set(&mut self, axis: Axis, score: AxisScore) {
        self.0[axis.index()] = score;
    }

    pub fn margins(&self) -> [u8; 4] {
        [
            self.0[0].margin(),
            self.0[1].margin(),
            self.0[2].margin(),
            self.0[3].margin(),
        ]
    }

    /// Mean per-axis clarity (0.0-1.0)
    pub fn clarity(&self) -> f64 {
        self.0.iter().map(AxisScore::clarity).sum::<f64>() / 4.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, AxisScore)> + '_ {
        Axis::ALL.iter().map(move |&axis| (axis, self.get(axis)))
    }
}

/// Persisted 8-pole view of [`AxisScores`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(rename = "L")]
    pub l: u8,
    #[serde(rename = "S")]
    pub s: u8,
    #[serde(rename = "A")]
    pub a: u8,
    #[serde(rename = "R")]
    pub r: u8,
    #[serde(rename = "E")]
    pub e: u8,
    #[serde(rename = "M")]
    pub m: u8,
    #[serde(rename = "F")]
    pub f: u8,
    #[serde(rename = "C")]
    pub c: u8,
}

impl Dimensions {
    /// Raw pair for an axis (not re-derived, may violate complementarity)
    pub fn pair(&self, axis: Axis) -> AxisScore {
        let (first, second) = match axis {
            Axis::Sociality => (self.l, self.s),
            Axis::Abstraction => (self.a, self.r),
            Axis::Affect => (self.e, self.m),
            Axis::Structure => (self.f, self.c),
        };
        AxisScore { first, second }
    }

    pub fn set_pair(&mut self, axis: Axis, score: AxisScore) {
        match axis {
            Axis::Sociality => (self.l, self.s) = (score.first, score.second),
            Axis::Abstraction => (self.a, self.r) = (score.first, score.second),
            Axis::Affect => (self.e, self.m) = (score.first, score.second),
            Axis::Structure => (self.f, self.c) = (score.first, score.second),
        }
    }

    /// Scores with each second pole recomputed from the first
    pub fn to_scores(&self) -> AxisScores {
        let mut scores = AxisScores::neutral();
        for axis in Axis::ALL {
            scores.set(axis, AxisScore::from_first(i64::from(self.pair(axis).first)));
        }
        scores
    }
}

impl From<&AxisScores> for Dimensions {
    fn from(scores: &AxisScores) -> Self {
        let mut dims = Dimensions {
            l: 50,
            s: 50,
            a: 50,
            r: 50,
            e: 50,
            m: 50,
            f: 50,
            c: 50,
        };
        for (axis, score) in scores.iter() {
            dims.set_pair(axis, score);
        }
        dims
    }
}

// ============================================================================
// Type codes
// ============================================================================

/// One of the 16 persona codes
///
/// Bit `3 - axis.index()` is set when that axis takes its second pole, so
/// `TypeCode::ALL` lists codes in canonical order (LAEF, LAEC, ... SRMC).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeCode(u8);

impl TypeCode {
    pub const ALL: [TypeCode; 16] = [
        TypeCode(0),
        TypeCode(1),
        TypeCode(2),
        TypeCode(3),
        TypeCode(4),
        TypeCode(5),
        TypeCode(6),
        TypeCode(7),
        TypeCode(8),
        TypeCode(9),
        TypeCode(10),
        TypeCode(11),
        TypeCode(12),
        TypeCode(13),
        TypeCode(14),
        TypeCode(15),
    ];

    fn bit(axis: Axis) -> u8 {
        1 << (3 - axis.index())
    }

    /// Highest-scoring pole per axis, ties to the axis default
    pub fn from_scores(scores: &AxisScores) -> Self {
        let mut bits = 0u8;
        for (axis, score) in scores.iter() {
            if score.leading_pole(axis) == Pole::Second {
                bits |= Self::bit(axis);
            }
        }
        TypeCode(bits)
    }

    /// Position in `TypeCode::ALL`
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn pole(self, axis: Axis) -> Pole {
        if self.0 & Self::bit(axis) != 0 {
            Pole::Second
        } else {
            Pole::First
        }
    }

    pub fn letter(self, axis: Axis) -> char {
        let (first, second) = axis.letters();
        match self.pole(axis) {
            Pole::First => first,
            Pole::Second => second,
        }
    }

    /// Same code with one axis letter flipped
    pub fn flip(self, axis: Axis) -> Self {
        TypeCode(self.0 ^ Self::bit(axis))
    }

    pub fn display(self) -> TypeDisplay {
        let (title, title_ko, animal) = DISPLAY_TABLE[self.index()];
        TypeDisplay {
            title: title.to_string(),
            title_ko: title_ko.to_string(),
            animal: animal.to_string(),
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in Axis::ALL {
            write!(f, "{}", self.letter(axis))?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeCode({})", self)
    }
}

/// Parse failure for a type code outside the 16-code set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid APT type code: {0:?}")]
pub struct InvalidTypeCode(pub String);

impl FromStr for TypeCode {
    type Err = InvalidTypeCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let letters: Vec<char> = trimmed.chars().collect();
        if letters.len() != 4 {
            return Err(InvalidTypeCode(s.to_string()));
        }

        let mut bits = 0u8;
        for (axis, letter) in Axis::ALL.iter().zip(letters) {
            match Axis::from_letter(letter) {
                Some((found, pole)) if found == *axis => {
                    if pole == Pole::Second {
                        bits |= Self::bit(*axis);
                    }
                }
                _ => return Err(InvalidTypeCode(s.to_string())),
            }
        }
        Ok(TypeCode(bits))
    }
}

impl TryFrom<String> for TypeCode {
    type Error = InvalidTypeCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeCode> for String {
    fn from(code: TypeCode) -> Self {
        code.to_string()
    }
}

/// Display metadata per code: (title, Korean title, animal), canonical order
const DISPLAY_TABLE: [(&str, &str, &str); 16] = [
    ("Dreamy Wanderer", "몽환적 방랑자", "fox"),
    ("Emotional Curator", "감성 큐레이터", "cat"),
    ("Intuitive Explorer", "직관적 탐구자", "owl"),
    ("Philosophical Collector", "철학적 수집가", "turtle"),
    ("Solitary Observer", "고독한 관찰자", "chameleon"),
    ("Delicate Connoisseur", "섬세한 감정가", "hedgehog"),
    ("Digital Explorer", "디지털 탐험가", "octopus"),
    ("Scholarly Researcher", "학구적 연구자", "beaver"),
    ("Emotion Sharer", "감성 나눔이", "butterfly"),
    ("Art Networker", "예술 네트워커", "penguin"),
    ("Inspiration Evangelist", "영감 전도사", "parrot"),
    ("Culture Planner", "문화 기획자", "deer"),
    ("Passionate Spectator", "열정적 관람자", "dog"),
    ("Warm Guide", "따뜻한 안내자", "duck"),
    ("Knowledge Mentor", "지식 멘토", "elephant"),
    ("Systematic Educator", "체계적 교육자", "eagle"),
];

/// Human-facing labels for a type code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDisplay {
    pub title: String,
    pub title_ko: String,
    pub animal: String,
}

// ============================================================================
// Tiers and strategies
// ============================================================================

/// Evidence tier assigned to a normalized record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTier {
    Rich,
    Moderate,
    Sparse,
    Minimal,
    Attribution,
}

impl DataTier {
    pub const ALL: [DataTier; 5] = [
        DataTier::Rich,
        DataTier::Moderate,
        DataTier::Sparse,
        DataTier::Minimal,
        DataTier::Attribution,
    ];

    /// Confidence may never exceed this for the tier
    pub fn ceiling(self) -> u8 {
        match self {
            DataTier::Rich => 90,
            DataTier::Moderate => 75,
            DataTier::Sparse => 60,
            DataTier::Minimal => 45,
            DataTier::Attribution => 50,
        }
    }

    /// Confidence with zero axis clarity
    pub fn floor(self) -> u8 {
        match self {
            DataTier::Rich => 60,
            DataTier::Moderate => 50,
            DataTier::Sparse => 40,
            DataTier::Minimal => 30,
            DataTier::Attribution => 35,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataTier::Rich => "rich",
            DataTier::Moderate => "moderate",
            DataTier::Sparse => "sparse",
            DataTier::Minimal => "minimal",
            DataTier::Attribution => "attribution",
        }
    }
}

impl fmt::Display for DataTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataTier::ALL
            .iter()
            .copied()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| format!("unknown data tier: {}", s))
    }
}

/// Which scorer produced an axis value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    AiAssisted,
    TextGrounded,
    Heuristic,
}

impl ScoringStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringStrategy::AiAssisted => "ai_assisted",
            ScoringStrategy::TextGrounded => "text_grounded",
            ScoringStrategy::Heuristic => "heuristic",
        }
    }
}

/// Per-axis provenance entry in profile metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisProvenance {
    pub axis: Axis,
    pub strategy: ScoringStrategy,
}

// ============================================================================
// Profile
// ============================================================================

/// One ranked persona type within a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAssignment {
    #[serde(rename = "type")]
    pub type_code: TypeCode,
    /// Share of the profile (0.0-1.0)
    pub weight: f64,
    /// 0-100, never above the tier ceiling
    pub confidence: u8,
    /// 1-based, contiguous
    pub rank: u8,
    #[serde(flatten)]
    pub display: TypeDisplay,
}

/// Caveat attached to attribution-tier profiles
pub const ATTRIBUTION_CAVEAT: &str =
    "attribution: subject is a workshop/follower convention, not an individual";

/// Caveat attached to profiles whose primary type was redrawn
pub const REBALANCED_CAVEAT: &str =
    "rebalanced: primary type redrawn to limit over-represented types";

/// Provenance and diagnostics stored alongside the scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMeta {
    /// Summary, e.g. "text_grounded+heuristic" or "heuristic+rebalanced"
    pub strategy: String,
    pub axis_strategies: Vec<AxisProvenance>,
    pub tier: DataTier,
    /// Overall confidence (equal to the primary assignment's confidence)
    pub confidence: u8,
    pub reasoning: Vec<String>,
    pub sources: Vec<String>,
    pub caveats: Vec<String>,
    pub classified_at: DateTime<Utc>,
    pub classifier_version: String,
}

/// Final persona profile owned by one artist record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AptProfile {
    pub artist_id: Uuid,
    pub dimensions: Dimensions,
    /// Ordered by weight, at most three
    pub primary_types: Vec<TypeAssignment>,
    pub meta: ProfileMeta,
}

impl AptProfile {
    pub fn primary(&self) -> Option<&TypeAssignment> {
        self.primary_types.first()
    }

    pub fn primary_code(&self) -> Option<TypeCode> {
        self.primary().map(|t| t.type_code)
    }

    pub fn confidence(&self) -> u8 {
        self.meta.confidence
    }

    pub fn scores(&self) -> AxisScores {
        self.dimensions.to_scores()
    }
}
