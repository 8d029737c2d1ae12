//! Artist record shapes
//!
//! `RawArtistRecord` is what collaborators hand us (any field may be
//! missing). `NormalizedRecord` is the canonical form produced by the
//! normalizer, where every optional field is an explicit [`Field`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::TypeCode;

/// Summary of the profile an artist already has, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorClassification {
    pub primary_type: TypeCode,
    pub confidence: u8,
    pub classified_at: DateTime<Utc>,
}

/// Artist record as supplied by the read collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtistRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub name_localized: Option<String>,
    pub nationality: Option<String>,
    /// Era / movement tags, free text
    pub movements: Vec<String>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub biography: Option<String>,
    pub medium: Option<String>,
    pub artwork_count: Option<u32>,
    pub prior: Option<PriorClassification>,
}

impl RawArtistRecord {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Explicit presence marker for a normalized field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Field<T> {
    Known(T),
    Unknown,
}

impl<T> Field<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Field::Known(_))
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Field::Known(value) => Some(value),
            Field::Unknown => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Known(value) => Some(value),
            Field::Unknown => None,
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unknown
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Known(v),
            None => Field::Unknown,
        }
    }
}

/// Attribution phrasing detected in an artist name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    /// Canonical lowercase prefix, e.g. "workshop of"
    pub qualifiers: Vec<String>,
    /// Name of the artist the attribution points at, if recoverable
    pub subject: Option<String>,
}

/// Canonical record consumed by tiering, enrichment and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: Uuid,
    /// Cleaned display name
    pub name: String,
    /// Name used for reference lookups (attribution subject when present)
    pub lookup_name: String,
    pub name_localized: Field<String>,
    pub nationality: Field<String>,
    /// Lowercased, deduplicated
    pub movements: Field<Vec<String>>,
    pub birth_year: Field<i32>,
    pub death_year: Field<i32>,
    pub biography: Field<String>,
    /// Lowercased
    pub medium: Field<String>,
    pub artwork_count: Field<u32>,
    pub attribution: Option<Attribution>,
    pub prior: Option<PriorClassification>,
    /// Sources merged in by enrichment
    pub enriched_from: Vec<String>,
}

impl NormalizedRecord {
    /// Biography length in characters (0 when unknown)
    pub fn biography_len(&self) -> usize {
        self.biography
            .known()
            .map(|b| b.chars().count())
            .unwrap_or(0)
    }

    /// Number of known corroborating metadata fields
    /// (nationality, era/movement, birth year, medium)
    pub fn metadata_count(&self) -> usize {
        [
            self.nationality.is_known(),
            self.movements.is_known(),
            self.birth_year.is_known(),
            self.medium.is_known(),
        ]
        .iter()
        .filter(|known| **known)
        .count()
    }

    /// Lifespan in years when both dates are known
    pub fn lifespan(&self) -> Option<i32> {
        match (self.birth_year.known(), self.death_year.known()) {
            (Some(birth), Some(death)) => Some(death - birth),
            _ => None,
        }
    }
}
