//! Store access for the classifier
//!
//! The pipeline only sees the [`WorkSelector`] and [`ProfileSink`] traits;
//! the SQLite implementations here sit on the schema created by
//! `apt_common::db::init_tables`.

pub mod artists;
pub mod profiles;
pub mod runs;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{ClassifyError, ClassifyResult};

pub use artists::{SelectionPredicate, SqliteWorkSelector, WorkSelector};
pub use profiles::{HistoryEntry, ProfileSink, SqliteProfileSink};

/// Timestamps are stored as fixed-width RFC 3339 UTC text so they sort
/// lexically
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> ClassifyResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(column, e))
}

pub(crate) fn parse_uuid(column: &str, value: &str) -> ClassifyResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| corrupt(column, e))
}

pub(crate) fn corrupt(column: &str, err: impl std::fmt::Display) -> ClassifyError {
    ClassifyError::Persistence(apt_common::Error::corrupt(column, err))
}
