//! Artist store operations and work selection
//!
//! Artists are written by collaborators (crawlers, seeding scripts); the
//! classifier only reads them. `upsert_artist` exists for imports and tests.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, timestamp};
use crate::error::{ClassifyError, ClassifyResult};
use crate::models::{PriorClassification, RawArtistRecord};

/// Which records a selection should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPredicate {
    /// Artists with no profile yet
    Unprofiled,
    /// Profiled artists whose confidence is below the value
    ConfidenceBelow(u8),
    /// Profiled artists last classified before the instant
    ClassifiedBefore(DateTime<Utc>),
}

/// Read collaborator: select artist records by predicate
#[async_trait::async_trait]
pub trait WorkSelector: Send + Sync {
    async fn select(
        &self,
        predicate: &SelectionPredicate,
        limit: usize,
    ) -> ClassifyResult<Vec<RawArtistRecord>>;
}

/// SQLite-backed [`WorkSelector`]
#[derive(Clone)]
pub struct SqliteWorkSelector {
    pool: SqlitePool,
}

impl SqliteWorkSelector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT a.id, a.name, a.name_localized, a.nationality, a.movements,
           a.birth_year, a.death_year, a.biography, a.medium, a.artwork_count,
           p.primary_type, p.confidence, p.classified_at
    FROM artists a
    LEFT JOIN apt_profiles p ON p.artist_id = a.id
"#;

#[async_trait::async_trait]
impl WorkSelector for SqliteWorkSelector {
    async fn select(
        &self,
        predicate: &SelectionPredicate,
        limit: usize,
    ) -> ClassifyResult<Vec<RawArtistRecord>> {
        let limit = limit as i64;

        let rows = match predicate {
            SelectionPredicate::Unprofiled => {
                sqlx::query(&format!(
                    "{} WHERE p.artist_id IS NULL ORDER BY a.created_at, a.id LIMIT ?",
                    SELECT_COLUMNS
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            SelectionPredicate::ConfidenceBelow(threshold) => {
                sqlx::query(&format!(
                    "{} WHERE p.confidence < ? ORDER BY p.confidence, a.id LIMIT ?",
                    SELECT_COLUMNS
                ))
                .bind(i64::from(*threshold))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            SelectionPredicate::ClassifiedBefore(cutoff) => {
                sqlx::query(&format!(
                    "{} WHERE p.classified_at < ? ORDER BY p.classified_at, a.id LIMIT ?",
                    SELECT_COLUMNS
                ))
                .bind(timestamp(cutoff))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| ClassifyError::Selection(format!("{:?} query failed: {}", predicate, e)))?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> ClassifyResult<RawArtistRecord> {
    let id: String = row.get("id");
    let movements: Option<String> = row.get("movements");
    let movements: Vec<String> = match movements.as_deref() {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(json)
            .map_err(|e| super::corrupt("movements", e))?,
        _ => Vec::new(),
    };

    let prior = match row.get::<Option<String>, _>("primary_type") {
        Some(code) => {
            let classified_at: String = row.get("classified_at");
            let confidence: i64 = row.get("confidence");
            Some(PriorClassification {
                primary_type: code.parse().map_err(|e| super::corrupt("primary_type", e))?,
                confidence: confidence.clamp(0, 100) as u8,
                classified_at: parse_timestamp("classified_at", &classified_at)?,
            })
        }
        None => None,
    };

    Ok(RawArtistRecord {
        id: parse_uuid("id", &id)?,
        name: row.get("name"),
        name_localized: row.get("name_localized"),
        nationality: row.get("nationality"),
        movements,
        birth_year: row.get::<Option<i64>, _>("birth_year").map(|y| y as i32),
        death_year: row.get::<Option<i64>, _>("death_year").map(|y| y as i32),
        biography: row.get("biography"),
        medium: row.get("medium"),
        artwork_count: row
            .get::<Option<i64>, _>("artwork_count")
            .and_then(|c| u32::try_from(c).ok()),
        prior,
    })
}

/// Insert or update an artist record
pub async fn upsert_artist(pool: &SqlitePool, artist: &RawArtistRecord) -> ClassifyResult<()> {
    let movements = serde_json::to_string(&artist.movements)?;

    sqlx::query(
        r#"
        INSERT INTO artists (
            id, name, name_localized, nationality, movements, birth_year,
            death_year, biography, medium, artwork_count, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            name_localized = excluded.name_localized,
            nationality = excluded.nationality,
            movements = excluded.movements,
            birth_year = excluded.birth_year,
            death_year = excluded.death_year,
            biography = excluded.biography,
            medium = excluded.medium,
            artwork_count = excluded.artwork_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(artist.id.to_string())
    .bind(&artist.name)
    .bind(&artist.name_localized)
    .bind(&artist.nationality)
    .bind(&movements)
    .bind(artist.birth_year)
    .bind(artist.death_year)
    .bind(&artist.biography)
    .bind(&artist.medium)
    .bind(artist.artwork_count.map(i64::from))
    .bind(timestamp(&Utc::now()))
    .bind(timestamp(&Utc::now()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one artist with its prior classification
pub async fn load_artist(pool: &SqlitePool, artist_id: Uuid) -> ClassifyResult<Option<RawArtistRecord>> {
    let row = sqlx::query(&format!("{} WHERE a.id = ?", SELECT_COLUMNS))
        .bind(artist_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Delete an artist (its profile goes with it)
pub async fn delete_artist(pool: &SqlitePool, artist_id: Uuid) -> ClassifyResult<bool> {
    let result = sqlx::query("DELETE FROM artists WHERE id = ?")
        .bind(artist_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
