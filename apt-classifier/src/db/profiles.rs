//! Profile persistence
//!
//! `apt_profiles` holds exactly one row per artist, overwritten wholesale on
//! reclassification. Every write also appends to `apt_profile_history`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, timestamp};
use crate::error::ClassifyResult;
use crate::models::BatchRun;
use crate::types::{AptProfile, Dimensions, TypeCode};

/// Write collaborator for finished profiles
#[async_trait::async_trait]
pub trait ProfileSink: Send + Sync {
    /// Insert or fully overwrite the artist's profile
    async fn upsert_profile(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()>;

    /// Append an audit entry for the profile
    async fn append_history(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()>;

    /// Upsert plus history append
    async fn persist(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()> {
        self.upsert_profile(profile, run_id).await?;
        self.append_history(profile, run_id).await
    }

    /// Record batch run state; sinks without run tracking ignore it
    async fn record_run(&self, _run: &BatchRun) -> ClassifyResult<()> {
        Ok(())
    }
}

/// One audit log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub artist_id: Uuid,
    pub run_id: Option<Uuid>,
    pub primary_type: TypeCode,
    pub confidence: u8,
    pub strategy: String,
    pub dimensions: Dimensions,
    pub recorded_at: DateTime<Utc>,
}

/// SQLite-backed [`ProfileSink`]
#[derive(Clone)]
pub struct SqliteProfileSink {
    pool: SqlitePool,
}

impl SqliteProfileSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Values bound for both tables, prepared before touching the pool
struct ProfileRow {
    artist_id: String,
    primary_type: String,
    confidence: i64,
    tier: &'static str,
    strategy: String,
    profile_json: String,
    dimensions_json: String,
    classified_at: String,
    run_id: Option<String>,
}

impl ProfileRow {
    fn prepare(profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<Self> {
        Ok(Self {
            artist_id: profile.artist_id.to_string(),
            primary_type: profile
                .primary_code()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            confidence: i64::from(profile.meta.confidence),
            tier: profile.meta.tier.as_str(),
            strategy: profile.meta.strategy.clone(),
            profile_json: serde_json::to_string(profile)?,
            dimensions_json: serde_json::to_string(&profile.dimensions)?,
            classified_at: timestamp(&profile.meta.classified_at),
            run_id: run_id.map(|id| id.to_string()),
        })
    }
}

async fn upsert_in<'c, E>(executor: E, row: &ProfileRow) -> ClassifyResult<()>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO apt_profiles (
            artist_id, primary_type, confidence, tier, strategy,
            profile_json, classified_at, run_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(artist_id) DO UPDATE SET
            primary_type = excluded.primary_type,
            confidence = excluded.confidence,
            tier = excluded.tier,
            strategy = excluded.strategy,
            profile_json = excluded.profile_json,
            classified_at = excluded.classified_at,
            run_id = excluded.run_id
        "#,
    )
    .bind(&row.artist_id)
    .bind(&row.primary_type)
    .bind(row.confidence)
    .bind(row.tier)
    .bind(&row.strategy)
    .bind(&row.profile_json)
    .bind(&row.classified_at)
    .bind(&row.run_id)
    .execute(executor)
    .await?;
    Ok(())
}

async fn append_in<'c, E>(executor: E, row: &ProfileRow) -> ClassifyResult<()>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO apt_profile_history (
            artist_id, run_id, primary_type, confidence, strategy,
            dimensions_json, recorded_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.artist_id)
    .bind(&row.run_id)
    .bind(&row.primary_type)
    .bind(row.confidence)
    .bind(&row.strategy)
    .bind(&row.dimensions_json)
    .bind(timestamp(&Utc::now()))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl ProfileSink for SqliteProfileSink {
    async fn upsert_profile(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()> {
        let row = ProfileRow::prepare(profile, run_id)?;
        upsert_in(&self.pool, &row).await
    }

    async fn append_history(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()> {
        let row = ProfileRow::prepare(profile, run_id)?;
        append_in(&self.pool, &row).await
    }

    /// Both writes share one transaction
    async fn persist(&self, profile: &AptProfile, run_id: Option<Uuid>) -> ClassifyResult<()> {
        let row = ProfileRow::prepare(profile, run_id)?;

        let mut tx: Transaction<'_, Sqlite> = self.pool.begin().await?;
        upsert_in(&mut *tx, &row).await?;
        append_in(&mut *tx, &row).await?;
        tx.commit().await?;

        tracing::debug!(
            artist_id = %profile.artist_id,
            primary_type = %row.primary_type,
            confidence = row.confidence,
            "Profile persisted"
        );
        Ok(())
    }

    async fn record_run(&self, run: &BatchRun) -> ClassifyResult<()> {
        super::runs::save_run(&self.pool, run).await
    }
}

/// Load an artist's current profile
pub async fn load_profile(pool: &SqlitePool, artist_id: Uuid) -> ClassifyResult<Option<AptProfile>> {
    let json: Option<String> =
        sqlx::query_scalar("SELECT profile_json FROM apt_profiles WHERE artist_id = ?")
            .bind(artist_id.to_string())
            .fetch_optional(pool)
            .await?;

    json.map(|json| serde_json::from_str(&json).map_err(|e| super::corrupt("profile_json", e)))
        .transpose()
}

/// Load an artist's audit log, newest first
pub async fn load_history(
    pool: &SqlitePool,
    artist_id: Uuid,
    limit: usize,
) -> ClassifyResult<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, artist_id, run_id, primary_type, confidence, strategy,
               dimensions_json, recorded_at
        FROM apt_profile_history
        WHERE artist_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(artist_id.to_string())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let artist_id: String = row.get("artist_id");
            let run_id: Option<String> = row.get("run_id");
            let primary_type: String = row.get("primary_type");
            let dimensions: String = row.get("dimensions_json");
            let recorded_at: String = row.get("recorded_at");
            let confidence: i64 = row.get("confidence");

            Ok(HistoryEntry {
                id: row.get("id"),
                artist_id: parse_uuid("artist_id", &artist_id)?,
                run_id: run_id.as_deref().map(|id| parse_uuid("run_id", id)).transpose()?,
                primary_type: primary_type
                    .parse()
                    .map_err(|e| super::corrupt("primary_type", e))?,
                confidence: confidence.clamp(0, 100) as u8,
                strategy: row.get("strategy"),
                dimensions: serde_json::from_str(&dimensions)
                    .map_err(|e| super::corrupt("dimensions_json", e))?,
                recorded_at: parse_timestamp("recorded_at", &recorded_at)?,
            })
        })
        .collect()
}

/// Number of profiled artists
pub async fn count_profiles(pool: &SqlitePool) -> ClassifyResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM apt_profiles")
        .fetch_one(pool)
        .await?)
}
