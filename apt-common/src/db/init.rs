//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the classifier tables
//! if they do not exist. Safe to call on every startup.

use crate::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Applied to every pooled connection. WAL lets report readers run
    // alongside batch writers.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the classifier tables (idempotent)
///
/// - `artists`: projection of the artist records supplied by collaborators
/// - `apt_profiles`: one profile per artist, removed with its artist
/// - `apt_profile_history`: append-only audit log of every write
/// - `classification_runs`: batch run state and final report
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id TEXT PRIMARY KEY,
            name TEXT,
            name_localized TEXT,
            nationality TEXT,
            movements TEXT NOT NULL DEFAULT '[]',
            birth_year INTEGER,
            death_year INTEGER,
            biography TEXT,
            medium TEXT,
            artwork_count INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS apt_profiles (
            artist_id TEXT PRIMARY KEY REFERENCES artists(id) ON DELETE CASCADE,
            primary_type TEXT NOT NULL,
            confidence INTEGER NOT NULL,
            tier TEXT NOT NULL,
            strategy TEXT NOT NULL,
            profile_json TEXT NOT NULL,
            classified_at TEXT NOT NULL,
            run_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS apt_profile_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            artist_id TEXT NOT NULL,
            run_id TEXT,
            primary_type TEXT NOT NULL,
            confidence INTEGER NOT NULL,
            strategy TEXT NOT NULL,
            dimensions_json TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_apt_profile_history_artist ON apt_profile_history(artist_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS classification_runs (
            run_id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            error TEXT,
            report_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database tables initialized (artists, apt_profiles, apt_profile_history, classification_runs)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_database_creates_file_and_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("apt.db");

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(
            tables,
            vec![
                "apt_profile_history".to_string(),
                "apt_profiles".to_string(),
                "artists".to_string(),
                "classification_runs".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_tables(&pool).await.unwrap();
        init_tables(&pool).await.unwrap();
    }
}
