//! Classification run persistence

use sqlx::{Row, SqlitePool};

use super::{parse_timestamp, parse_uuid, timestamp};
use crate::error::ClassifyResult;
use crate::models::{BatchRun, BatchState};

/// Insert or update a run row
pub async fn save_run(pool: &SqlitePool, run: &BatchRun) -> ClassifyResult<()> {
    let report_json = run.report.as_ref().map(serde_json::to_string).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO classification_runs (run_id, state, started_at, ended_at, error, report_json)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            state = excluded.state,
            ended_at = excluded.ended_at,
            error = excluded.error,
            report_json = excluded.report_json
        "#,
    )
    .bind(run.run_id.to_string())
    .bind(run.state.as_str())
    .bind(timestamp(&run.started_at))
    .bind(run.ended_at.as_ref().map(timestamp))
    .bind(&run.error)
    .bind(&report_json)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recently started run, if any
pub async fn load_latest_run(pool: &SqlitePool) -> ClassifyResult<Option<BatchRun>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, state, started_at, ended_at, error, report_json
        FROM classification_runs
        ORDER BY started_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let run_id: String = row.get("run_id");
    let state: String = row.get("state");
    let started_at: String = row.get("started_at");
    let ended_at: Option<String> = row.get("ended_at");
    let report_json: Option<String> = row.get("report_json");

    Ok(Some(BatchRun {
        run_id: parse_uuid("run_id", &run_id)?,
        state: state
            .parse::<BatchState>()
            .map_err(|e| super::corrupt("state", e))?,
        started_at: parse_timestamp("started_at", &started_at)?,
        ended_at: ended_at
            .as_deref()
            .map(|at| parse_timestamp("ended_at", at))
            .transpose()?,
        error: row.get("error"),
        report: report_json
            .as_deref()
            .map(|json| serde_json::from_str(json).map_err(|e| super::corrupt("report_json", e)))
            .transpose()?,
    }))
}
