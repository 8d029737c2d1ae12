//! Integration tests for the reporting HTTP surface

mod helpers;

use apt_classifier::classifier::ArtistClassifier;
use apt_classifier::db::artists::upsert_artist;
use apt_classifier::db::runs::save_run;
use apt_classifier::db::{ProfileSink, SqliteProfileSink};
use apt_classifier::enrichment::EnrichmentCache;
use apt_classifier::models::{BatchRun, BatchState, RawArtistRecord};
use apt_classifier::orchestrator::BatchReport;
use apt_classifier::{build_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::temp_database;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, pool) = temp_database().await;
    let app = build_router(AppState::new(pool));

    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "apt-classifier");
    assert_eq!(body["profiles"], 0);
    assert!(body.get("last_run").is_none());
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_health_reports_store_contents_and_last_run() {
    let (_dir, pool) = temp_database().await;
    let app = build_router(AppState::new(pool.clone()));

    let raw = RawArtistRecord::new(Uuid::new_v4(), "Health Example");
    upsert_artist(&pool, &raw).await.unwrap();
    let profile = ArtistClassifier::offline()
        .classify(&raw, &EnrichmentCache::new())
        .await
        .unwrap()
        .profile;
    SqliteProfileSink::new(pool.clone())
        .persist(&profile, None)
        .await
        .unwrap();

    let mut run = BatchRun::new();
    let mut report = BatchReport::new(run.run_id);
    report.classified = 1;
    run.report = Some(report);
    run.transition_to(BatchState::Done);
    save_run(&pool, &run).await.unwrap();

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profiles"], 1);
    assert_eq!(body["last_run"]["run_id"], run.run_id.to_string());
    assert_eq!(body["last_run"]["state"], "DONE");
    assert_eq!(body["last_run"]["classified"], 1);
}

#[tokio::test]
async fn test_health_degrades_when_store_is_closed() {
    let (_dir, pool) = temp_database().await;
    let app = build_router(AppState::new(pool.clone()));
    pool.close().await;

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert!(body.get("profiles").is_none());
}

#[tokio::test]
async fn test_latest_report_missing_then_present() {
    let (_dir, pool) = temp_database().await;
    let app = build_router(AppState::new(pool.clone()));

    let (status, body) = get(app.clone(), "/reports/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let mut run = BatchRun::new();
    let mut report = BatchReport::new(run.run_id);
    report.selected = 3;
    report.classified = 3;
    run.report = Some(report);
    run.transition_to(BatchState::Done);
    save_run(&pool, &run).await.unwrap();

    let (status, body) = get(app, "/reports/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["run_id"], run.run_id.to_string());
    assert_eq!(body["state"], "DONE");
    assert_eq!(body["report"]["classified"], 3);
}

#[tokio::test]
async fn test_profile_lookup() {
    let (_dir, pool) = temp_database().await;
    let app = build_router(AppState::new(pool.clone()));

    let raw = RawArtistRecord::new(Uuid::new_v4(), "Api Example");
    upsert_artist(&pool, &raw).await.unwrap();

    let (status, _) = get(app.clone(), &format!("/profiles/{}", raw.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let profile = ArtistClassifier::offline()
        .classify(&raw, &EnrichmentCache::new())
        .await
        .unwrap()
        .profile;
    let sink = SqliteProfileSink::new(pool.clone());
    sink.persist(&profile, None).await.unwrap();
    sink.persist(&profile, None).await.unwrap();

    let (status, body) = get(app.clone(), &format!("/profiles/{}", raw.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artist_id"], raw.id.to_string());
    assert_eq!(
        body["primary_types"][0]["type"],
        profile.primary_code().unwrap().to_string()
    );

    let (status, body) = get(app.clone(), &format!("/profiles/{}/history", raw.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get(app, &format!("/profiles/{}/history?limit=1", raw.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_artist_id() {
    let (_dir, pool) = temp_database().await;
    let app = build_router(AppState::new(pool));

    let (status, body) = get(app, "/profiles/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
