//! Batch orchestration: state machine, failure isolation, cancellation

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use apt_classifier::classifier::ArtistClassifier;
use apt_classifier::models::{BatchState, RawArtistRecord};
use apt_classifier::orchestrator::{BatchEvent, BatchOrchestrator};
use apt_classifier::rebalancer::{RebalanceConfig, Rebalancer};
use helpers::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[tokio::test]
async fn test_selection_failure_fails_run() {
    let sink = Arc::new(MemorySink::default());
    let orchestrator = orchestrator(Arc::new(BrokenSelector), sink.clone(), 10);

    let run = orchestrator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(run.state, BatchState::Failed);
    assert!(run.error.as_deref().unwrap().contains("artist store unreachable"));
    assert!(run.report.is_none());
    assert!(run.ended_at.is_some());
    assert_eq!(sink.profile_count(), 0);
    assert_eq!(sink.last_run().unwrap().state, BatchState::Failed);
}

#[tokio::test]
async fn test_completed_run_reports_counts() {
    let mut records = name_only_records(5);
    records.push(RawArtistRecord {
        id: Uuid::new_v4(),
        name: Some("  ".to_string()),
        ..Default::default()
    });
    let sink = Arc::new(MemorySink::default());
    let orchestrator = orchestrator(Arc::new(FixedSelector::new(records)), sink.clone(), 10);

    let run = orchestrator.run(CancellationToken::new()).await.unwrap();
    let report = run.report.clone().unwrap();

    assert_eq!(run.state, BatchState::Done);
    assert_eq!(report.selected, 6);
    assert_eq!(report.classified, 5);
    assert_eq!(report.skipped_invalid, 1);
    assert_eq!(report.failed_persistence, 0);
    assert!(!report.cancelled);
    assert_eq!(report.tier_counts["minimal"], 5);
    assert_eq!(report.type_counts.values().sum::<usize>(), 5);

    // Initial SELECTING row, then the terminal row
    let runs = sink.runs.lock().unwrap();
    assert_eq!(runs.first().unwrap().state, BatchState::Selecting);
    assert_eq!(runs.last().unwrap().state, BatchState::Done);
    assert!(runs.last().unwrap().report.is_some());
}

#[tokio::test]
async fn test_persistence_failure_is_isolated() {
    let records = name_only_records(10);
    let failing = vec![records[2].id, records[7].id];
    let sink = Arc::new(MemorySink::failing_for(failing.clone()));
    let orchestrator = orchestrator(Arc::new(FixedSelector::new(records)), sink.clone(), 10);

    let run = orchestrator.run(CancellationToken::new()).await.unwrap();
    let report = run.report.unwrap();

    assert_eq!(run.state, BatchState::Done);
    assert_eq!(report.classified, 8);
    assert_eq!(report.failed_persistence, 2);
    assert_eq!(sink.profile_count(), 8);
    for id in failing {
        assert!(sink.profile(id).is_none());
        assert!(sink.history.lock().unwrap().iter().all(|(a, _)| *a != id));
    }
}

#[tokio::test]
async fn test_failed_profiles_are_retried() {
    let records = name_only_records(1);
    let sink = Arc::new(MemorySink::failing_for(vec![records[0].id]));
    let orchestrator = orchestrator(Arc::new(FixedSelector::new(records)), sink.clone(), 10);

    orchestrator.run(CancellationToken::new()).await.unwrap();

    // persistence_max_attempts in the test config
    assert_eq!(sink.attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let sink = Arc::new(MemorySink::default());
    let orchestrator = orchestrator(
        Arc::new(FixedSelector::new(name_only_records(30))),
        sink.clone(),
        30,
    );

    let token = CancellationToken::new();
    token.cancel();
    let run = orchestrator.run(token).await.unwrap();
    let report = run.report.unwrap();

    assert_eq!(run.state, BatchState::Cancelled);
    assert!(report.cancelled);
    assert_eq!(report.selected, 30);
    assert_eq!(report.classified, 0);
    assert_eq!(sink.profile_count(), 0);
}

#[tokio::test]
async fn test_cancel_between_sub_batches_keeps_finished_work() {
    let sink = Arc::new(MemorySink::default());
    let mut config = test_batch_config(25);
    config.pause_between_sub_batches = Duration::from_secs(30);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = BatchOrchestrator::new(
        Arc::new(FixedSelector::new(name_only_records(25))),
        sink.clone(),
        Arc::new(ArtistClassifier::offline()),
        Rebalancer::new(RebalanceConfig::default()),
        config,
    )
    .with_events(tx);

    let token = CancellationToken::new();
    let listener_token = token.clone();
    let listener = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            if matches!(event, BatchEvent::SubBatchCompleted { index: 1, .. }) {
                listener_token.cancel();
            }
            events.push(event);
        }
        events
    });

    let run = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(token))
        .await
        .expect("cancellation must interrupt the pause")
        .unwrap();
    drop(orchestrator);
    let events = listener.await.unwrap();

    let report = run.report.unwrap();
    assert_eq!(run.state, BatchState::Cancelled);
    assert_eq!(report.classified, 10);
    assert_eq!(report.rebalanced, 0);
    assert_eq!(sink.profile_count(), 10);

    let classified_events = events
        .iter()
        .filter(|e| matches!(e, BatchEvent::RecordClassified { .. }))
        .count();
    assert_eq!(classified_events, 10);
    assert!(matches!(events.last(), Some(BatchEvent::Completed(r)) if r.cancelled));
}

#[tokio::test]
async fn test_state_transitions_are_emitted_in_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator(
        Arc::new(FixedSelector::new(name_only_records(3))),
        Arc::new(MemorySink::default()),
        10,
    )
    .with_events(tx);

    orchestrator.run(CancellationToken::new()).await.unwrap();
    drop(orchestrator);

    let mut states = Vec::new();
    while let Some(event) = rx.recv().await {
        if let BatchEvent::StateChanged(transition) = event {
            states.push(transition.new_state);
        }
    }
    assert_eq!(
        states,
        vec![
            BatchState::Processing,
            BatchState::Rebalancing,
            BatchState::Reporting,
            BatchState::Done,
        ]
    );
}
