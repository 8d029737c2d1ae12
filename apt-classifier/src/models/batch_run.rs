//! Batch run state machine
//!
//! A classification run progresses through:
//! SELECTING → PROCESSING → REBALANCING → REPORTING → DONE
//! with FAILED and CANCELLED as the other terminal states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::orchestrator::statistics::BatchReport;

/// Batch run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchState {
    /// Pulling the prioritized work set
    Selecting,
    /// Scoring sub-batches and persisting raw profiles
    Processing,
    /// Redrawing over-represented low-confidence primaries
    Rebalancing,
    /// Aggregating the batch report
    Reporting,
    /// Run finished successfully
    Done,
    /// Work selection failed; nothing was processed
    Failed,
    /// Stopped between sub-batches by request
    Cancelled,
}

impl BatchState {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchState::Selecting => "SELECTING",
            BatchState::Processing => "PROCESSING",
            BatchState::Rebalancing => "REBALANCING",
            BatchState::Reporting => "REPORTING",
            BatchState::Done => "DONE",
            BatchState::Failed => "FAILED",
            BatchState::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchState::Done | BatchState::Failed | BatchState::Cancelled
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BatchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SELECTING" => Ok(BatchState::Selecting),
            "PROCESSING" => Ok(BatchState::Processing),
            "REBALANCING" => Ok(BatchState::Rebalancing),
            "REPORTING" => Ok(BatchState::Reporting),
            "DONE" => Ok(BatchState::Done),
            "FAILED" => Ok(BatchState::Failed),
            "CANCELLED" => Ok(BatchState::Cancelled),
            other => Err(format!("unknown batch state: {}", other)),
        }
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: BatchState,
    pub new_state: BatchState,
    pub transitioned_at: DateTime<Utc>,
}

/// One classification run (in-memory, persisted at the end)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRun {
    pub run_id: Uuid,
    pub state: BatchState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure reason for FAILED runs
    pub error: Option<String>,
    pub report: Option<BatchReport>,
}

impl BatchRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: BatchState::Selecting,
            started_at: Utc::now(),
            ended_at: None,
            error: None,
            report: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: BatchState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Mark run failed with a reason
    pub fn fail(&mut self, reason: impl Into<String>) -> StateTransition {
        self.error = Some(reason.into());
        self.transition_to(BatchState::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Default for BatchRun {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_starts_selecting() {
        let run = BatchRun::new();
        assert_eq!(run.state, BatchState::Selecting);
        assert!(run.ended_at.is_none());
        assert!(!run.is_terminal());
    }

    #[test]
    fn test_terminal_transition_sets_end_time() {
        let mut run = BatchRun::new();
        let t = run.transition_to(BatchState::Processing);
        assert_eq!(t.old_state, BatchState::Selecting);
        assert_eq!(t.new_state, BatchState::Processing);
        assert!(run.ended_at.is_none());

        run.transition_to(BatchState::Cancelled);
        assert!(run.is_terminal());
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut run = BatchRun::new();
        run.fail("selection query failed");
        assert_eq!(run.state, BatchState::Failed);
        assert_eq!(run.error.as_deref(), Some("selection query failed"));
    }
}
