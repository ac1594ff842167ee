use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::SourceOutcome;
use crate::reconcile::SyncSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(SyncSummary),
    /// Storage error or panic; nothing was committed.
    Failed { reason: String },
    /// Abandoned at the run deadline, before the commit began; nothing was
    /// committed. A commit already under way is never cut off.
    TimedOut,
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&SyncSummary> {
        match self {
            RunOutcome::Completed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed(summary) => write!(
                f,
                "synced {} events, {} writes, {} deletes",
                summary.received, summary.written, summary.deleted
            ),
            RunOutcome::Failed { reason } => write!(f, "failed: {reason}"),
            RunOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-source outcomes; empty when the run ended before aggregation did.
    pub sources: Vec<SourceOutcome>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_status_tag() {
        let completed = RunOutcome::Completed(SyncSummary {
            received: 3,
            written: 2,
            ..SyncSummary::default()
        });
        let value = serde_json::to_value(&completed).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["written"], 2);

        let failed = serde_json::to_value(RunOutcome::Failed {
            reason: "db down".into(),
        })
        .unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["reason"], "db down");

        assert_eq!(
            serde_json::to_value(RunOutcome::TimedOut).unwrap()["status"],
            "timed_out"
        );
    }

    #[test]
    fn outcome_display_reads_as_summary() {
        let outcome = RunOutcome::Completed(SyncSummary {
            received: 10,
            written: 4,
            deleted: 1,
            ..SyncSummary::default()
        });
        assert_eq!(outcome.to_string(), "synced 10 events, 4 writes, 1 deletes");
    }
}
