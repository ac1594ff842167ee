use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::config::SyncSettings;
use super::report::{RunOutcome, RunReport};
use crate::aggregate::{Aggregator, SourceOutcome};
use crate::database::HazardEventRepository;
use crate::error::Result;
use crate::feeds::{FeedTransport, SourceConfig};
use crate::reconcile::{PreparedSync, Reconciler, SyncSummary};

/// Where the current run is. Every run ends back at `Idle`, whatever happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Fetching,
    Normalizing,
    Reconciling,
}

/// One sync run end to end: fetch all, normalize, reconcile.
///
/// Holds no state between runs other than the phase indicator.
pub struct SyncPipeline {
    aggregator: Aggregator,
    reconciler: Reconciler,
    settings: SyncSettings,
    phase: watch::Sender<RunPhase>,
}

impl fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("settings", &self.settings)
            .field("phase", &*self.phase.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncPipeline {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        repository: Arc<dyn HazardEventRepository>,
        sources: Vec<SourceConfig>,
        settings: SyncSettings,
    ) -> Self {
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            aggregator: Aggregator::new(transport, sources),
            reconciler: Reconciler::new(repository),
            settings,
            phase,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn sources(&self) -> &[SourceConfig] {
        self.aggregator.sources()
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Runs once under the run timeout. Never returns an error: failures,
    /// panics and timeouts are logged and reported in [`RunReport::outcome`].
    pub async fn run_once(&self) -> RunReport {
        let run_id = Uuid::now_v7();
        let span = info_span!("sync_run", run_id = %run_id);
        self.run_traced(run_id).instrument(span).await
    }

    async fn run_traced(&self, run_id: Uuid) -> RunReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_deadline = start + self.settings.run_timeout;
        let fetch_deadline = start + self.settings.effective_fetch_deadline();
        info!("sync run started");

        let mut sources = Vec::new();
        let prepare = AssertUnwindSafe(self.prepare(fetch_deadline, &mut sources)).catch_unwind();
        let outcome = match timeout_at(run_deadline, prepare).await {
            // The run deadline stops here; a started commit is allowed to land.
            Ok(Ok(Ok(prepared))) => {
                let commit = AssertUnwindSafe(self.reconciler.commit(prepared))
                    .catch_unwind()
                    .await;
                outcome_of(commit)
            }
            Ok(Ok(Err(err))) => outcome_of(Ok(Err(err))),
            Ok(Err(panic)) => outcome_of(Err(panic)),
            Err(_) => {
                warn!(
                    timeout_secs = self.settings.run_timeout.as_secs(),
                    "sync run abandoned at timeout before commit"
                );
                RunOutcome::TimedOut
            }
        };
        self.phase.send_replace(RunPhase::Idle);

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            sources,
            outcome,
        };
        info!(
            duration_ms = report.duration().num_milliseconds(),
            outcome = %report.outcome,
            "sync run finished"
        );
        report
    }

    async fn prepare(
        &self,
        fetch_deadline: Instant,
        sources: &mut Vec<SourceOutcome>,
    ) -> Result<PreparedSync> {
        self.phase.send_replace(RunPhase::Fetching);
        let fetched = self.aggregator.fetch_all(fetch_deadline).await;

        self.phase.send_replace(RunPhase::Normalizing);
        let aggregate = self.aggregator.normalize_all(fetched);
        *sources = aggregate.outcomes;

        self.phase.send_replace(RunPhase::Reconciling);
        self.reconciler.prepare(&aggregate.events).await
    }
}

fn outcome_of(result: std::thread::Result<Result<SyncSummary>>) -> RunOutcome {
    match result {
        Ok(Ok(summary)) => RunOutcome::Completed(summary),
        Ok(Err(err)) => {
            error!(error = %err, "sync run failed; nothing committed");
            RunOutcome::Failed {
                reason: err.to_string(),
            }
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(reason = %reason, "sync run panicked; nothing committed");
            RunOutcome::Failed {
                reason: format!("panicked: {reason}"),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
