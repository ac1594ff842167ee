use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pipeline::SyncPipeline;
use super::report::RunReport;

/// How long shutdown waits for an in-flight run before abandoning it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Cloneable remote for a running [`SyncScheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    pipeline: Arc<SyncPipeline>,
    trigger: Arc<Notify>,
    last_report: Arc<RwLock<Option<RunReport>>>,
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle").finish_non_exhaustive()
    }
}

impl SchedulerHandle {
    /// Asks for a run now. Coalesces with other pending requests, and is
    /// ignored if a run is still in flight when it is picked up.
    pub fn request_run(&self) {
        self.trigger.notify_one();
    }

    pub async fn last_report(&self) -> Option<RunReport> {
        self.last_report.read().await.clone()
    }

    pub fn pipeline(&self) -> &SyncPipeline {
        &self.pipeline
    }
}

/// Fires the pipeline every `interval`, never overlapping two runs.
pub struct SyncScheduler {
    pipeline: Arc<SyncPipeline>,
    trigger: Arc<Notify>,
    last_report: Arc<RwLock<Option<RunReport>>>,
}

impl fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl SyncScheduler {
    pub fn new(pipeline: Arc<SyncPipeline>) -> Self {
        Self {
            pipeline,
            trigger: Arc::new(Notify::new()),
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            pipeline: Arc::clone(&self.pipeline),
            trigger: Arc::clone(&self.trigger),
            last_report: Arc::clone(&self.last_report),
        }
    }

    /// Spawns the scheduling loop. It exits once `shutdown` is cancelled and
    /// the in-flight run (if any) finished or the grace period ran out.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let settings = self.pipeline.settings();
        info!(
            interval_secs = settings.interval.as_secs(),
            run_timeout_secs = settings.run_timeout.as_secs(),
            "sync scheduler started"
        );

        let mut ticker = interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if !settings.run_on_startup {
            // The first tick completes immediately.
            ticker.tick().await;
        }

        let mut current: Option<JoinHandle<()>> = None;
        loop {
            let trigger = tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => "interval",
                _ = self.trigger.notified() => "manual",
            };

            if let Some(handle) = &current
                && !handle.is_finished()
            {
                warn!(trigger, "previous sync run still in flight, skipping");
                continue;
            }

            debug!(trigger, "starting sync run");
            current = Some(self.spawn_run());
        }

        info!("sync scheduler stopping");
        if let Some(handle) = current
            && !handle.is_finished()
        {
            info!("waiting for in-flight sync run");
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("in-flight sync run abandoned at shutdown");
            }
        }
    }

    /// The run itself executes in a nested task so a panic surfaces here as
    /// a `JoinError` instead of taking the scheduler down.
    fn spawn_run(&self) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let last_report = Arc::clone(&self.last_report);
        tokio::spawn(async move {
            let run = tokio::spawn(async move { pipeline.run_once().await });
            match run.await {
                Ok(report) => {
                    *last_report.write().await = Some(report);
                }
                Err(err) => error!(error = %err, "sync run task aborted"),
            }
        })
    }
}
