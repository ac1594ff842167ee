use std::time::Duration;

use crate::feeds::HttpTransport;

/// Runtime knobs of the sync job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Time between scheduled runs.
    pub interval: Duration,
    /// Bound on a run up to its commit. A commit already under way is not
    /// cut off.
    pub run_timeout: Duration,
    /// Fetches still pending this long after the run started count as failed.
    /// Clamped to `run_timeout`.
    pub fetch_deadline: Duration,
    pub user_agent: String,
    /// Fire the first run immediately instead of one interval after start.
    pub run_on_startup: bool,
}

impl SyncSettings {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10 * 60);
    pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_FETCH_DEADLINE: Duration = Duration::from_secs(45);

    pub fn effective_fetch_deadline(&self) -> Duration {
        self.fetch_deadline.min(self.run_timeout)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            run_timeout: Self::DEFAULT_RUN_TIMEOUT,
            fetch_deadline: Self::DEFAULT_FETCH_DEADLINE,
            user_agent: HttpTransport::DEFAULT_USER_AGENT.to_string(),
            run_on_startup: true,
        }
    }
}
