pub mod config;
pub mod pipeline;
pub mod report;
pub mod scheduler;

pub use config::SyncSettings;
pub use pipeline::{RunPhase, SyncPipeline};
pub use report::{RunOutcome, RunReport};
pub use scheduler::{SchedulerHandle, SyncScheduler};
