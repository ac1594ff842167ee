use std::{fmt, sync::Arc};

use sentinel_core::database::HazardEventRepository;
use sentinel_core::sync::SchedulerHandle;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn HazardEventRepository>,
    pub scheduler: SchedulerHandle,
}

impl AppState {
    pub fn new(repository: Arc<dyn HazardEventRepository>, scheduler: SchedulerHandle) -> Self {
        Self {
            repository,
            scheduler,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
