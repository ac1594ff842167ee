use std::time::Duration;

use thiserror::Error;

use crate::models::{Config, StoreBackend};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("no event-producing feed is enabled")]
    NoEventSources,
    #[error("sync {field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error(
        "fetch deadline ({fetch_deadline:?}) must not exceed the run timeout ({run_timeout:?})"
    )]
    FetchDeadlineExceedsTimeout {
        fetch_deadline: Duration,
        run_timeout: Duration,
    },
    #[error("store backend 'postgres' requires DATABASE_URL or store.database_url")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if !config
        .enabled_sources()
        .any(|source| !source.source.is_diagnostic())
    {
        return Err(ConfigGuardRailError::NoEventSources);
    }

    let sync = &config.sync;
    if sync.interval.is_zero() {
        return Err(ConfigGuardRailError::ZeroDuration { field: "interval" });
    }
    if sync.run_timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroDuration {
            field: "run_timeout",
        });
    }
    if sync.fetch_deadline > sync.run_timeout {
        return Err(ConfigGuardRailError::FetchDeadlineExceedsTimeout {
            fetch_deadline: sync.fetch_deadline,
            run_timeout: sync.run_timeout,
        });
    }

    if config.store.backend == StoreBackend::Postgres && config.store.database_url.is_none() {
        return Err(ConfigGuardRailError::MissingDatabaseUrl);
    }
    if config.store.backend == StoreBackend::Memory {
        warnings.push_with_hint(
            "Using the in-memory store; active hazards are lost on restart",
            "Set DATABASE_URL or store.backend = \"postgres\" to persist them",
        );
    }

    for source in config.enabled_sources().filter(|source| source.relaxed_tls) {
        warnings.push(format!(
            "TLS certificate verification is disabled for feed '{}'",
            source.source
        ));
    }

    if sync.interval < sync.run_timeout {
        warnings.push_with_hint(
            "Sync interval is shorter than the run timeout; slow runs will cause skipped ticks",
            "Raise SYNC_INTERVAL or lower SYNC_RUN_TIMEOUT",
        );
    }

    Ok(warnings)
}
