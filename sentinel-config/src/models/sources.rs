use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::StoreBackend;
use crate::util::{non_empty, parse_bool, parse_csv};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub store: FileStoreConfig,
    #[serde(default)]
    pub sync: FileSyncConfig,
    /// Per-feed overrides keyed by feed key (`gdacs`, `usgs`, ...).
    #[serde(default)]
    pub sources: BTreeMap<String, FileSourceConfig>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<StoreBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

/// Durations are humantime strings such as `"10m"` or `"45s"`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSyncConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_on_startup: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relaxed_tls: Option<bool>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub database_url: Option<String>,
    pub store_backend: Option<String>,
    pub sync_interval: Option<String>,
    pub sync_run_timeout: Option<String>,
    pub sync_fetch_deadline: Option<String>,
    pub sync_user_agent: Option<String>,
    pub sync_on_startup: Option<String>,
    pub disabled_sources: Option<Vec<String>>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds from an arbitrary variable lookup instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| non_empty(lookup(name));

        Self {
            config_path: var("SENTINEL_CONFIG").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: var("SERVER_PORT"),
            database_url: var("DATABASE_URL"),
            store_backend: var("SENTINEL_STORE"),
            sync_interval: var("SYNC_INTERVAL"),
            sync_run_timeout: var("SYNC_RUN_TIMEOUT"),
            sync_fetch_deadline: var("SYNC_FETCH_DEADLINE"),
            sync_user_agent: var("SYNC_USER_AGENT"),
            sync_on_startup: var("SYNC_ON_STARTUP"),
            disabled_sources: var("SENTINEL_DISABLED_SOURCES").map(|raw| parse_csv(&raw)),
        }
    }

    pub fn run_on_startup(&self) -> Option<Option<bool>> {
        self.sync_on_startup.as_deref().map(parse_bool)
    }
}
