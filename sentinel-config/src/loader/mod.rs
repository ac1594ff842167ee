pub mod error;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sentinel_core::feeds::{FeedSource, SourceConfig};
use sentinel_core::sync::SyncSettings;
use url::Url;

use self::error::ConfigLoadError;
use crate::models::sources::{EnvConfig, FileConfig, FileSourceConfig};
use crate::models::{Config, ConfigMetadata, ServerConfig, StoreBackend, StoreConfig};
use crate::validation::{self, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["sentinel.toml", "config/sentinel.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Use these variables instead of reading `.env` and the process
    /// environment.
    pub env: Option<EnvConfig>,
}

/// Resolved configuration plus non-fatal findings.
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.options.env = Some(env);
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (env_config, env_file_loaded) = match &self.options.env {
            Some(env) => (env.clone(), false),
            None => {
                let loaded = self.load_env_file()?;
                (EnvConfig::gather(), loaded)
            }
        };

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let (config, warnings) =
            compose_config(file_config, env_config, config_path, env_file_loaded)?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let result = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        match result {
            Ok(()) => Ok(true),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env_config.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_default() {
                return Ok((None, None));
            }
            return Err(ConfigLoadError::MissingConfig { path });
        }

        let contents = fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
            path: path.clone(),
            source: err,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No sentinel.toml detected; using environment variables and defaults",
            "Pass --config or set SENTINEL_CONFIG to point at a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        store: file_store,
        sync: file_sync,
        sources: file_sources,
    } = file_config.unwrap_or_default();

    let port = match env.server_port.as_deref() {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigLoadError::InvalidValue {
                key: "SERVER_PORT",
                value: raw.to_string(),
            })?,
        None => file_server.port.unwrap_or(ServerConfig::DEFAULT_PORT),
    };
    let server = ServerConfig {
        host: env
            .server_host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| ServerConfig::DEFAULT_HOST.to_string()),
        port,
    };

    let database_url = env
        .database_url
        .clone()
        .or(file_store.database_url)
        .filter(|value| !value.trim().is_empty());
    if let Some(url) = &database_url {
        Url::parse(url.trim()).map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    }
    let backend = match env.store_backend.as_deref() {
        Some(raw) => raw
            .parse::<StoreBackend>()
            .map_err(|value| ConfigLoadError::InvalidValue {
                key: "SENTINEL_STORE",
                value,
            })?,
        None => file_store.backend.unwrap_or(if database_url.is_some() {
            StoreBackend::Postgres
        } else {
            StoreBackend::Memory
        }),
    };
    let store = StoreConfig {
        backend,
        database_url,
        max_connections: file_store
            .max_connections
            .unwrap_or(StoreConfig::DEFAULT_MAX_CONNECTIONS),
    };

    let sync = SyncSettings {
        interval: resolve_duration(
            "SYNC_INTERVAL",
            env.sync_interval.as_deref(),
            file_sync.interval.as_deref(),
            SyncSettings::DEFAULT_INTERVAL,
        )?,
        run_timeout: resolve_duration(
            "SYNC_RUN_TIMEOUT",
            env.sync_run_timeout.as_deref(),
            file_sync.run_timeout.as_deref(),
            SyncSettings::DEFAULT_RUN_TIMEOUT,
        )?,
        fetch_deadline: resolve_duration(
            "SYNC_FETCH_DEADLINE",
            env.sync_fetch_deadline.as_deref(),
            file_sync.fetch_deadline.as_deref(),
            SyncSettings::DEFAULT_FETCH_DEADLINE,
        )?,
        user_agent: env
            .sync_user_agent
            .clone()
            .or(file_sync.user_agent)
            .unwrap_or_else(|| SyncSettings::default().user_agent),
        run_on_startup: match env.run_on_startup() {
            Some(Some(flag)) => flag,
            Some(None) => {
                return Err(ConfigLoadError::InvalidValue {
                    key: "SYNC_ON_STARTUP",
                    value: env.sync_on_startup.clone().unwrap_or_default(),
                });
            }
            None => file_sync.run_on_startup.unwrap_or(true),
        },
    };

    let mut sources = SourceConfig::defaults();
    for (key, overrides) in file_sources {
        let feed = parse_source_key(&key)?;
        if let Some(config) = sources.iter_mut().find(|config| config.source == feed) {
            apply_source_overrides(config, &key, overrides)?;
        }
    }
    for key in env.disabled_sources.iter().flatten() {
        let feed = parse_source_key(key)?;
        if let Some(config) = sources.iter_mut().find(|config| config.source == feed) {
            config.enabled = false;
        }
    }

    let config = Config {
        server,
        store,
        sync,
        sources,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn resolve_duration(
    key: &'static str,
    env_value: Option<&str>,
    file_value: Option<&str>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match env_value.or(file_value) {
        Some(raw) => {
            humantime::parse_duration(raw.trim()).map_err(|source| {
                ConfigLoadError::InvalidDuration {
                    key,
                    value: raw.to_string(),
                    source,
                }
            })
        }
        None => Ok(default),
    }
}

fn parse_source_key(key: &str) -> Result<FeedSource, ConfigLoadError> {
    key.parse::<FeedSource>()
        .map_err(|_| ConfigLoadError::UnknownSource {
            key: key.to_string(),
        })
}

fn apply_source_overrides(
    config: &mut SourceConfig,
    key: &str,
    overrides: FileSourceConfig,
) -> Result<(), ConfigLoadError> {
    if let Some(enabled) = overrides.enabled {
        config.enabled = enabled;
    }
    if let Some(relaxed) = overrides.relaxed_tls {
        config.relaxed_tls = relaxed;
    }
    if let Some(url) = overrides.url {
        let parsed = Url::parse(url.trim()).map_err(|source| ConfigLoadError::InvalidSourceUrl {
            key: key.to_string(),
            source,
        })?;
        config.url = parsed.to_string();
    }
    Ok(())
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        self.default
            .as_deref()
            .map(Path::to_path_buf)
            .map(|path| (path, ConfigPathProvenance::Default))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_default(self) -> bool {
        matches!(self, ConfigPathProvenance::Default)
    }
}
