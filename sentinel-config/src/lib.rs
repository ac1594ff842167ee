//! Configuration library for Sentinel.
//!
//! Settings come from three layers, highest precedence first: process
//! environment (after `.env` is applied), an optional TOML file, and built-in
//! defaults. [`ConfigLoader::load`] composes them, applies guard rails, and
//! hands back the resolved [`Config`] together with non-fatal warnings.

#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{Config, ConfigMetadata, ServerConfig, StoreBackend, StoreConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
