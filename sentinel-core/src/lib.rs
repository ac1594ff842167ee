//! # Sentinel Core
//!
//! Ingestion engine behind the Sentinel hazard map: pulls several independent
//! disaster feeds, normalizes them into one [`HazardEvent`] shape, and keeps a
//! persisted "active hazards" collection in step with what the feeds report.
//!
//! ## Overview
//!
//! - **Feeds**: one [`feeds::FeedSource`] per upstream provider, fetched over
//!   an injected [`feeds::FeedTransport`]; failures come back as values
//! - **Normalizers**: per-provider pure functions, total over any payload
//! - **Aggregation**: concurrent fan-out that waits for every source
//! - **Reconciliation**: shallow diff against stored state, committed as one
//!   atomic batch
//! - **Sync runtime**: pipeline coordinator with a run deadline and an
//!   interval scheduler
//!
//! ## Feature Flags
//!
//! - `database`: PostgreSQL repository adapter (SQLx)
//! - `postgres-tests`: enables the `#[sqlx::test]` suites
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use sentinel_core::{
//!     database::InMemoryHazardEventRepository,
//!     feeds::{HttpTransport, SourceConfig},
//!     sync::{SyncPipeline, SyncSettings},
//! };
//!
//! async fn one_run() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SyncSettings::default();
//!     let transport = Arc::new(HttpTransport::new(&settings.user_agent)?);
//!     let repository = Arc::new(InMemoryHazardEventRepository::new());
//!     let pipeline = SyncPipeline::new(
//!         transport,
//!         repository,
//!         SourceConfig::defaults(),
//!         settings,
//!     );
//!
//!     let report = pipeline.run_once().await;
//!     println!("{}", report.outcome);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Diff of fresh feed output against persisted state
pub mod reconcile;

/// Concurrent fan-out over all configured feeds
pub mod aggregate;

/// Persistence ports and adapters for the active hazard collection
pub mod database;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Error types and error handling utilities
pub mod error;

/// Upstream provider catalogue, transport, and fetch contract
pub mod feeds;

/// Per-provider schema normalizers
pub mod normalize;

/// Pipeline coordinator and interval scheduler
pub mod sync;

pub use error::{CoreError, Result};
pub use sentinel_model::{Coordinates, HazardEvent, HazardId};
