//! Per-provider schema normalizers.
//!
//! Every provider gets a `parse` function from its raw body to a
//! [`NormalizedBatch`]. Parsing the envelope can fail (the whole payload is
//! then discarded); individual records never fail, they are dropped and
//! counted when they lack a usable identifier or coordinate pair.

pub mod copernicus;
pub mod emsc;
pub mod eonet;
pub mod gdacs;
pub mod reliefweb;
pub mod usgs;

mod fields;

use chrono::{DateTime, Utc};
use sentinel_model::HazardEvent;
use thiserror::Error;
use tracing::{debug, warn};

use crate::feeds::{FeedSource, RawResult};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML payload: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// Records recovered from one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub events: Vec<HazardEvent>,
    /// Records present in the payload but unusable (no id or coordinates).
    pub dropped: usize,
    /// Item count a diagnostic source reported about itself.
    pub reported_total: Option<u64>,
}

impl NormalizedBatch {
    fn accept(&mut self, event: Option<HazardEvent>) {
        match event {
            Some(event) => self.events.push(event),
            None => self.dropped += 1,
        }
    }
}

/// Parses `body` with the normalizer belonging to `source`.
pub fn parse_payload(
    source: FeedSource,
    body: &str,
    ingested_at: DateTime<Utc>,
) -> Result<NormalizedBatch, NormalizeError> {
    match source {
        FeedSource::Gdacs => gdacs::parse(body, ingested_at),
        FeedSource::Usgs => usgs::parse(body, ingested_at),
        FeedSource::Eonet => eonet::parse(body, ingested_at),
        FeedSource::Copernicus => copernicus::parse(body, ingested_at),
        FeedSource::ReliefWeb => reliefweb::parse(body),
        FeedSource::Emsc => emsc::parse(body, ingested_at),
    }
}

/// [`parse_payload`] with failures logged here rather than propagated.
pub fn normalize_payload(
    source: FeedSource,
    body: &str,
    ingested_at: DateTime<Utc>,
) -> Result<NormalizedBatch, NormalizeError> {
    let result = parse_payload(source, body, ingested_at);
    match &result {
        Ok(batch) => debug!(
            source = %source,
            records = batch.events.len(),
            dropped = batch.dropped,
            "feed normalized"
        ),
        Err(err) => warn!(source = %source, error = %err, "feed payload could not be parsed"),
    }
    result
}

/// Total normalizer: any input, including a failed fetch, yields a list.
pub fn normalize(
    source: FeedSource,
    raw: &RawResult,
    ingested_at: DateTime<Utc>,
) -> Vec<HazardEvent> {
    match raw {
        RawResult::Payload(body) => normalize_payload(source, body, ingested_at)
            .map(|batch| batch.events)
            .unwrap_or_default(),
        RawResult::Error(_) => Vec::new(),
    }
}
