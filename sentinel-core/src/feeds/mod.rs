//! Upstream provider catalogue and the fetch contract.
//!
//! A fetch never fails past this boundary: whatever goes wrong on the wire is
//! folded into [`RawResult::Error`] so one broken provider cannot abort a run.

pub mod transport;

pub use transport::{FeedTransport, HttpTransport};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One upstream hazard provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Global Disaster Alert and Coordination System.
    Gdacs,
    /// USGS worldwide earthquakes, GeoJSON.
    Usgs,
    /// NASA EONET open natural events.
    Eonet,
    /// Copernicus EMS rapid-mapping activations, RSS with GeoRSS points.
    Copernicus,
    /// ReliefWeb ongoing disasters. Monitoring only.
    ReliefWeb,
    /// EMSC / seismic portal earthquakes.
    Emsc,
}

impl FeedSource {
    pub const ALL: [FeedSource; 6] = [
        FeedSource::Gdacs,
        FeedSource::Usgs,
        FeedSource::Eonet,
        FeedSource::Copernicus,
        FeedSource::ReliefWeb,
        FeedSource::Emsc,
    ];

    /// Provider label written into `HazardEvent::source`.
    pub fn provider_name(self) -> &'static str {
        match self {
            FeedSource::Gdacs => "GDACS",
            FeedSource::Usgs => "USGS",
            FeedSource::Eonet => "NASA",
            FeedSource::Copernicus => "Copernicus EU",
            FeedSource::ReliefWeb => "ReliefWeb",
            FeedSource::Emsc => "EMSC",
        }
    }

    /// Configuration key (`[sources.<key>]`).
    pub fn key(self) -> &'static str {
        match self {
            FeedSource::Gdacs => "gdacs",
            FeedSource::Usgs => "usgs",
            FeedSource::Eonet => "eonet",
            FeedSource::Copernicus => "copernicus",
            FeedSource::ReliefWeb => "reliefweb",
            FeedSource::Emsc => "emsc",
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            FeedSource::Gdacs => {
                "https://www.gdacs.org/gdacsapi/api/events/geteventlist/SEARCH"
            }
            FeedSource::Usgs => {
                "https://earthquake.usgs.gov/fdsnws/event/1/query?format=geojson&minmagnitude=4.0&orderby=time"
            }
            FeedSource::Eonet => {
                "https://eonet.gsfc.nasa.gov/api/v3/events?status=open&days=365"
            }
            FeedSource::Copernicus => {
                "https://emergency.copernicus.eu/mapping/list-of-activations-rss"
            }
            FeedSource::ReliefWeb => {
                "https://api.reliefweb.int/v1/disasters?appname=sentinel-map-v1&profile=list&preset=latest&limit=1000&status=ongoing"
            }
            FeedSource::Emsc => {
                "https://www.seismicportal.eu/fdsnws/event/1/query?format=json&limit=1000&minmagnitude=4.0&orderby=time"
            }
        }
    }

    /// The Copernicus endpoint serves a certificate that does not verify.
    pub fn default_relaxed_tls(self) -> bool {
        matches!(self, FeedSource::Copernicus)
    }

    /// Diagnostic sources are fetched and counted but never produce events.
    pub fn is_diagnostic(self) -> bool {
        matches!(self, FeedSource::ReliefWeb)
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown feed source '{0}'")]
pub struct UnknownFeedSource(pub String);

impl FromStr for FeedSource {
    type Err = UnknownFeedSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        FeedSource::ALL
            .into_iter()
            .find(|source| source.key() == normalized)
            .ok_or_else(|| UnknownFeedSource(s.to_string()))
    }
}

/// Per-source transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: FeedSource,
    pub url: String,
    /// Skip certificate verification for this source only.
    pub relaxed_tls: bool,
    pub enabled: bool,
}

impl SourceConfig {
    pub fn default_for(source: FeedSource) -> Self {
        Self {
            source,
            url: source.default_url().to_string(),
            relaxed_tls: source.default_relaxed_tls(),
            enabled: true,
        }
    }

    /// All six providers with their stock endpoints.
    pub fn defaults() -> Vec<Self> {
        FeedSource::ALL.into_iter().map(Self::default_for).collect()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    Status { status: u16 },

    #[error("still pending when the run deadline passed")]
    Timeout,

    #[error("source disabled by configuration")]
    Disabled,
}

/// Outcome of one fetch: the body, or why there is none.
#[derive(Debug)]
pub enum RawResult {
    Payload(String),
    Error(FetchError),
}

/// Issues the GET for `config` and captures any failure. Disabled sources
/// short-circuit without touching the network.
pub async fn fetch(transport: &dyn FeedTransport, config: &SourceConfig) -> RawResult {
    if !config.enabled {
        return RawResult::Error(FetchError::Disabled);
    }

    match transport.get(config).await {
        Ok(body) => {
            debug!(source = %config.source, bytes = body.len(), "feed fetched");
            RawResult::Payload(body)
        }
        Err(err) => {
            warn!(source = %config.source, error = %err, "feed fetch failed");
            RawResult::Error(err)
        }
    }
}

/// [`fetch`] bounded by the run deadline; a fetch still pending at `deadline`
/// counts as failed for this run.
pub async fn fetch_until(
    transport: &dyn FeedTransport,
    config: &SourceConfig,
    deadline: Instant,
) -> RawResult {
    match tokio::time::timeout_at(deadline, fetch(transport, config)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(source = %config.source, "feed fetch abandoned at run deadline");
            RawResult::Error(FetchError::Timeout)
        }
    }
}
