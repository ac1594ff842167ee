use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::HazardEvent;
use crate::feeds::{self, FeedSource, FeedTransport, FetchError, RawResult, SourceConfig};
use crate::normalize;

/// What one source contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok { records: usize, dropped: usize },
    TransportFailed { reason: String },
    ParseFailed { reason: String },
    /// Monitoring-only source; `total` is the count it reported.
    Diagnostic { total: u64 },
    Disabled,
}

impl SourceStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SourceStatus::TransportFailed { .. } | SourceStatus::ParseFailed { .. }
        )
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Ok { records, dropped } => {
                write!(f, "ok ({records} records, {dropped} dropped)")
            }
            SourceStatus::TransportFailed { reason } => write!(f, "fetch failed: {reason}"),
            SourceStatus::ParseFailed { reason } => write!(f, "parse failed: {reason}"),
            SourceStatus::Diagnostic { total } => write!(f, "diagnostic ({total} listed)"),
            SourceStatus::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: FeedSource,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Combined output of every configured source.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// Concatenation of all sources' records; no cross-source ordering.
    pub events: Vec<HazardEvent>,
    pub outcomes: Vec<SourceOutcome>,
}

impl AggregateReport {
    pub fn failed_sources(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_failure())
            .count()
    }
}

/// Fans out over the configured sources and waits for all of them.
#[derive(Clone)]
pub struct Aggregator {
    transport: Arc<dyn FeedTransport>,
    sources: Vec<SourceConfig>,
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(transport: Arc<dyn FeedTransport>, sources: Vec<SourceConfig>) -> Self {
        Self { transport, sources }
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Fetches every source concurrently, each bounded by `deadline`, then
    /// normalizes. Never fails: a source that breaks contributes nothing.
    pub async fn run(&self, deadline: Instant) -> AggregateReport {
        let fetched = self.fetch_all(deadline).await;
        self.normalize_all(fetched)
    }

    /// Waits for every fetch to settle; output is in configuration order.
    pub async fn fetch_all(&self, deadline: Instant) -> Vec<(FeedSource, RawResult)> {
        let fetches = self.sources.iter().map(|config| {
            let transport = Arc::clone(&self.transport);
            async move {
                let raw = feeds::fetch_until(transport.as_ref(), config, deadline).await;
                (config.source, raw)
            }
        });
        join_all(fetches).await
    }

    pub fn normalize_all(&self, fetched: Vec<(FeedSource, RawResult)>) -> AggregateReport {
        let ingested_at = Utc::now();
        let mut report = AggregateReport::default();
        for (source, raw) in fetched {
            let status = match raw {
                RawResult::Error(FetchError::Disabled) => SourceStatus::Disabled,
                RawResult::Error(err) => SourceStatus::TransportFailed {
                    reason: err.to_string(),
                },
                RawResult::Payload(body) => {
                    match normalize::normalize_payload(source, &body, ingested_at) {
                        Ok(batch) if source.is_diagnostic() => SourceStatus::Diagnostic {
                            total: batch.reported_total.unwrap_or(0),
                        },
                        Ok(batch) => {
                            let status = SourceStatus::Ok {
                                records: batch.events.len(),
                                dropped: batch.dropped,
                            };
                            report.events.extend(batch.events);
                            status
                        }
                        Err(err) => SourceStatus::ParseFailed {
                            reason: err.to_string(),
                        },
                    }
                }
            };
            report.outcomes.push(SourceOutcome { source, status });
        }

        let failed = report.failed_sources();
        if failed > 0 && failed == self.enabled_count() {
            warn!(failed, "every enabled source failed this run");
        }
        info!(
            records = report.events.len(),
            sources = report.outcomes.len(),
            failed,
            "feeds aggregated"
        );
        report
    }

    fn enabled_count(&self) -> usize {
        self.sources.iter().filter(|config| config.enabled).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct CannedTransport;

    #[async_trait]
    impl FeedTransport for CannedTransport {
        async fn get(&self, config: &SourceConfig) -> Result<String, FetchError> {
            match config.source {
                FeedSource::Usgs => Ok(r#"{"features":[{"id":"u1","properties":{"mag":4.2},"geometry":{"coordinates":[1.0,2.0]}}]}"#.to_string()),
                FeedSource::ReliefWeb => Ok(r#"{"totalCount":7}"#.to_string()),
                FeedSource::Eonet => Ok("not json".to_string()),
                _ => Err(FetchError::Status { status: 500 }),
            }
        }
    }

    #[tokio::test]
    async fn statuses_reflect_each_source() {
        let mut sources = SourceConfig::defaults();
        for config in &mut sources {
            if config.source == FeedSource::Emsc {
                config.enabled = false;
            }
        }
        let aggregator = Aggregator::new(Arc::new(CannedTransport), sources);

        let report = aggregator
            .run(Instant::now() + Duration::from_secs(5))
            .await;

        assert_eq!(report.events.len(), 1);
        let status_of = |source: FeedSource| {
            report
                .outcomes
                .iter()
                .find(|outcome| outcome.source == source)
                .map(|outcome| outcome.status.clone())
                .unwrap()
        };
        assert_eq!(status_of(FeedSource::Usgs), SourceStatus::Ok { records: 1, dropped: 0 });
        assert_eq!(status_of(FeedSource::ReliefWeb), SourceStatus::Diagnostic { total: 7 });
        assert!(matches!(status_of(FeedSource::Eonet), SourceStatus::ParseFailed { .. }));
        assert!(matches!(status_of(FeedSource::Gdacs), SourceStatus::TransportFailed { .. }));
        assert_eq!(status_of(FeedSource::Emsc), SourceStatus::Disabled);
        assert_eq!(report.failed_sources(), 3);
    }
}
