mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sentinel_core::aggregate::SourceStatus;
use sentinel_core::database::{
    HazardEventRepository, InMemoryHazardEventRepository, WriteBatch,
};
use sentinel_core::feeds::{FeedSource, FeedTransport, FetchError, HttpTransport, SourceConfig};
use sentinel_core::sync::{RunOutcome, RunPhase, SyncPipeline, SyncSettings};
use sentinel_core::{HazardEvent, HazardId};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed_body(source: FeedSource) -> String {
    match source {
        FeedSource::Gdacs => support::gdacs_body(),
        FeedSource::Usgs => support::usgs_body(),
        FeedSource::Eonet => support::eonet_body(),
        FeedSource::Copernicus => support::copernicus_body(),
        FeedSource::ReliefWeb => support::reliefweb_body(),
        FeedSource::Emsc => support::emsc_body(),
    }
}

/// Serves every feed from its own path; `failing` sources answer 500.
async fn mock_feeds(failing: &[FeedSource]) -> (MockServer, Vec<SourceConfig>) {
    let server = MockServer::start().await;
    let mut sources = Vec::new();
    for source in FeedSource::ALL {
        let route = format!("/{}", source.key());
        let response = if failing.contains(&source) {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_string(feed_body(source))
        };
        Mock::given(method("GET"))
            .and(path(route.clone()))
            .respond_with(response)
            .mount(&server)
            .await;
        sources.push(SourceConfig::default_for(source).with_url(format!("{}{route}", server.uri())));
    }
    (server, sources)
}

fn pipeline_with(
    sources: Vec<SourceConfig>,
    repository: Arc<dyn HazardEventRepository>,
    settings: SyncSettings,
) -> Result<SyncPipeline> {
    let transport = Arc::new(HttpTransport::new(&settings.user_agent)?);
    Ok(SyncPipeline::new(transport, repository, sources, settings))
}

#[tokio::test]
async fn healthy_feeds_are_persisted_in_canonical_shape() -> Result<()> {
    let (_server, sources) = mock_feeds(&[]).await;
    let repo = Arc::new(InMemoryHazardEventRepository::new());
    let pipeline = pipeline_with(sources, repo.clone(), SyncSettings::default())?;

    let report = pipeline.run_once().await;
    let summary = report.outcome.summary().expect("run completed");
    assert_eq!(summary.written, 6);
    assert_eq!(pipeline.phase(), RunPhase::Idle);

    let quake = repo.get(&HazardId::new("123")?).await?.expect("usgs record");
    assert_eq!(quake.hazard_type, "Earthquake");
    assert_eq!((quake.lat, quake.lng), (45.0, 10.0));
    assert_eq!(quake.severity, "High");
    assert_eq!(quake.source, "USGS");
    assert_eq!(quake.timestamp, "2024-05-01T10:00:00.000Z");

    let flood = repo
        .get(&HazardId::new("copernicus_floodalert")?)
        .await?
        .expect("copernicus record");
    assert_eq!((flood.lat, flood.lng), (42.0, 13.0));
    assert_eq!(flood.hazard_type, "Emergency");
    assert_eq!(flood.severity, "High");

    let relief = report
        .sources
        .iter()
        .find(|outcome| outcome.source == FeedSource::ReliefWeb)
        .expect("reliefweb outcome");
    assert_eq!(relief.status, SourceStatus::Diagnostic { total: 31 });
    Ok(())
}

#[tokio::test]
async fn requests_carry_the_configured_user_agent() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usgs"))
        .and(header("user-agent", HttpTransport::DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(support::usgs_body()))
        .expect(1)
        .mount(&server)
        .await;

    let sources =
        vec![SourceConfig::default_for(FeedSource::Usgs).with_url(format!("{}/usgs", server.uri()))];
    let repo = Arc::new(InMemoryHazardEventRepository::new());
    let pipeline = pipeline_with(sources, repo.clone(), SyncSettings::default())?;

    let report = pipeline.run_once().await;
    assert!(report.outcome.is_completed());
    assert_eq!(repo.len().await, 2);
    Ok(())
}

#[tokio::test]
async fn one_failing_feed_does_not_block_the_rest() -> Result<()> {
    let (_server, sources) = mock_feeds(&[FeedSource::Gdacs]).await;
    let repo = Arc::new(InMemoryHazardEventRepository::new());
    let pipeline = pipeline_with(sources, repo.clone(), SyncSettings::default())?;

    let report = pipeline.run_once().await;
    assert_eq!(report.outcome.summary().map(|s| s.written), Some(5));
    assert!(repo.get(&HazardId::new("1000321")?).await?.is_none());
    assert!(repo.get(&HazardId::new("emsc_20240501_0000123")?).await?.is_some());

    let gdacs = report
        .sources
        .iter()
        .find(|outcome| outcome.source == FeedSource::Gdacs)
        .expect("gdacs outcome");
    assert!(matches!(gdacs.status, SourceStatus::TransportFailed { .. }));
    Ok(())
}

#[tokio::test]
async fn total_outage_writes_and_deletes_nothing() -> Result<()> {
    let (_server, sources) = mock_feeds(&FeedSource::ALL).await;
    let seeded = support::hazard("stale", "High", 1.0);
    let repo = Arc::new(InMemoryHazardEventRepository::with_records([seeded]));
    let pipeline = pipeline_with(sources, repo.clone(), SyncSettings::default())?;

    let report = pipeline.run_once().await;
    let summary = report.outcome.summary().expect("run completed");
    assert!(summary.is_noop());
    assert_eq!(repo.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn slow_feed_is_cut_off_at_fetch_deadline() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usgs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(support::usgs_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/emsc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(support::emsc_body())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let sources = vec![
        SourceConfig::default_for(FeedSource::Usgs).with_url(format!("{}/usgs", server.uri())),
        SourceConfig::default_for(FeedSource::Emsc).with_url(format!("{}/emsc", server.uri())),
    ];
    let settings = SyncSettings {
        fetch_deadline: Duration::from_millis(300),
        run_timeout: Duration::from_secs(3),
        ..SyncSettings::default()
    };
    let repo = Arc::new(InMemoryHazardEventRepository::new());
    let pipeline = pipeline_with(sources, repo.clone(), settings)?;

    let report = pipeline.run_once().await;
    assert_eq!(report.outcome.summary().map(|s| s.written), Some(2));
    let emsc = report
        .sources
        .iter()
        .find(|outcome| outcome.source == FeedSource::Emsc)
        .expect("emsc outcome");
    assert!(matches!(emsc.status, SourceStatus::TransportFailed { .. }));
    Ok(())
}

#[tokio::test]
async fn disabled_sources_are_not_requested() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(support::usgs_body()))
        .expect(0)
        .mount(&server)
        .await;

    let mut usgs = SourceConfig::default_for(FeedSource::Usgs).with_url(server.uri());
    usgs.enabled = false;
    let pipeline = pipeline_with(
        vec![usgs],
        Arc::new(InMemoryHazardEventRepository::new()),
        SyncSettings::default(),
    )?;

    let report = pipeline.run_once().await;
    assert_eq!(report.sources[0].status, SourceStatus::Disabled);
    Ok(())
}

/// Store whose reads never finish.
struct StalledRepository;

#[async_trait]
impl HazardEventRepository for StalledRepository {
    async fn list_all(&self) -> sentinel_core::Result<Vec<HazardEvent>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn get(&self, _id: &HazardId) -> sentinel_core::Result<Option<HazardEvent>> {
        Ok(None)
    }

    async fn upsert(&self, _event: &HazardEvent) -> sentinel_core::Result<()> {
        panic!("stalled store must never be written");
    }

    async fn delete(&self, _id: &HazardId) -> sentinel_core::Result<bool> {
        panic!("stalled store must never be written");
    }

    async fn commit_batch(&self, _batch: &WriteBatch) -> sentinel_core::Result<()> {
        panic!("stalled store must never be written");
    }
}

#[tokio::test]
async fn run_timeout_abandons_without_committing() -> Result<()> {
    let (_server, sources) = mock_feeds(&[]).await;
    let settings = SyncSettings {
        run_timeout: Duration::from_millis(500),
        fetch_deadline: Duration::from_millis(400),
        ..SyncSettings::default()
    };
    let pipeline = pipeline_with(sources, Arc::new(StalledRepository), settings)?;

    let report = pipeline.run_once().await;
    assert_eq!(report.outcome, RunOutcome::TimedOut);
    assert_eq!(pipeline.phase(), RunPhase::Idle);
    Ok(())
}

/// Serves the USGS fixture without touching the network.
struct UsgsFixture;

#[async_trait]
impl FeedTransport for UsgsFixture {
    async fn get(&self, _config: &SourceConfig) -> Result<String, FetchError> {
        Ok(support::usgs_body())
    }
}

/// In-memory store whose commits take longer than a whole run may.
struct SlowCommitRepository {
    inner: InMemoryHazardEventRepository,
    delay: Duration,
}

#[async_trait]
impl HazardEventRepository for SlowCommitRepository {
    async fn list_all(&self) -> sentinel_core::Result<Vec<HazardEvent>> {
        self.inner.list_all().await
    }

    async fn get(&self, id: &HazardId) -> sentinel_core::Result<Option<HazardEvent>> {
        self.inner.get(id).await
    }

    async fn upsert(&self, event: &HazardEvent) -> sentinel_core::Result<()> {
        self.inner.upsert(event).await
    }

    async fn delete(&self, id: &HazardId) -> sentinel_core::Result<bool> {
        self.inner.delete(id).await
    }

    async fn commit_batch(&self, batch: &WriteBatch) -> sentinel_core::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.commit_batch(batch).await
    }
}

#[tokio::test(start_paused = true)]
async fn commit_in_flight_at_run_deadline_is_allowed_to_land() -> Result<()> {
    let repo = Arc::new(SlowCommitRepository {
        inner: InMemoryHazardEventRepository::new(),
        delay: Duration::from_secs(5),
    });
    let settings = SyncSettings {
        run_timeout: Duration::from_millis(500),
        fetch_deadline: Duration::from_millis(400),
        ..SyncSettings::default()
    };
    let pipeline = SyncPipeline::new(
        Arc::new(UsgsFixture),
        repo.clone(),
        vec![SourceConfig::default_for(FeedSource::Usgs)],
        settings,
    );

    let report = pipeline.run_once().await;
    let summary = report.outcome.summary().expect("commit finished past the deadline");
    assert_eq!(summary.written, 2);
    assert!(repo.get(&HazardId::new("123")?).await?.is_some());
    assert_eq!(pipeline.phase(), RunPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn storage_failure_is_reported_not_raised() -> Result<()> {
    let (_server, sources) = mock_feeds(&[]).await;
    let repo = Arc::new(InMemoryHazardEventRepository::new());
    repo.set_fail_commits(true);
    let pipeline = pipeline_with(sources, repo.clone(), SyncSettings::default())?;

    let report = pipeline.run_once().await;
    assert!(matches!(report.outcome, RunOutcome::Failed { .. }));
    assert!(repo.is_empty().await);
    Ok(())
}

/// Store that blows up mid-read.
struct PanickingRepository;

#[async_trait]
impl HazardEventRepository for PanickingRepository {
    async fn list_all(&self) -> sentinel_core::Result<Vec<HazardEvent>> {
        panic!("corrupted page");
    }

    async fn get(&self, _id: &HazardId) -> sentinel_core::Result<Option<HazardEvent>> {
        Ok(None)
    }

    async fn upsert(&self, _event: &HazardEvent) -> sentinel_core::Result<()> {
        Ok(())
    }

    async fn delete(&self, _id: &HazardId) -> sentinel_core::Result<bool> {
        Ok(false)
    }

    async fn commit_batch(&self, _batch: &WriteBatch) -> sentinel_core::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn panic_inside_a_run_becomes_a_failed_outcome() -> Result<()> {
    let (_server, sources) = mock_feeds(&[]).await;
    let pipeline = pipeline_with(sources, Arc::new(PanickingRepository), SyncSettings::default())?;

    let report = pipeline.run_once().await;
    match report.outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("corrupted page")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(pipeline.phase(), RunPhase::Idle);
    Ok(())
}
