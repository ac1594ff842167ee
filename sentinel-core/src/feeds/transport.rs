use async_trait::async_trait;
use tracing::debug;

use super::{FetchError, SourceConfig};
use crate::error::Result;

/// HTTP seam used by the fetchers. Constructed once per process and passed in
/// explicitly; nothing here is global.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// GET `config.url` and return the decoded body of a 2xx response.
    async fn get(&self, config: &SourceConfig) -> std::result::Result<String, FetchError>;
}

/// reqwest-backed transport.
///
/// Holds two clients sharing the same user agent. The relaxed client skips
/// certificate verification and is only ever handed requests for sources whose
/// [`SourceConfig::relaxed_tls`] flag is set; every other source goes through
/// the verifying client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    strict: reqwest::Client,
    relaxed: reqwest::Client,
}

impl HttpTransport {
    pub const DEFAULT_USER_AGENT: &'static str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/91.0.4472.124 Safari/537.36";

    pub fn new(user_agent: &str) -> Result<Self> {
        let strict = reqwest::Client::builder().user_agent(user_agent).build()?;
        let relaxed = reqwest::Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { strict, relaxed })
    }

    fn client_for(&self, config: &SourceConfig) -> &reqwest::Client {
        if config.relaxed_tls {
            &self.relaxed
        } else {
            &self.strict
        }
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get(&self, config: &SourceConfig) -> std::result::Result<String, FetchError> {
        if config.relaxed_tls {
            debug!(
                source = %config.source,
                "fetching with certificate verification disabled"
            );
        }

        let response = self.client_for(config).get(&config.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
