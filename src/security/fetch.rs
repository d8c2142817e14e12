//! Policy-gated retrieval of web content.
//!
//! Fetches only happen when `prefs.web_content` is `on` or `anon`, and
//! only inside a broker context that provides the capability the URL
//! scheme needs. Anonymous fetches additionally reject trackable routes.
//! There are no retries: every failure goes straight back to the caller.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::broker::{BrokerError, Capability, ConnectionBroker};
use crate::config::{PrefsConfig, WebContent};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Web content is disabled by policy")]
    Disabled,

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

impl From<FetchError> for std::io::Error {
    fn from(err: FetchError) -> Self {
        let kind = match err {
            FetchError::Disabled => std::io::ErrorKind::PermissionDenied,
            FetchError::Timeout { .. } => std::io::ErrorKind::TimedOut,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Capabilities needed and rejected for fetching `url`.
pub fn connection_requirements(
    web_content: WebContent,
    url: &str,
    anonymous: bool,
) -> (Vec<Capability>, Vec<Capability>) {
    let need = if url.starts_with("https:") {
        vec![Capability::OutgoingHttps]
    } else {
        vec![Capability::OutgoingHttp]
    };

    let mut reject = Vec::new();
    if web_content == WebContent::Anon || anonymous {
        reject.push(Capability::OutgoingTrackable);
    }

    (need, reject)
}

#[derive(Clone)]
pub struct SecureFetcher {
    broker: Arc<dyn ConnectionBroker>,
}

impl SecureFetcher {
    pub fn new(broker: Arc<dyn ConnectionBroker>) -> Self {
        Self { broker }
    }

    /// Fetch `url` and return the response body.
    ///
    /// `timeout` bounds context acquisition and the transfer together.
    pub async fn fetch(
        &self,
        prefs: &PrefsConfig,
        url: &str,
        timeout: Duration,
        anonymous: bool,
    ) -> Result<Vec<u8>, FetchError> {
        if !prefs.web_content.allows_fetch() {
            warn!("Refusing to fetch {}: web content is {}", url, prefs.web_content);
            return Err(FetchError::Disabled);
        }

        let (need, reject) = connection_requirements(prefs.web_content, url, anonymous);
        debug!("Fetching {} (need {:?}, reject {:?})", url, need, reject);

        match tokio::time::timeout(timeout, self.fetch_within(url, need, reject)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn fetch_within(
        &self,
        url: &str,
        need: Vec<Capability>,
        reject: Vec<Capability>,
    ) -> Result<Vec<u8>, FetchError> {
        let ctx = self.broker.context(need, reject).await?;

        let response = ctx.client().get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
