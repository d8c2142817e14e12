//! Connection capability broker.
//!
//! Outbound requests are made inside a [`BrokerContext`] obtained for a set
//! of needed capabilities and a set of rejected ones. The context is a
//! scoped lease: whatever the broker reserved for it is released when the
//! context is dropped, on every exit path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

use crate::config::NetConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    OutgoingHttp,
    OutgoingHttps,
    /// The route can be linked back to this host (direct connections,
    /// known analytics or relay endpoints).
    OutgoingTrackable,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OutgoingHttp => "OUTGOING_HTTP",
            Self::OutgoingHttps => "OUTGOING_HTTPS",
            Self::OutgoingTrackable => "OUTGOING_TRACKABLE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no connection route provides {need:?} without {reject:?}")]
    NoRoute {
        need: Vec<Capability>,
        reject: Vec<Capability>,
    },

    #[error("failed to set up connection route: {0}")]
    Client(#[from] reqwest::Error),
}

/// A scoped connection lease. Requests must be issued through [`client`].
///
/// [`client`]: BrokerContext::client
pub struct BrokerContext {
    client: reqwest::Client,
    route: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl BrokerContext {
    pub fn new(client: reqwest::Client, route: impl Into<String>) -> Self {
        Self {
            client,
            route: route.into(),
            release: None,
        }
    }

    /// Run `release` when the context is dropped.
    pub fn on_release(mut self, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

impl Drop for BrokerContext {
    fn drop(&mut self) {
        debug!("Releasing broker context on route '{}'", self.route);
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for BrokerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerContext")
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionBroker: Send + Sync {
    /// Acquire a context providing every capability in `need` and none in
    /// `reject`.
    async fn context(
        &self,
        need: Vec<Capability>,
        reject: Vec<Capability>,
    ) -> Result<BrokerContext, BrokerError>;
}

#[derive(Debug, Clone)]
struct Route {
    name: &'static str,
    provides: Vec<Capability>,
    proxy: Option<String>,
}

/// Broker that connects directly, or through `net.anon_proxy` when the
/// caller rejects trackable routes.
#[derive(Debug, Clone)]
pub struct DirectBroker {
    routes: Vec<Route>,
    user_agent: String,
    active: Arc<AtomicUsize>,
}

impl DirectBroker {
    pub fn new(net: &NetConfig) -> Self {
        let mut routes = vec![Route {
            name: "direct",
            provides: vec![
                Capability::OutgoingHttp,
                Capability::OutgoingHttps,
                Capability::OutgoingTrackable,
            ],
            proxy: None,
        }];

        if let Some(proxy) = net.anon_proxy.as_ref().filter(|p| !p.is_empty()) {
            routes.push(Route {
                name: "anon-proxy",
                provides: vec![Capability::OutgoingHttp, Capability::OutgoingHttps],
                proxy: Some(proxy.clone()),
            });
        }

        Self {
            routes,
            user_agent: net.user_agent.clone(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of contexts currently leased.
    pub fn active_contexts(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn select(&self, need: &[Capability], reject: &[Capability]) -> Option<&Route> {
        self.routes.iter().find(|route| {
            need.iter().all(|c| route.provides.contains(c))
                && !reject.iter().any(|c| route.provides.contains(c))
        })
    }
}

#[async_trait]
impl ConnectionBroker for DirectBroker {
    async fn context(
        &self,
        need: Vec<Capability>,
        reject: Vec<Capability>,
    ) -> Result<BrokerContext, BrokerError> {
        let Some(route) = self.select(&need, &reject) else {
            return Err(BrokerError::NoRoute { need, reject });
        };

        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.clone());
        if let Some(ref proxy) = route.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }
        let client = builder.build()?;

        self.active.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Leased broker context on route '{}' (need {:?}, reject {:?})",
            route.name, need, reject
        );

        let active = Arc::clone(&self.active);
        Ok(BrokerContext::new(client, route.name).on_release(move || {
            active.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}
