use super::endpoints::ProxyEndpoints;
use super::session::ProxySession;
use crate::core::{ProxyCredentials, ProxySettings};
use log::{debug, error};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("released endpoint '{0}' that was not leased")]
    NotLeased(String),

    #[error("proxy session for '{0}' was already released")]
    AlreadyReleased(String),
}

/// Shared state between all proxy sessions of one run. Sticky endpoints are
/// exclusive: a semaphore holds one permit per sticky endpoint, so
/// `acquire_sticky` suspends (FIFO) until a release frees a slot, then scans
/// the endpoint list for the free one. The rotating endpoint is shared and
/// never blocks.
pub struct ProxyPool {
    endpoints: ProxyEndpoints,
    in_use: Mutex<HashSet<String>>,
    free_slots: Semaphore,
    credentials: Option<ProxyCredentials>,
}

impl ProxyPool {
    pub fn new(settings: &ProxySettings) -> Self {
        let endpoints = ProxyEndpoints::from_settings(settings);
        debug!(
            "proxy pool: 1 rotating endpoint, {} sticky endpoints",
            endpoints.sticky.len()
        );
        Self {
            free_slots: Semaphore::new(endpoints.sticky.len()),
            in_use: Mutex::new(HashSet::new()),
            credentials: settings.credentials.clone(),
            endpoints,
        }
    }

    /// Factory for sessions; the only way to obtain one. A stateful session
    /// leases a sticky endpoint, suspending until one is free.
    pub async fn create_session(self: Arc<Self>, stateful: bool) -> ProxySession {
        if stateful {
            let endpoint = self.acquire_sticky().await;
            ProxySession::sticky(endpoint, self)
        } else {
            ProxySession::rotating(self.endpoints.rotating.clone(), self)
        }
    }

    pub fn rotating_endpoint(&self) -> &str {
        &self.endpoints.rotating
    }

    pub async fn acquire_sticky(&self) -> String {
        let permit = self
            .free_slots
            .acquire()
            .await
            .expect("sticky endpoint semaphore closed");
        permit.forget();

        let mut in_use = self.in_use.lock();
        for endpoint in &self.endpoints.sticky {
            if !in_use.contains(endpoint) {
                in_use.insert(endpoint.clone());
                debug!("leased sticky endpoint {endpoint}");
                return endpoint.clone();
            }
        }
        // A held permit guarantees a free endpoint exists.
        unreachable!("semaphore permit held with no free sticky endpoint")
    }

    /// Returns a sticky endpoint to the pool and wakes one waiter. Releasing
    /// an endpoint that is not leased signals a double-release bug.
    pub fn release_sticky(&self, endpoint: &str) -> Result<(), ProxyError> {
        {
            let mut in_use = self.in_use.lock();
            if !in_use.remove(endpoint) {
                error!("released endpoint '{endpoint}' that was not leased");
                return Err(ProxyError::NotLeased(endpoint.to_string()));
            }
        }
        self.free_slots.add_permits(1);
        debug!("released sticky endpoint {endpoint}");
        Ok(())
    }

    pub(crate) fn credentials(&self) -> Option<&ProxyCredentials> {
        self.credentials.as_ref()
    }
}
