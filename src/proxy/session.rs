use super::pool::{ProxyError, ProxyPool};
use log::{debug, error};
use std::sync::Arc;

/// A lease on one proxy endpoint, held for the session's lifetime. Sticky
/// sessions own their endpoint exclusively and must release it; rotating
/// sessions share the rotating endpoint and release is a no-op. Dropping an
/// unreleased sticky session returns the endpoint to the pool.
pub struct ProxySession {
    endpoint: String,
    pool: Arc<ProxyPool>,
    sticky: bool,
    released: bool,
}

impl ProxySession {
    pub(crate) fn sticky(endpoint: String, pool: Arc<ProxyPool>) -> Self {
        Self {
            endpoint,
            pool,
            sticky: true,
            released: false,
        }
    }

    pub(crate) fn rotating(endpoint: String, pool: Arc<ProxyPool>) -> Self {
        Self {
            endpoint,
            pool,
            sticky: false,
            released: false,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    /// Full proxy URL for the fetch layer, credentialed when the pool has
    /// credentials configured.
    pub fn proxy_url(&self) -> String {
        match self.pool.credentials() {
            Some(credentials) => format!(
                "http://{}:{}@{}",
                credentials.user, credentials.pass, self.endpoint
            ),
            None => format!("http://{}", self.endpoint),
        }
    }

    /// Releases the endpoint so other sessions may lease it. Releasing a
    /// sticky session twice is an error.
    pub fn release(&mut self) -> Result<(), ProxyError> {
        if !self.sticky {
            return Ok(());
        }
        if self.released {
            return Err(ProxyError::AlreadyReleased(self.endpoint.clone()));
        }
        self.pool.release_sticky(&self.endpoint)?;
        self.released = true;
        Ok(())
    }
}

impl Drop for ProxySession {
    fn drop(&mut self) {
        if self.sticky && !self.released {
            debug!(
                "sticky session dropped without release, returning {}",
                self.endpoint
            );
            if let Err(e) = self.pool.release_sticky(&self.endpoint) {
                error!("{e}");
            }
        }
    }
}
