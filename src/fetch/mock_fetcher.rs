use super::Fetcher;
use crate::middleware::FetchResponse;
use crate::proxy::ProxySession;
use crate::ScraperResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::sleep;
use url::Url;

#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// Scripted transport for tests: serves the given responses in order,
/// cycling when exhausted.
#[derive(Clone)]
pub struct MockFetcher {
    responses: Arc<Vec<MockResponse>>,
    cursor: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(responses),
            cursor: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_single(
        &self,
        url: Url,
        _proxy: Option<&ProxySession>,
    ) -> ScraperResult<FetchResponse> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let response = &self.responses[index % self.responses.len()];

        if let Some(delay) = response.delay {
            sleep(delay).await;
        }

        Ok(FetchResponse {
            url,
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        })
    }

    fn box_clone(&self) -> Box<dyn Fetcher> {
        Box::new(self.clone())
    }
}
