use crate::fetch::Fetcher;
use crate::middleware::{FetchResponse, MiddlewareChain, RequestContext};
use crate::proxy::{ProxyPool, ProxySession};
use crate::{ScraperError, ScraperResult};
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use url::Url;

pub type TaskId = i64;

/// Field name → scraped value mapping emitted by spiders.
pub type RecordPayload = serde_json::Map<String, serde_json::Value>;

/// Static description of one crawl task. The id matches the task's source
/// asset; the name selects the pipeline handler registered for this task
/// type.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub name: String,
    pub domain: String,
    pub params: HashMap<String, String>,
}

impl TaskDescriptor {
    pub fn new(id: TaskId, name: &str, domain: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            domain: domain.to_string(),
            params: HashMap::new(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn url(&self) -> String {
        if self.domain.starts_with("https://") || self.domain.starts_with("http://") {
            return self.domain.clone();
        }
        format!("https://{}", self.domain)
    }
}

/// One scraped item on its way from a spider to the pipeline. Built once,
/// consumed once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedRecord {
    pub task_id: TaskId,
    pub payload: RecordPayload,
}

/// Per-task view over the shared crawl machinery: the fetch capability, the
/// response middleware, and the proxy pool when one is configured for the
/// run. Absence of a pool means "crawl without a proxy", not an error.
pub struct CrawlContext {
    descriptor: TaskDescriptor,
    fetcher: Box<dyn Fetcher>,
    middleware: Arc<MiddlewareChain>,
    proxy: Option<Arc<ProxyPool>>,
}

impl CrawlContext {
    pub fn new(
        descriptor: TaskDescriptor,
        fetcher: Box<dyn Fetcher>,
        middleware: Arc<MiddlewareChain>,
        proxy: Option<Arc<ProxyPool>>,
    ) -> Self {
        Self {
            descriptor,
            fetcher,
            middleware,
            proxy,
        }
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.descriptor.params
    }

    /// Leases a proxy session when the run has a pool. A stateful session
    /// suspends until a sticky endpoint is free.
    pub async fn proxy_session(&self, stateful: bool) -> Option<ProxySession> {
        match &self.proxy {
            Some(pool) => Some(Arc::clone(pool).create_session(stateful).await),
            None => None,
        }
    }

    /// Fetches a URL, re-issuing the request while the middleware chain
    /// advises retry.
    pub async fn fetch(
        &self,
        url: Url,
        proxy: Option<&ProxySession>,
        request: &mut RequestContext,
    ) -> ScraperResult<FetchResponse> {
        self.fetcher
            .fetch(url, proxy, &self.middleware, request)
            .await
    }
}

/// One independent crawl unit. `records` returns a lazy, finite stream of
/// payloads; the launcher pulls it item by item so it can gate every
/// emission on the task's registry state.
pub trait Spider: Send + Sync {
    fn name(&self) -> String;

    fn records<'a>(
        &'a self,
        ctx: &'a CrawlContext,
    ) -> BoxStream<'a, ScraperResult<RecordPayload>>;
}

/// Adapts a batch-producing future into the record stream shape, for
/// spiders that scrape everything in one pass.
pub fn batch_stream<'a, F>(batch: F) -> BoxStream<'a, ScraperResult<RecordPayload>>
where
    F: Future<Output = ScraperResult<Vec<RecordPayload>>> + Send + 'a,
{
    Box::pin(stream::once(batch).flat_map(|result| match result {
        Ok(payloads) => stream::iter(payloads.into_iter().map(Ok)).left_stream(),
        Err(error) => stream::once(future::ready(Err::<RecordPayload, ScraperError>(error)))
            .right_stream(),
    }))
}
