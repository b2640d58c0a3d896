use super::response::FetchResponse;
use super::status::StatusCodeMiddleware;
use crate::core::CrawlConfig;
use crate::ScraperResult;
use async_trait::async_trait;

/// Per-logical-request state threaded through the middleware chain. The
/// retry counter is scoped to one request sequence (one page context), so
/// unrelated requests never inflate each other's backoff.
#[derive(Debug, Default)]
pub struct RequestContext {
    retry_count: u32,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn increase_retry_count(&mut self) {
        self.retry_count += 1;
    }
}

/// What the chain tells the caller to do with the request that produced the
/// response. The chain itself never re-issues requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Retry,
}

#[async_trait]
pub trait ResponseMiddleware: Send + Sync {
    async fn handle_response(
        &self,
        response: &FetchResponse,
        request: &mut RequestContext,
    ) -> ScraperResult<Verdict>;
}

/// Ordered set of response handlers, run strictly in registration order.
/// Any handler advising a retry makes the whole chain advise one.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn ResponseMiddleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_middleware(mut self, middleware: Box<dyn ResponseMiddleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// The stock chain: status-code routing with retry/backoff.
    pub fn standard(config: &CrawlConfig) -> Self {
        Self::new().with_middleware(Box::new(StatusCodeMiddleware::new(
            config.wait_base,
            config.wait_max,
        )))
    }

    pub async fn handle_response(
        &self,
        response: &FetchResponse,
        request: &mut RequestContext,
    ) -> ScraperResult<Verdict> {
        let mut verdict = Verdict::Proceed;
        for middleware in &self.middlewares {
            if middleware.handle_response(response, request).await? == Verdict::Retry {
                verdict = Verdict::Retry;
            }
        }
        Ok(verdict)
    }
}
