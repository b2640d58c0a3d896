use crate::middleware::{FetchResponse, MiddlewareChain, RequestContext, Verdict};
use crate::proxy::ProxySession;
use crate::ScraperResult;
use async_trait::async_trait;
use log::{debug, info, warn};
use url::Url;

/// Abstract page-fetch capability. Implementations issue one request;
/// the provided `fetch` routes every response through the middleware chain
/// and re-issues the request for as long as the chain advises retry. The
/// chain has already slept before advising, so the loop never waits itself.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_single(
        &self,
        url: Url,
        proxy: Option<&ProxySession>,
    ) -> ScraperResult<FetchResponse>;

    fn box_clone(&self) -> Box<dyn Fetcher>;

    async fn fetch(
        &self,
        url: Url,
        proxy: Option<&ProxySession>,
        middleware: &MiddlewareChain,
        request: &mut RequestContext,
    ) -> ScraperResult<FetchResponse> {
        loop {
            info!("Fetching URL: {}", url);
            let response = self.fetch_single(url.clone(), proxy).await?;
            debug!(
                "Received response: status={}, body_length={}",
                response.status,
                response.body.len()
            );

            match middleware.handle_response(&response, request).await? {
                Verdict::Proceed => return Ok(response),
                Verdict::Retry => {
                    warn!(
                        "Retry advised for URL: {} (attempt {})",
                        url,
                        request.retry_count()
                    );
                }
            }
        }
    }
}
