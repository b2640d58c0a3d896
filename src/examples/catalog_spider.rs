use crate::core::{batch_stream, CrawlContext, RecordPayload, Spider};
use crate::middleware::RequestContext;
use crate::ScraperResult;
use futures::stream::BoxStream;
use log::debug;
use serde_json::Value;
use url::Url;

/// Reference spider: fetches a JSON catalog endpoint for its task's domain
/// and emits one record per catalog item. Shows the intended shape of a
/// task plug-in: fetch through the context so the middleware chain and
/// proxy pool apply, then stream payloads.
#[derive(Default)]
pub struct CatalogSpider;

impl CatalogSpider {
    pub fn new() -> Self {
        Self
    }

    async fn scrape(&self, ctx: &CrawlContext) -> ScraperResult<Vec<RecordPayload>> {
        let base = Url::parse(&ctx.descriptor().url())?;
        let path = ctx
            .params()
            .get("path")
            .map(String::as_str)
            .unwrap_or("/catalog.json");
        let url = base.join(path)?;

        let session = ctx.proxy_session(false).await;
        let mut request = RequestContext::new();
        let response = ctx.fetch(url, session.as_ref(), &mut request).await?;

        let parsed: Value = serde_json::from_str(&response.body)?;
        let items = match &parsed {
            Value::Array(items) => items.clone(),
            Value::Object(map) => {
                let key = ctx
                    .params()
                    .get("items_key")
                    .map(String::as_str)
                    .unwrap_or("items");
                map.get(key).and_then(Value::as_array).cloned().unwrap_or_default()
            }
            _ => Vec::new(),
        };
        debug!("{} catalog items scraped from {}", items.len(), response.url);

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(payload) => Some(payload),
                _ => None,
            })
            .collect())
    }
}

impl Spider for CatalogSpider {
    fn name(&self) -> String {
        "catalog_spider".to_string()
    }

    fn records<'a>(
        &'a self,
        ctx: &'a CrawlContext,
    ) -> BoxStream<'a, ScraperResult<RecordPayload>> {
        batch_stream(self.scrape(ctx))
    }
}
