use super::Fetcher;
use crate::middleware::FetchResponse;
use crate::proxy::ProxySession;
use crate::ScraperResult;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP transport on reqwest. When a fetch goes through a proxy
/// session, a client bound to that session's endpoint is built for the
/// request, so sticky sessions keep a consistent outbound IP.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new() -> ScraperResult<Self> {
        let client = ClientBuilder::new().user_agent(DEFAULT_USER_AGENT).build()?;
        Ok(Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> ScraperResult<Self> {
        self.client = ClientBuilder::new().user_agent(user_agent).build()?;
        self.user_agent = user_agent.to_string();
        Ok(self)
    }

    fn proxied_client(&self, session: &ProxySession) -> ScraperResult<Client> {
        let proxy = reqwest::Proxy::all(session.proxy_url())?;
        Ok(ClientBuilder::new()
            .user_agent(self.user_agent.clone())
            .proxy(proxy)
            .build()?)
    }

    fn extract_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
            .collect()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_single(
        &self,
        url: Url,
        proxy: Option<&ProxySession>,
    ) -> ScraperResult<FetchResponse> {
        let client = match proxy {
            Some(session) => self.proxied_client(session)?,
            None => self.client.clone(),
        };

        let response = client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let headers = Self::extract_headers(&response);
        let body = response.text().await?;

        Ok(FetchResponse {
            url,
            status,
            headers,
            body,
        })
    }

    fn box_clone(&self) -> Box<dyn Fetcher> {
        Box::new(self.clone())
    }
}
