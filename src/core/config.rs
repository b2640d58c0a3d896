use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProxyCredentials {
    pub user: String,
    pub pass: String,
}

impl ProxyCredentials {
    /// Reads `PROXY_USER`/`PROXY_PASS`. Absence of either means the proxy
    /// is used unauthenticated rather than failing the run.
    pub fn from_env() -> Option<Self> {
        match (env::var("PROXY_USER"), env::var("PROXY_PASS")) {
            (Ok(user), Ok(pass)) => Some(Self { user, pass }),
            _ => None,
        }
    }
}

/// Provider-side layout of the proxy service: one rotating port plus an
/// inclusive range of sticky ports on the same host.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub host: String,
    pub rotating_port: u16,
    pub sticky_ports: (u16, u16),
    pub credentials: Option<ProxyCredentials>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            rotating_port: 10000,
            sticky_ports: (10001, 10100),
            credentials: None,
        }
    }
}

impl ProxySettings {
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_rotating_port(mut self, port: u16) -> Self {
        self.rotating_port = port;
        self
    }

    pub fn with_sticky_ports(mut self, first: u16, last: u16) -> Self {
        self.sticky_ports = (first, last);
        self
    }

    pub fn with_credentials(mut self, credentials: ProxyCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn credentials_from_env(mut self) -> Self {
        self.credentials = ProxyCredentials::from_env();
        self
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Base delay for computed exponential backoff.
    pub wait_base: Duration,
    /// Waits above this abort the request instead of sleeping.
    pub wait_max: Duration,
    /// Capacity of the record queue between spiders and the pipeline.
    pub queue_capacity: usize,
    /// Runs slower than this are logged at warn level.
    pub acceptable_run_duration: Duration,
    pub proxy: ProxySettings,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            wait_base: Duration::from_secs(30),
            wait_max: Duration::from_secs(3600),
            queue_capacity: 64,
            acceptable_run_duration: Duration::from_secs(10),
            proxy: ProxySettings::default(),
        }
    }
}

impl CrawlConfig {
    pub fn with_wait_base(mut self, wait_base: Duration) -> Self {
        self.wait_base = wait_base;
        self
    }

    pub fn with_wait_max(mut self, wait_max: Duration) -> Self {
        self.wait_max = wait_max;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_acceptable_run_duration(mut self, duration: Duration) -> Self {
        self.acceptable_run_duration = duration;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }
}
