mod config;
mod errors;
mod spider;

pub use config::{CrawlConfig, ProxyCredentials, ProxySettings};
pub use errors::{ScraperError, ScraperResult};
pub use spider::{
    batch_stream, CrawlContext, RecordPayload, ScrapedRecord, Spider, TaskDescriptor, TaskId,
};
