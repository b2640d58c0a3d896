mod fetcher;
pub mod http_fetcher;
pub mod mock_fetcher;


pub use fetcher::Fetcher;
pub use http_fetcher::HttpFetcher;
pub use mock_fetcher::{MockFetcher, MockResponse};
