mod chain;
mod response;
mod status;


pub use chain::{MiddlewareChain, RequestContext, ResponseMiddleware, Verdict};
pub use response::FetchResponse;
pub use status::{RetryDecision, StatusCodeMiddleware, WaitSource};
