pub mod http_fetcher;
pub mod parallel;

use async_trait::async_trait;
use thiserror::Error;

pub use http_fetcher::{HttpFetcher, HttpOptions};
pub use parallel::ParallelFetcher;

/// Responses larger than this are rejected.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("response larger than {0} bytes")]
    TooLarge(usize),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

/// Raw body of a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Payload, FetchError>;
}
