use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Proxy};
use url::Url;

use crate::app::{OptionError, Result};
use crate::fetcher::{FetchError, Fetcher, Payload, MAX_BODY_BYTES};

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    pub timeout: Duration,
    /// Applied to every request made by this fetcher.
    pub proxy: Option<Url>,
}

pub struct HttpFetcher {
    client: Client,
    max_body: usize,
}

impl HttpFetcher {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(options.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(options.user_agent.as_str());

        if let Some(proxy) = &options.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| OptionError::InvalidProxy(proxy.to_string(), e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| OptionError::InvalidProxy(String::new(), e.to_string()))?;

        Ok(Self {
            client,
            max_body: MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Payload, FetchError> {
        tracing::debug!("GET {}", url);
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body as u64)
        {
            return Err(FetchError::TooLarge(self.max_body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_body {
                return Err(FetchError::TooLarge(self.max_body));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Payload { body, content_type })
    }
}
