use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::fetcher::{FetchError, Fetcher, Payload};

pub type FetchOutcome = Result<Payload, FetchError>;

/// Runs a batch of fetches with at most `workers` requests in flight.
pub struct ParallelFetcher {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl ParallelFetcher {
    pub fn with_workers(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
        }
    }

    /// Fetch every URL and return one outcome per URL, in input order.
    ///
    /// A failing or slow request never affects the others; each one is bounded
    /// by its own timeout.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<(String, FetchOutcome)> {
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();
            let timeout = self.timeout;
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => match tokio::time::timeout(timeout, fetcher.fetch(&url)).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout),
                    },
                    Err(e) => Err(FetchError::Request(e.to_string())),
                };
                (url, result)
            }));
        }

        let mut by_url: HashMap<String, FetchOutcome> = HashMap::with_capacity(urls.len());
        for joined in join_all(handles).await {
            match joined {
                Ok((url, result)) => {
                    if let Err(e) = &result {
                        tracing::warn!("Fetching {} failed: {}", url, e);
                    }
                    by_url.insert(url, result);
                }
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        urls.iter()
            .map(|url| {
                let result = by_url
                    .remove(url)
                    .unwrap_or_else(|| Err(FetchError::Request("fetch task aborted".into())));
                (url.clone(), result)
            })
            .collect()
    }
}
