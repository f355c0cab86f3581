//! In-process test doubles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::fetcher::{FetchError, Fetcher, Payload};

type Script = (Result<Payload, FetchError>, Duration);

/// A [`Fetcher`] answering from a URL -> response table.
///
/// Unknown URLs fail with a connection error. Every call is counted.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Script>>,
    pub calls: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.respond_after(url, body, Duration::ZERO);
    }

    pub fn respond_after(&self, url: &str, body: impl Into<Vec<u8>>, delay: Duration) {
        let payload = Payload {
            body: body.into(),
            content_type: Some("application/xml".into()),
        };
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (Ok(payload), delay));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (Err(error), Duration::ZERO));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Payload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let script = self.responses.lock().unwrap().get(url).cloned();
        let result = match script {
            Some((result, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(FetchError::Connection(format!("no route to {}", url))),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
