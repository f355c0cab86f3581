//! The aggregation pipeline.
//!
//! ```text
//! Registry → (ParallelFetcher → Normalizer → Cache) | Cache → merge → filter → sort → limit
//! ```
//!
//! Per-feed problems never fail a run: they are collected into the
//! [`FeedReport`] in feed order, and a feed whose refresh failed is served
//! from its last good cache entry when there is one.

pub mod merge;
pub mod since;

pub use merge::TimelineFilter;
pub use since::parse_since;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::app::{Clock, Result};
use crate::config::{assign_color, Config, DEFAULT_PALETTE};
use crate::domain::{CacheEntry, FeedTarget, TimelineItem};
use crate::fetcher::{FetchError, Fetcher, HttpFetcher, HttpOptions, ParallelFetcher};
use crate::normalizer::{Normalizer, ParseError};
use crate::registry::Registry;
use crate::store::CacheStore;

#[derive(Debug, Clone, Default)]
pub struct FeedOptions {
    /// List to aggregate; empty means every list.
    pub list: String,
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
    pub cached_only: bool,
    pub proxy: Option<Url>,
}

/// Settings taken from the persisted config for one run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub batch_size: usize,
    pub hide_future_items: bool,
    pub color_map: BTreeMap<u8, u8>,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout),
            batch_size: config.batch_size,
            hide_future_items: config.hide_future_items,
            color_map: config.color_map.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Fetch(FetchError),
    Parse(ParseError),
    NoCachedContent,
    Cache(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e),
            Self::Parse(e) => write!(f, "{}", e),
            Self::NoCachedContent => write!(f, "no cached content"),
            Self::Cache(e) => write!(f, "unreadable cache entry: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub url: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, Default)]
pub struct FeedReport {
    pub items: Vec<TimelineItem>,
    /// Feeds that contributed nothing.
    pub errors: Vec<FeedFailure>,
    /// Feeds whose refresh failed but were served from the cache.
    pub fallbacks: Vec<FeedFailure>,
}

impl FeedReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub struct Aggregator<'a> {
    registry: &'a Registry,
    cache: &'a dyn CacheStore,
    clock: &'a dyn Clock,
    settings: EngineSettings,
    fetcher: Option<Arc<dyn Fetcher + Send + Sync>>,
    normalizer: Normalizer,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        registry: &'a Registry,
        cache: &'a dyn CacheStore,
        clock: &'a dyn Clock,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            clock,
            settings,
            fetcher: None,
            normalizer: Normalizer::new(),
        }
    }

    /// Use `fetcher` instead of an HTTP client built from the settings.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Merged timeline of the requested feeds, newest first.
    pub async fn feed(&self, opts: &FeedOptions) -> Result<FeedReport> {
        self.run(opts, None).await
    }

    /// Like [`feed`](Self::feed), keeping only items whose title or a
    /// category contains `query`, ignoring case. An empty query matches nothing.
    pub async fn search(&self, query: &str, opts: &FeedOptions) -> Result<FeedReport> {
        self.run(opts, Some(query.to_string())).await
    }

    async fn run(&self, opts: &FeedOptions, search: Option<String>) -> Result<FeedReport> {
        let targets = self.registry.targets(&opts.list)?;
        let mut report = FeedReport::default();

        let entries = if opts.cached_only {
            self.read_cached(&targets, &mut report)
        } else {
            self.refresh(&targets, opts, &mut report).await?
        };

        let per_feed: Vec<Vec<TimelineItem>> = targets
            .iter()
            .zip(entries)
            .filter_map(|(target, entry)| entry.map(|e| self.tag(target, e)))
            .collect();

        let now = self.clock.now();
        let filter = TimelineFilter {
            since: opts.since,
            not_after: self.settings.hide_future_items.then_some(now),
            search,
            limit: opts.limit,
        };
        report.items = merge::apply(merge::merge(per_feed), &filter);

        tracing::info!(
            "Aggregated {} items from {} feeds ({} failed, {} from cache)",
            report.items.len(),
            targets.len(),
            report.errors.len(),
            report.fallbacks.len()
        );
        Ok(report)
    }

    fn read_cached(
        &self,
        targets: &[FeedTarget],
        report: &mut FeedReport,
    ) -> Vec<Option<CacheEntry>> {
        targets
            .iter()
            .map(|target| match self.cache.read(&target.url) {
                Ok(Some(entry)) => Some(entry),
                Ok(None) => {
                    report.errors.push(FeedFailure {
                        url: target.url.clone(),
                        reason: FailureReason::NoCachedContent,
                    });
                    None
                }
                Err(e) => {
                    tracing::warn!("Cache read for {} failed: {}", target.url, e);
                    report.errors.push(FeedFailure {
                        url: target.url.clone(),
                        reason: FailureReason::Cache(e.to_string()),
                    });
                    None
                }
            })
            .collect()
    }

    async fn refresh(
        &self,
        targets: &[FeedTarget],
        opts: &FeedOptions,
        report: &mut FeedReport,
    ) -> Result<Vec<Option<CacheEntry>>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let fetcher: Arc<dyn Fetcher + Send + Sync> = match &self.fetcher {
            Some(fetcher) => fetcher.clone(),
            None => Arc::new(HttpFetcher::new(&HttpOptions {
                user_agent: self.settings.user_agent.clone(),
                timeout: self.settings.timeout,
                proxy: opts.proxy.clone(),
            })?),
        };
        let parallel =
            ParallelFetcher::with_workers(fetcher, self.settings.batch_size, self.settings.timeout);

        let urls: Vec<String> = targets.iter().map(|t| t.url.clone()).collect();
        let results = parallel.fetch_all(&urls).await;

        let entries = results
            .into_iter()
            .map(|(url, outcome)| {
                let parsed = outcome.map_err(FailureReason::Fetch).and_then(|payload| {
                    self.normalizer
                        .normalize(&url, payload.content_type.as_deref(), &payload.body)
                        .map_err(FailureReason::Parse)
                });

                match parsed {
                    Ok(parsed) => {
                        let entry = CacheEntry {
                            feed_url: url.clone(),
                            fetched_at: self.clock.now(),
                            title: parsed.title,
                            description: parsed.description,
                            items: parsed.items,
                            last_error: None,
                        };
                        if let Err(e) = self.cache.write(&entry) {
                            tracing::warn!("Caching {} failed: {}", url, e);
                        }
                        Some(entry)
                    }
                    Err(reason) => self.fall_back(url, reason, report),
                }
            })
            .collect();

        Ok(entries)
    }

    /// Serve a feed whose refresh failed from its last good cache entry.
    fn fall_back(
        &self,
        url: String,
        reason: FailureReason,
        report: &mut FeedReport,
    ) -> Option<CacheEntry> {
        tracing::warn!("Refreshing {} failed: {}", url, reason);
        if let Err(e) = self.cache.record_error(&url, &reason.to_string()) {
            tracing::warn!("Recording error for {} failed: {}", url, e);
        }

        let cached = match self.cache.read(&url) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cache read for {} failed: {}", url, e);
                None
            }
        };

        let failure = FeedFailure { url, reason };
        if cached.is_some() {
            report.fallbacks.push(failure);
        } else {
            report.errors.push(failure);
        }
        cached
    }

    fn tag(&self, target: &FeedTarget, entry: CacheEntry) -> Vec<TimelineItem> {
        let list_id = target
            .lists
            .first()
            .and_then(|list| self.registry.list_id(list))
            .unwrap_or(0);
        let color = assign_color(list_id, &self.settings.color_map, &DEFAULT_PALETTE);
        let feed_title = entry.display_title().to_string();

        entry
            .items
            .into_iter()
            .map(|item| TimelineItem {
                item,
                feed_url: target.url.clone(),
                feed_title: feed_title.clone(),
                lists: target.lists.clone(),
                color,
            })
            .collect()
    }
}
