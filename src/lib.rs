//! # Tributary
//!
//! A command line RSS/Atom feed aggregator.
//!
//! ## Architecture
//!
//! Followed feeds are grouped into named lists. Every run turns them into one
//! timeline:
//!
//! ```text
//! Registry → Fetcher → Normalizer → Cache → Engine (merge, filter, sort) → Printer
//! ```
//!
//! - [`fetcher`]: bounded-concurrency HTTP retrieval with per-request timeouts
//! - [`normalizer`]: RSS and Atom documents to unified [`Item`](domain::Item)s
//! - [`store`]: SQLite cache of the last good content of every feed
//! - [`engine`]: the aggregation pipeline with cache fallback
//!
//! ## Quick Start
//!
//! ```bash
//! # Follow a feed
//! tributary follow https://blog.rust-lang.org/feed.xml
//!
//! # Show the ten newest items of the last day
//! tributary --since 1d --limit 10
//!
//! # Search what is already cached
//! tributary --search rust -C
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together config, registry,
/// cache and clock.
pub mod app;

/// Command-line interface using clap.
///
/// - root flags: `--list`, `--limit`, `--since`, `--search`, `--proxy`, `--cached-only`
/// - `follow <url...>` / `unfollow <url...>`
/// - `list [name]` with rename, remove and OPML import/export
/// - `config` to show or change settings
pub mod cli;

/// Persisted settings and list colors.
///
/// Loads from `~/.config/tributary/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): a normalized feed entry
/// - [`TimelineItem`](domain::TimelineItem): an item tagged with its feed, lists and color
/// - [`CacheEntry`](domain::CacheEntry): last good content of one feed
pub mod domain;

/// Merging, filtering and ordering of many feeds into one timeline.
pub mod engine;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::ParallelFetcher): Concurrent fetching with semaphore
pub mod fetcher;

/// Feed parsing and normalization.
pub mod normalizer;

/// Terminal output.
pub mod printer;

/// Named lists of followed feeds, stored in `lists.toml`.
pub mod registry;

/// Feed cache.
///
/// - [`CacheStore`](store::CacheStore): Trait defining cache operations
/// - [`SqliteCache`](store::SqliteCache): SQLite implementation
pub mod store;

#[cfg(test)]
pub mod testing;
