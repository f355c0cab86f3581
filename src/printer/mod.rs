//! Terminal rendering of timelines, reports and settings.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};

use crate::config::{Config, Styling};
use crate::domain::TimelineItem;
use crate::engine::FeedReport;
use crate::store::CacheInfo;

pub struct Printer {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    styled: bool,
}

impl Printer {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>, styled: bool) -> Self {
        Self { out, err, styled }
    }

    /// Printer on the process's stdout and stderr.
    pub fn stdio(styling: Styling) -> Self {
        let styled = match styling {
            Styling::Enabled => true,
            Styling::Disabled => false,
            Styling::Default => io::stdout().is_terminal(),
        };
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()), styled)
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}", text)?;
        self.out.flush()
    }

    fn paint(&self, text: &str, color: u8) -> String {
        if self.styled {
            text.with(Color::AnsiValue(color)).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.styled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn timeline(&mut self, items: &[TimelineItem], now: DateTime<Utc>) -> io::Result<()> {
        for (i, entry) in items.iter().enumerate() {
            if i > 0 {
                writeln!(self.out)?;
            }
            let header = format!(
                "{} {}",
                entry.feed_title,
                relative_age(entry.item.published, now)
            );
            let header = self.paint(&header, entry.color);
            let title = self.bold(entry.item.display_title());
            writeln!(self.out, "{}", header)?;
            writeln!(self.out, "{}", title)?;
            writeln!(self.out, "{}", entry.item.link)?;
        }
        self.out.flush()
    }

    /// Item counts per feed, in order of first appearance.
    pub fn summary(&mut self, items: &[TimelineItem]) -> io::Result<()> {
        let mut counts: Vec<(&TimelineItem, usize)> = Vec::new();
        for item in items {
            match counts.iter_mut().find(|(first, _)| first.feed_url == item.feed_url) {
                Some((_, count)) => *count += 1,
                None => counts.push((item, 1)),
            }
        }

        for (first, count) in counts {
            let title = self.paint(&first.feed_title, first.color);
            writeln!(self.out, "{} {}", title, count)?;
        }
        self.out.flush()
    }

    /// Per-feed failures, after the timeline.
    pub fn report(&mut self, report: &FeedReport) -> io::Result<()> {
        for failure in &report.fallbacks {
            writeln!(
                self.err,
                "{}: {} (showing cached content)",
                failure.url, failure.reason
            )?;
        }
        for failure in &report.errors {
            writeln!(self.err, "{}: {}", failure.url, failure.reason)?;
        }
        self.err.flush()
    }

    pub fn cache_info(&mut self, info: &CacheInfo, path: Option<&Path>) -> io::Result<()> {
        if let Some(path) = path {
            writeln!(self.out, "Path: {}", path.display())?;
        }
        writeln!(self.out, "Feeds: {}", info.total_feeds)?;
        writeln!(self.out, "Items: {}", info.total_items)?;
        writeln!(self.out, "Size: {}", human_bytes(info.total_bytes))?;

        for feed in &info.feeds {
            let url = self.bold(&feed.feed_url);
            writeln!(self.out)?;
            writeln!(self.out, "{}", url)?;
            if let Some(title) = &feed.title {
                writeln!(self.out, "  Title: {}", title)?;
            }
            writeln!(
                self.out,
                "  Fetched: {}",
                feed.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
            writeln!(self.out, "  Items: {}", feed.item_count)?;
            if let Some(error) = &feed.last_error {
                writeln!(self.out, "  Last error: {}", error)?;
            }
        }
        self.out.flush()
    }

    pub fn config(&mut self, config: &Config) -> io::Result<()> {
        let color_map = config
            .color_map
            .iter()
            .map(|(list, color)| self.paint(&format!("{}:{}", list, color), *color))
            .collect::<Vec<_>>()
            .join(" ");

        let lines = [
            ("User-Agent", config.user_agent.clone()),
            ("Timeout", config.timeout.to_string()),
            ("Batch size", config.batch_size.to_string()),
            ("Styling", config.styling.label().to_string()),
            ("Color map", color_map),
            ("Summary", enabled(config.summary).to_string()),
            (
                "Future items",
                if config.hide_future_items { "hide" } else { "show" }.to_string(),
            ),
            ("Miniflux token", config.miniflux_token.clone()),
        ];
        for (label, value) in lines {
            if value.is_empty() {
                writeln!(self.out, "{}:", label)?;
            } else {
                writeln!(self.out, "{}: {}", label, value)?;
            }
        }
        self.out.flush()
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

/// Short age of an item relative to `now`, e.g. `3h ago`.
///
/// Items older than a month, or dated in the future, show their date instead.
pub fn relative_age(published: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(published) = published else {
        return "(no date)".to_string();
    };

    let secs = (now - published).num_seconds();
    match secs {
        s if s < 0 => published.format("%Y-%m-%d").to_string(),
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s if s < 30 * 86_400 => format!("{}d ago", s / 86_400),
        _ => published.format("%Y-%m-%d").to_string(),
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
