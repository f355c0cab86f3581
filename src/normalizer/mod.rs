//! Turns RSS and Atom documents into [`Item`]s.
//!
//! The document kind is chosen by inspecting the root element, never the
//! declared content type. Relative item links are resolved against the feed's
//! own link, or the request URL when the feed has none.

use chrono::Utc;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use html_escape::decode_html_entities;
use thiserror::Error;
use url::Url;

use crate::domain::Item;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("not an RSS or Atom document (root element: {0})")]
    UnsupportedFormat(String),

    #[error("malformed feed document: {0}")]
    Malformed(String),
}

/// The closed set of supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `<rss><channel><item>`
    Rss,
    /// `<rdf:RDF>` (RSS 1.0)
    Rdf,
    /// `<feed><entry>`
    Atom,
}

impl DocumentKind {
    /// Identify the document from its root element.
    pub fn detect(body: &[u8]) -> Result<Self, ParseError> {
        let root = root_element(body).ok_or_else(|| {
            ParseError::UnsupportedFormat("<none>".into())
        })?;
        let local = root.rsplit(':').next().unwrap_or(&root);

        match local {
            "rss" => Ok(Self::Rss),
            "RDF" => Ok(Self::Rdf),
            "feed" => Ok(Self::Atom),
            _ => Err(ParseError::UnsupportedFormat(root)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<Item>,
}

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        feed_url: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<ParsedFeed, ParseError> {
        let kind = DocumentKind::detect(body)?;
        if let Some(content_type) = content_type {
            tracing::debug!("{} declared {}, parsing as {:?}", feed_url, content_type, kind);
        }

        let feed = parser::parse(body).map_err(|e| ParseError::Malformed(e.to_string()))?;

        let base = base_url(&feed.links).or_else(|| Url::parse(feed_url).ok());

        let items = feed
            .entries
            .into_iter()
            .map(|entry| normalize_entry(entry, base.as_ref()))
            .collect();

        Ok(ParsedFeed {
            title: feed.title.map(|t| decode_html_entities(&t.content).trim().to_string()),
            description: feed
                .description
                .map(|d| decode_html_entities(&d.content).trim().to_string()),
            items,
        })
    }
}

fn normalize_entry(entry: Entry, base: Option<&Url>) -> Item {
    let link = entry_link(&entry.links)
        .map(|href| resolve_link(href, base))
        .unwrap_or_default();

    Item {
        title: entry
            .title
            .map(|t| decode_html_entities(&t.content).trim().to_string())
            .unwrap_or_default(),
        link,
        published: entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc)),
        categories: entry
            .categories
            .into_iter()
            .map(|c| c.term.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    }
}

/// The feed's own absolute link: an alternate link first, then `rel="self"`.
fn base_url(links: &[Link]) -> Option<Url> {
    let is_self = |l: &Link| l.rel.as_deref() == Some("self");
    let absolute = |l: &Link| Url::parse(l.href.trim()).ok();

    links
        .iter()
        .filter(|l| !is_self(l))
        .find_map(absolute)
        .or_else(|| links.iter().filter(|l| is_self(l)).find_map(absolute))
}

fn entry_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim())
        .filter(|href| !href.is_empty())
}

fn resolve_link(href: &str, base: Option<&Url>) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Name of the first element, skipping the prolog, comments and doctype.
fn root_element(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();

    loop {
        if let Some(after) = rest.strip_prefix("<?") {
            rest = after.split_once("?>")?.1.trim_start();
        } else if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.split_once("-->")?.1.trim_start();
        } else if let Some(after) = rest.strip_prefix("<!") {
            rest = after.split_once('>')?.1.trim_start();
        } else if let Some(after) = rest.strip_prefix('<') {
            let name: String = after
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
                .collect();
            return (!name.is_empty()).then_some(name);
        } else {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>RSS Feed</title>
    <description>RSS Feed description</description>
    <link>https://rss-feed.com/</link>
    <item>
      <title>Item 1</title>
      <link>https://rss-feed.com/item-1/</link>
      <pubDate>Wed, 31 Dec 2023 23:45:00 GMT</pubDate>
      <category>Rust</category>
      <category>Systems</category>
    </item>
    <item>
      <title>Item 2</title>
      <link>/item-2/</link>
      <pubDate>Sat, 18 May 2019 21:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <subtitle>Atom Feed description</subtitle>
  <link href="https://atom-feed.com/"/>
  <entry>
    <title>Item 1</title>
    <link href="https://atom-feed.com/item-1/"/>
    <id>item-1</id>
    <updated>2023-12-31T06:00:00Z</updated>
  </entry>
  <entry>
    <title>Item 2</title>
    <link href="item-2/"/>
    <id>item-2</id>
    <published>2019-08-20T21:00:00+02:00</published>
    <updated>2019-08-21T21:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let feed = Normalizer::new()
            .normalize("https://rss-feed.com/rss.xml", None, RSS_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(feed.title.as_deref(), Some("RSS Feed"));
        assert_eq!(feed.description.as_deref(), Some("RSS Feed description"));
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "Item 1");
        assert_eq!(feed.items[0].link, "https://rss-feed.com/item-1/");
        assert_eq!(
            feed.items[0].published,
            Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 45, 0).unwrap())
        );
        assert_eq!(feed.items[0].categories, vec!["Rust", "Systems"]);
    }

    #[test]
    fn test_rss_relative_link_uses_channel_link() {
        let feed = Normalizer::new()
            .normalize("https://elsewhere.com/rss.xml", None, RSS_SAMPLE.as_bytes())
            .unwrap();
        assert_eq!(feed.items[1].link, "https://rss-feed.com/item-2/");
    }

    #[test]
    fn test_parse_atom() {
        let feed = Normalizer::new()
            .normalize("https://atom-feed.com/feed.atom", None, ATOM_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(feed.title.as_deref(), Some("Atom Feed"));
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].link, "https://atom-feed.com/item-1/");
        assert_eq!(
            feed.items[0].published,
            Some(Utc.with_ymd_and_hms(2023, 12, 31, 6, 0, 0).unwrap())
        );
        // published wins over updated, converted to UTC
        assert_eq!(
            feed.items[1].published,
            Some(Utc.with_ymd_and_hms(2019, 8, 20, 19, 0, 0).unwrap())
        );
        assert_eq!(feed.items[1].link, "https://atom-feed.com/item-2/");
    }

    #[test]
    fn test_relative_link_falls_back_to_request_url() {
        let body = r#"<rss version="2.0"><channel><title>T</title>
<item><title>A</title><link>posts/a.html</link></item>
</channel></rss>"#;
        let feed = Normalizer::new()
            .normalize("https://example.com/blog/rss.xml", None, body.as_bytes())
            .unwrap();
        assert_eq!(feed.items[0].link, "https://example.com/blog/posts/a.html");
    }

    #[test]
    fn test_missing_title_and_bad_date_are_kept() {
        let body = r#"<rss version="2.0"><channel><title>T</title><link>https://t.com/</link>
<item><link>https://t.com/a</link><pubDate>sometime last week</pubDate></item>
<item><title>No date</title><link>https://t.com/b</link></item>
</channel></rss>"#;
        let feed = Normalizer::new()
            .normalize("https://t.com/rss", None, body.as_bytes())
            .unwrap();

        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "");
        assert_eq!(feed.items[0].published, None);
        assert_eq!(feed.items[1].published, None);
    }

    #[test]
    fn test_detect_by_root_element() {
        assert_eq!(DocumentKind::detect(RSS_SAMPLE.as_bytes()), Ok(DocumentKind::Rss));
        assert_eq!(DocumentKind::detect(ATOM_SAMPLE.as_bytes()), Ok(DocumentKind::Atom));
        assert_eq!(
            DocumentKind::detect(b"<!-- hi -->\n<!DOCTYPE x><rdf:RDF xmlns:rdf=\"x\"></rdf:RDF>"),
            Ok(DocumentKind::Rdf)
        );
        assert_eq!(
            DocumentKind::detect(b"<html><body>Not a feed</body></html>"),
            Err(ParseError::UnsupportedFormat("html".into()))
        );
        assert!(DocumentKind::detect(b"{\"version\": \"json\"}").is_err());
        assert!(DocumentKind::detect(b"").is_err());
    }

    #[test]
    fn test_mislabelled_content_type_is_ignored() {
        let feed = Normalizer::new()
            .normalize("https://atom-feed.com/feed", Some("text/html"), ATOM_SAMPLE.as_bytes())
            .unwrap();
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn test_malformed_document() {
        let result = Normalizer::new().normalize(
            "https://broken.com/rss",
            None,
            b"<rss version=\"2.0\"><channel><title>x</wrong></channel></rss>",
        );
        assert!(result.is_err());
    }
}
