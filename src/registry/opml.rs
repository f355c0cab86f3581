use html_escape::{decode_html_entities, encode_double_quoted_attribute};

/// Extract `(title, xmlUrl)` pairs from every `<outline>` carrying a feed URL.
pub(super) fn parse_outlines(content: &str) -> Vec<(String, String)> {
    let mut feeds = Vec::new();

    // Regex-free parsing: look at each outline element's attributes
    for element in content.split("<outline").skip(1) {
        let element = element.split('>').next().unwrap_or_default();
        if let Some(url) = extract_attr(element, "xmlUrl") {
            let title = extract_attr(element, "title")
                .or_else(|| extract_attr(element, "text"))
                .unwrap_or_else(|| url.clone());
            feeds.push((title, url));
        }
    }

    feeds
}

pub(super) fn render(list: &str, feeds: &[String]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<opml version=\"2.0\">\n");
    out.push_str(&format!(
        "  <head>\n    <title>{}</title>\n  </head>\n  <body>\n",
        encode_double_quoted_attribute(list)
    ));
    for url in feeds {
        let url = encode_double_quoted_attribute(url);
        out.push_str(&format!(
            "    <outline type=\"rss\" text=\"{}\" xmlUrl=\"{}\"/>\n",
            url, url
        ));
    }
    out.push_str("  </body>\n</opml>\n");
    out
}

/// Extract an attribute value from an XML element string
fn extract_attr(element: &str, attr: &str) -> Option<String> {
    let pattern = format!(" {}=\"", attr);
    let start = element.find(&pattern)? + pattern.len();
    let rest = &element[start..];
    let end = rest.find('"')?;
    let value = &rest[..end];
    Some(decode_html_entities(value).to_string())
}
