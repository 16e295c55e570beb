use super::{fetch_bytes, http_client, FeedEntry, FeedSource, SourceError};
use feed_rs::{model::Feed, parser};
use log::debug;

/// Entries of one or more RSS or Atom feeds, in feed order.
pub struct RssSource {
    urls: Vec<String>,
}

impl RssSource {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }
}

impl FeedSource for RssSource {
    fn fetch_entries(&self) -> Result<Vec<FeedEntry>, SourceError> {
        let client = http_client()?;
        let mut entries = Vec::new();

        for url in &self.urls {
            let body = fetch_bytes(&client, url)?;
            let feed = parser::parse(body.as_slice()).map_err(|e| SourceError::Parse {
                url: url.clone(),
                reason: e.to_string(),
            })?;

            let parsed = feed_entries(feed);
            debug!("Parsed {} entries from {}", parsed.len(), url);
            entries.extend(parsed);
        }

        Ok(entries)
    }
}

/// Plain text title and summary of every entry of `feed`. Entries without a
/// title are dropped.
pub fn feed_entries(feed: Feed) -> Vec<FeedEntry> {
    feed.entries
        .into_iter()
        .filter_map(|entry| {
            let title = strip_markup(&entry.title?.content);
            if title.is_empty() {
                return None;
            }

            let summary = entry
                .summary
                .map(|summary| summary.content)
                .or_else(|| entry.content.and_then(|content| content.body))
                .map(|summary| strip_markup(&summary))
                .unwrap_or_default();

            Some(FeedEntry { title, summary })
        })
        .collect()
}

/// Removes tags, decodes the common entities and collapses whitespace.
pub fn strip_markup(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;

    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                plain.push(' ');
            }
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }

    let decoded = plain
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
