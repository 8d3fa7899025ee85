//! RSS 2.0 / Atom feed retrieval.
//!
//! Feeds are the friendliest source kind: entries map directly onto
//! candidates. The body is tried as RSS 2.0 first and as Atom second;
//! publication timestamps go through the shared date chain, falling back
//! to today's date when a feed emits something unparseable.

use crate::config::NewsSource;
use crate::error::{FetchError, FetchResult};
use crate::fetch::FetchContext;
use crate::models::Candidate;
use crate::relevance::is_relevant;
use crate::utils::display_date_or_now;
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

/// Atom text constructs may carry a `type` attribute, so the content
/// lives in the element body rather than a plain string.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

/// Fetch and parse a feed into candidates.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch(source: &NewsSource, ctx: &FetchContext) -> FetchResult<Vec<Candidate>> {
    let body = ctx
        .http
        .get(&source.url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let entries = parse_feed(&body)?;
    debug!(count = entries.len(), "Parsed feed entries");

    let mut candidates = Vec::new();
    for (title, link, published) in entries {
        let (Some(title), Some(link)) = (title, link) else {
            continue;
        };
        if source.filter_relevance && !is_relevant(&title, &ctx.keywords) {
            continue;
        }
        let date = display_date_or_now(published.as_deref(), &source.name);
        if let Some(candidate) = Candidate::new(&title, link.trim(), date, &source.name) {
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}

type FeedEntry = (Option<String>, Option<String>, Option<String>);

/// Decode a feed body as RSS 2.0, then as Atom.
fn parse_feed(body: &str) -> FetchResult<Vec<FeedEntry>> {
    if let Ok(rss) = quick_xml::de::from_str::<Rss>(body) {
        return Ok(rss
            .channel
            .items
            .into_iter()
            .map(|item| (item.title, item.link, item.pub_date))
            .collect());
    }
    match quick_xml::de::from_str::<AtomFeed>(body) {
        Ok(feed) => Ok(feed
            .entries
            .into_iter()
            .map(|entry| {
                let title = entry.title.and_then(|t| t.value);
                let link = entry.links.into_iter().find_map(|l| l.href);
                let published = entry.published.or(entry.updated);
                (title, link, published)
            })
            .collect()),
        Err(e) => Err(FetchError::Parse(format!("not RSS or Atom: {e}"))),
    }
}
