//! JSON news-API retrieval.
//!
//! News APIs disagree on everything except being JSON. The response is
//! probed against a fixed, ordered list of well-known envelope shapes to
//! find the item array, and each item's fields are read through a small
//! set of accepted aliases.

use crate::config::NewsSource;
use crate::error::{FetchError, FetchResult};
use crate::fetch::FetchContext;
use crate::models::Candidate;
use crate::relevance::is_relevant;
use crate::utils::display_date_or_now;
use serde_json::Value;
use tracing::{debug, instrument};

/// Envelope keys probed in order for the article array.
const ENVELOPE_KEYS: &[&str] = &["articles", "data", "items", "results"];

const TITLE_ALIASES: &[&str] = &["title", "headline", "name"];
const LINK_ALIASES: &[&str] = &["url", "link", "href"];
const DATE_ALIASES: &[&str] = &["publishedAt", "published_date", "date"];

/// Fetch a JSON API endpoint and map its items into candidates.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch(source: &NewsSource, ctx: &FetchContext) -> FetchResult<Vec<Candidate>> {
    let body = ctx
        .http
        .get(&source.url)
        .header("Accept", "application/json")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let value: Value =
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(format!("invalid JSON: {e}")))?;
    let items = locate_items(&value)
        .ok_or_else(|| FetchError::Parse("no recognized item array in response".to_string()))?;
    debug!(count = items.len(), "Located API item array");

    let mut candidates = Vec::new();
    for item in items {
        let Some(candidate) = map_item(item, source, &ctx.keywords) else {
            continue;
        };
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Probe the fixed envelope shapes: top-level keys first, then the nested
/// `response.docs` layout some archives use.
fn locate_items(value: &Value) -> Option<&Vec<Value>> {
    for key in ENVELOPE_KEYS {
        if let Some(items) = value.get(key).and_then(Value::as_array) {
            return Some(items);
        }
    }
    value
        .get("response")
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
}

fn first_string<'a>(item: &'a Value, aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|key| item.get(*key).and_then(Value::as_str))
}

fn map_item(item: &Value, source: &NewsSource, keywords: &[String]) -> Option<Candidate> {
    let title = first_string(item, TITLE_ALIASES)?;
    let link = first_string(item, LINK_ALIASES)?;
    if source.filter_relevance && !is_relevant(title, keywords) {
        return None;
    }
    let date = display_date_or_now(first_string(item, DATE_ALIASES), &source.name);
    Candidate::new(title, link, date, &source.name)
}
