//! Topical relevance filtering for scraped headlines.
//!
//! A cheap substring check: a title is relevant when it contains any
//! configured keyword, matched case-insensitively, with both the Chinese
//! and English term sets in play. Very short titles are rejected outright
//! since they carry too little signal to classify.

use crate::models::MIN_TITLE_CHARS;

/// Decide whether a headline is on-topic.
///
/// `keywords` are expected to be pre-lowercased (the config loader does
/// this once per run).
pub fn is_relevant(title: &str, keywords: &[String]) -> bool {
    let title = title.trim();
    if title.chars().count() < MIN_TITLE_CHARS {
        return false;
    }
    let lowered = title.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k.as_str()))
}
