//! Data models for scraped news items and the assembled daily digest.
//!
//! Items move through three shapes during a run:
//! - [`Candidate`]: a raw title/link pair produced by a source fetcher
//! - [`RankedArticle`]: a candidate tagged with its source's priority after
//!   filtering and per-source capping
//! - [`Digest`]: the final bounded selection plus the generated summary

use serde::{Deserialize, Serialize};

/// Minimum number of characters a usable title must have.
pub const MIN_TITLE_CHARS: usize = 5;

/// A single scraped item before filtering and ranking.
///
/// Invariants, enforced by [`Candidate::new`]: the trimmed title has at
/// least [`MIN_TITLE_CHARS`] characters and the link is a non-empty
/// absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Headline text, trimmed.
    pub title: String,
    /// Absolute URL of the story.
    pub link: String,
    /// Best-effort publication date in display form (e.g. `05月06日`).
    pub date: String,
    /// Name of the originating source.
    pub source: String,
}

impl Candidate {
    /// Build a candidate, returning `None` when the title is too short or
    /// the link is missing or relative.
    pub fn new(title: &str, link: &str, date: String, source: &str) -> Option<Self> {
        let title = title.trim();
        if title.chars().count() < MIN_TITLE_CHARS {
            return None;
        }
        if !link.starts_with("http://") && !link.starts_with("https://") {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            link: link.to_string(),
            date,
            source: source.to_string(),
        })
    }
}

/// A candidate that survived filtering, carrying its source's priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedArticle {
    pub title: String,
    pub link: String,
    pub date: String,
    pub source: String,
    /// Priority tier inherited from the source configuration, 1-5.
    pub priority: u8,
}

impl RankedArticle {
    pub fn from_candidate(candidate: Candidate, priority: u8) -> Self {
        Self {
            title: candidate.title,
            link: candidate.link,
            date: candidate.date,
            source: candidate.source,
            priority,
        }
    }
}

/// The artifact of one aggregation run: selected articles plus summary.
///
/// Produced fresh on every run and handed to the notifier; nothing is
/// persisted between runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct Digest {
    /// The date of the run in `YYYY-MM-DD` form.
    pub local_date: String,
    /// The local wall-clock time the digest was assembled.
    pub local_time: String,
    /// Final priority-ordered article selection.
    pub articles: Vec<RankedArticle>,
    /// LLM-generated prose summary (or the failure sentinel).
    pub summary: String,
}
