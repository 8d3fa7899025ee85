//! The aggregation pipeline: merge, dedupe and select.
//!
//! One run flows through three stages:
//!
//! 1. **Aggregate** — fetch every enabled source in descending priority
//!    order, cap each source's contribution, and tag survivors with their
//!    source's priority. Fetches run concurrently up to a bounded limit,
//!    but the merge preserves priority-then-configuration order, so a run
//!    is reproducible regardless of which network call finishes first.
//! 2. **Dedupe** — the same story is often carried by several outlets;
//!    exact trimmed-title matching removes the repeats cheaply, keeping
//!    the first occurrence. Near-duplicate titles are accepted misses.
//! 3. **Select** — per-priority-tier quotas plus a total cap produce the
//!    final bounded digest.

use crate::config::{AppConfig, Caps, NewsSource};
use crate::fetch::SourceFetcher;
use crate::models::{Candidate, RankedArticle};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tracing::{debug, info, instrument};

/// Dedup keys of at most this many characters are treated as noise and
/// dropped rather than trusted as identity.
pub const MIN_DEDUP_KEY_CHARS: usize = 10;

/// Execute the full pipeline against live sources.
#[instrument(level = "info", skip_all)]
pub async fn run(fetcher: &SourceFetcher, config: &AppConfig) -> Vec<RankedArticle> {
    let merged = aggregate_with(
        &config.sources,
        config.caps.per_source,
        config.fetch_concurrency,
        |source| async move { fetcher.fetch(&source).await },
    )
    .await;
    info!(count = merged.len(), "Merged candidates across sources");

    let unique = dedupe(merged);
    info!(count = unique.len(), "Candidates after title dedup");

    let selected = select(unique, &config.caps);
    info!(count = selected.len(), "Final selection");
    selected
}

/// Fetch all enabled sources through `fetch`, in descending priority order,
/// applying the per-source cap and priority tagging.
///
/// Generic over the fetch function so the merge logic is testable without
/// touching the network. `fetch` receives each source exactly once; a
/// source that fails inside the fetcher shows up here as an empty batch.
pub async fn aggregate_with<F, Fut>(
    sources: &[NewsSource],
    per_source_cap: usize,
    concurrency: usize,
    fetch: F,
) -> Vec<RankedArticle>
where
    F: Fn(NewsSource) -> Fut,
    Fut: Future<Output = Vec<Candidate>>,
{
    let mut enabled: Vec<NewsSource> = sources.iter().filter(|s| s.enabled).cloned().collect();
    // Stable sort: sources of equal priority keep their configured order.
    enabled.sort_by(|a, b| b.priority.cmp(&a.priority));
    info!(enabled = enabled.len(), "Aggregating sources in priority order");

    let batches: Vec<Vec<RankedArticle>> = stream::iter(enabled)
        .map(|source| {
            let priority = source.priority;
            let name = source.name.clone();
            let fut = fetch(source);
            async move {
                let candidates = fut.await;
                let batch: Vec<RankedArticle> = candidates
                    .into_iter()
                    .take(per_source_cap)
                    .map(|c| RankedArticle::from_candidate(c, priority))
                    .collect();
                debug!(source = %name, kept = batch.len(), "Source batch ranked");
                batch
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    batches.into_iter().flatten().collect()
}

/// Remove repeated stories by trimmed title, preserving first-seen order.
///
/// Keys of [`MIN_DEDUP_KEY_CHARS`] characters or fewer are dropped
/// outright: titles that short are not reliable identity.
pub fn dedupe(articles: Vec<RankedArticle>) -> Vec<RankedArticle> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();
    for article in articles {
        let key = article.title.trim().to_string();
        if key.chars().count() <= MIN_DEDUP_KEY_CHARS {
            continue;
        }
        if seen.insert(key) {
            unique.push(article);
        }
    }
    unique
}

/// Apply per-priority-tier quotas and the total cap.
///
/// The input is re-sorted by descending priority (stable, so order within
/// a tier is preserved), then walked with running per-tier counts; the
/// walk stops as soon as the total cap is reached.
pub fn select(mut articles: Vec<RankedArticle>, caps: &Caps) -> Vec<RankedArticle> {
    articles.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut admitted = Vec::new();
    let mut per_tier: HashMap<u8, usize> = HashMap::new();
    for article in articles {
        let count = per_tier.entry(article.priority).or_insert(0);
        if *count < caps.priority_cap(article.priority) {
            *count += 1;
            admitted.push(article);
        }
        if admitted.len() >= caps.total {
            break;
        }
    }
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionRules;
    use crate::config::SourceKind;
    use std::cell::RefCell;
    use std::future::ready;

    fn source(name: &str, priority: u8, enabled: bool) -> NewsSource {
        NewsSource {
            url: format!("https://{name}.example.com"),
            name: name.to_string(),
            kind: SourceKind::StaticHtml,
            enabled,
            priority,
            filter_relevance: true,
            rules: ExtractionRules::default(),
        }
    }

    fn candidate(title: &str, source: &str) -> Candidate {
        Candidate::new(
            title,
            &format!("https://example.com/{}", title.len()),
            "05月06日".to_string(),
            source,
        )
        .unwrap()
    }

    fn ranked(title: &str, priority: u8) -> RankedArticle {
        RankedArticle::from_candidate(candidate(title, "test"), priority)
    }

    #[tokio::test]
    async fn test_disabled_sources_are_never_fetched() {
        let sources = vec![source("on", 4, true), source("off", 5, false)];
        let calls = RefCell::new(Vec::new());
        let result = aggregate_with(&sources, 10, 2, |s| {
            calls.borrow_mut().push(s.name.clone());
            ready(vec![candidate("A perfectly fine headline", &s.name)])
        })
        .await;

        assert_eq!(*calls.borrow(), vec!["on".to_string()]);
        assert!(result.iter().all(|a| a.source == "on"));
    }

    #[tokio::test]
    async fn test_priority_order_is_stable() {
        // Two priority-3 sources keep their configured relative order.
        let sources = vec![
            source("low", 1, true),
            source("first3", 3, true),
            source("top", 5, true),
            source("second3", 3, true),
        ];
        let calls = RefCell::new(Vec::new());
        aggregate_with(&sources, 10, 2, |s| {
            calls.borrow_mut().push(s.name.clone());
            ready(Vec::new())
        })
        .await;

        assert_eq!(
            *calls.borrow(),
            vec!["top".to_string(), "first3".to_string(), "second3".to_string(), "low".to_string()]
        );
    }

    #[tokio::test]
    async fn test_per_source_cap_truncates() {
        let sources = vec![source("busy", 4, true)];
        let result = aggregate_with(&sources, 10, 1, |s| {
            let batch: Vec<Candidate> = (0..12)
                .map(|i| candidate(&format!("Busy source headline number {i}"), &s.name))
                .collect();
            ready(batch)
        })
        .await;

        assert_eq!(result.len(), 10);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_others() {
        let sources = vec![source("broken", 5, true), source("healthy", 3, true)];
        let result = aggregate_with(&sources, 10, 2, |s| {
            let batch = if s.name == "broken" {
                Vec::new()
            } else {
                vec![candidate("Healthy source still delivers news", &s.name)]
            };
            ready(batch)
        })
        .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source, "healthy");
    }

    #[tokio::test]
    async fn test_articles_inherit_source_priority() {
        let sources = vec![source("top", 5, true)];
        let result = aggregate_with(&sources, 10, 1, |s| {
            ready(vec![candidate("A headline from the top source", &s.name)])
        })
        .await;

        assert_eq!(result[0].priority, 5);
    }

    #[tokio::test]
    async fn test_merge_order_is_deterministic_under_concurrency() {
        let sources: Vec<NewsSource> =
            (0..6).map(|i| source(&format!("s{i}"), 5 - (i as u8 % 5), true)).collect();
        let fetch = |s: NewsSource| {
            ready(vec![candidate(&format!("Headline from source {}", s.name), &s.name)])
        };
        let serial = aggregate_with(&sources, 10, 1, fetch).await;
        let concurrent = aggregate_with(&sources, 10, 4, fetch).await;
        assert_eq!(serial, concurrent);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let articles = vec![
            ranked("The same story twice over", 5),
            ranked("A different story entirely", 3),
            ranked("The same story twice over", 1),
        ];
        let unique = dedupe(articles);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].priority, 5);
    }

    #[test]
    fn test_dedupe_drops_short_titles_even_if_unique() {
        let articles = vec![ranked("short one", 5), ranked("A sufficiently long headline", 3)];
        let unique = dedupe(articles);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].title, "A sufficiently long headline");
    }

    #[test]
    fn test_dedupe_boundary_is_chars_not_bytes() {
        // Eleven CJK characters pass the > 10 character rule despite being
        // 33 bytes.
        let articles = vec![ranked("人工智能新闻标题十一字", 4)];
        assert_eq!(dedupe(articles).len(), 1);
        // Exactly ten characters is dropped.
        let articles = vec![ranked("人工智能新闻标题十字", 4)];
        assert!(dedupe(articles).is_empty());
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let articles = vec![
            ranked("The same story twice over", 5),
            ranked("The same story twice over", 4),
            ranked("A different story entirely", 3),
        ];
        let once = dedupe(articles);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_select_respects_tier_quotas() {
        let caps = Caps::default();
        let mut articles = Vec::new();
        for i in 0..20 {
            articles.push(ranked(&format!("Priority five headline number {i}"), 5));
        }
        for i in 0..20 {
            articles.push(ranked(&format!("Priority two headline number {i}"), 2));
        }
        let selected = select(articles, &caps);

        let fives = selected.iter().filter(|a| a.priority == 5).count();
        let twos = selected.iter().filter(|a| a.priority == 2).count();
        assert_eq!(fives, 8);
        assert_eq!(twos, 2);
    }

    #[test]
    fn test_select_respects_total_cap() {
        let caps = Caps {
            per_source: 10,
            total: 30,
            per_priority: [(5u8, 100usize)].into_iter().collect(),
        };
        let articles: Vec<RankedArticle> = (0..40)
            .map(|i| ranked(&format!("Priority five headline number {i}"), 5))
            .collect();
        let selected = select(articles, &caps);
        assert_eq!(selected.len(), 30);
    }

    #[test]
    fn test_select_orders_by_priority_stable_within_tier() {
        let articles = vec![
            ranked("Low priority story arrives first", 1),
            ranked("High priority story arrives later", 5),
            ranked("Another high priority story after it", 5),
        ];
        let selected = select(articles, &Caps::default());
        assert_eq!(selected[0].title, "High priority story arrives later");
        assert_eq!(selected[1].title, "Another high priority story after it");
        assert_eq!(selected[2].priority, 1);
    }

    #[tokio::test]
    async fn test_two_sources_end_to_end_ordering() {
        let sources = vec![source("minor", 1, true), source("major", 5, true)];
        let merged = aggregate_with(&sources, 10, 2, |s| {
            let title = if s.name == "major" {
                "Major outlet covers the big launch"
            } else {
                "Minor outlet adds a footnote story"
            };
            ready(vec![candidate(title, &s.name)])
        })
        .await;
        let selected = select(dedupe(merged), &Caps::default());

        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].source, "major");
        assert_eq!(selected[1].source, "minor");
    }
}
