//! Headline extraction from HTML documents.
//!
//! Third-party markup changes without notice, so extraction is a cascade of
//! progressively looser heuristics driven by per-source [`ExtractionRules`]:
//!
//! 1. configured CSS selectors, most specific first
//! 2. heading tags carrying a title-like class
//! 3. anchors whose href looks like an article path
//! 4. any anchor whose text mentions a relevance keyword
//!
//! The cascade stops at the first stage that yields enough items. This is
//! deliberately best-effort: precision is traded for resilience, and the
//! worst outcome is an empty batch, never an error.

use crate::config::ExtractionRules;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// A cascade stage that finds at least this many items ends the cascade.
pub const MIN_ITEMS_THRESHOLD: usize = 5;

/// Anchor text shorter than this is ignored by the keyword-scan stage.
const KEYWORD_SCAN_MIN_CHARS: usize = 10;

/// Selectors used when a source configures none of its own.
const FALLBACK_LINK_SELECTORS: &[&str] =
    &["a.title", "a.article-title", "a.entry-title", "a.post-title"];

/// A title/href pair pulled out of a page, href not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub title: String,
    pub href: String,
}

static ANY_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4").unwrap());
static TITLE_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)title|heading|headline").unwrap());
static ARTICLE_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"articles|news|post|reference").unwrap());

/// Run the extraction cascade over a parsed document.
pub fn extract_links(doc: &Html, rules: &ExtractionRules, keywords: &[String]) -> Vec<ExtractedLink> {
    let mut found: Vec<ExtractedLink> = Vec::new();
    let mut seen_hrefs = std::collections::HashSet::new();
    let mut push = |title: String, href: String, found: &mut Vec<ExtractedLink>| {
        if !title.is_empty() && !href.is_empty() && seen_hrefs.insert(href.clone()) {
            found.push(ExtractedLink { title, href });
        }
    };

    // Stage 1: configured selectors.
    let configured: Vec<&str> = if rules.link_selectors.is_empty() {
        FALLBACK_LINK_SELECTORS.to_vec()
    } else {
        rules.link_selectors.iter().map(String::as_str).collect()
    };
    for raw in configured {
        let Ok(selector) = Selector::parse(raw) else {
            warn!(selector = raw, "Invalid CSS selector in extraction rules; skipping");
            continue;
        };
        for element in doc.select(&selector) {
            if let Some((title, href)) = anchor_parts(element) {
                push(title, href, &mut found);
            }
        }
    }
    if found.len() >= MIN_ITEMS_THRESHOLD {
        debug!(count = found.len(), stage = "selectors", "Extraction cascade satisfied");
        return found;
    }

    // Stage 2: headings with a title-like class, taking their nested link.
    if rules.heading_scan {
        for heading in doc.select(&HEADINGS) {
            let classes = heading.value().attr("class").unwrap_or("");
            if !TITLE_CLASS.is_match(classes) {
                continue;
            }
            if let Some(anchor) = heading.select(&ANY_ANCHOR).next() {
                if let Some((title, href)) = anchor_parts(anchor) {
                    push(title, href, &mut found);
                }
            }
        }
        if found.len() >= MIN_ITEMS_THRESHOLD {
            debug!(count = found.len(), stage = "headings", "Extraction cascade satisfied");
            return found;
        }
    }

    // Stage 3: anchors whose href looks like an article path.
    if rules.href_pattern_scan {
        for anchor in doc.select(&ANY_ANCHOR) {
            let href = anchor.value().attr("href").unwrap_or("");
            if !ARTICLE_HREF.is_match(href) {
                continue;
            }
            if let Some((title, href)) = anchor_parts(anchor) {
                push(title, href, &mut found);
            }
        }
        if found.len() >= MIN_ITEMS_THRESHOLD {
            debug!(count = found.len(), stage = "href-pattern", "Extraction cascade satisfied");
            return found;
        }
    }

    // Stage 4: free-text keyword scan over every link on the page.
    if rules.keyword_scan {
        for anchor in doc.select(&ANY_ANCHOR) {
            let Some((title, href)) = anchor_parts(anchor) else {
                continue;
            };
            if title.chars().count() <= KEYWORD_SCAN_MIN_CHARS {
                continue;
            }
            let lowered = title.to_lowercase();
            if keywords.iter().any(|k| lowered.contains(k.as_str())) {
                push(title, href, &mut found);
            }
        }
    }

    debug!(count = found.len(), "Extraction cascade exhausted");
    found
}

/// Resolve an href against the source's own domain.
///
/// Absolute links pass through untouched; relative links (with or without a
/// leading slash) are joined against the origin, not the page path.
pub fn resolve_link(source_url: &Url, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let mut origin = source_url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin.join(href).ok().map(|u| u.to_string())
}

/// Pull normalized text and href out of an element, descending to the first
/// nested anchor when the element is a container rather than a link itself.
fn anchor_parts(element: ElementRef) -> Option<(String, String)> {
    let anchor = if element.value().name() == "a" {
        element
    } else {
        element.select(&ANY_ANCHOR).next()?
    };
    let href = anchor.value().attr("href")?.trim().to_string();
    let title = anchor
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some((title, href))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_with(selectors: &[&str]) -> ExtractionRules {
        ExtractionRules {
            link_selectors: selectors.iter().map(|s| s.to_string()).collect(),
            ..ExtractionRules::default()
        }
    }

    fn keywords() -> Vec<String> {
        vec!["ai".to_string(), "人工智能".to_string()]
    }

    #[test]
    fn test_configured_selector_stage_wins() {
        let html = r#"
            <body>
              <a class="item-title" href="/a1">First headline about models</a>
              <a class="item-title" href="/a2">Second headline about agents</a>
              <a class="item-title" href="/a3">Third headline about chips</a>
              <a class="item-title" href="/a4">Fourth headline about labs</a>
              <a class="item-title" href="/a5">Fifth headline about funding</a>
              <a href="/unrelated">Completely unrelated footer link text</a>
            </body>"#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &rules_with(&["a.item-title"]), &keywords());
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].href, "/a1");
        assert_eq!(links[0].title, "First headline about models");
    }

    #[test]
    fn test_container_selector_descends_to_anchor() {
        let html = r#"
            <div class="post"><span>noise</span><a href="/p1">Story inside a container</a></div>
        "#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &rules_with(&["div.post"]), &keywords());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/p1");
        assert_eq!(links[0].title, "Story inside a container");
    }

    #[test]
    fn test_heading_stage_fallback() {
        let html = r#"
            <h2 class="entry-headline"><a href="/h1">Headline under a heading tag</a></h2>
            <h2 class="sidebar">no link here</h2>
        "#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &rules_with(&["a.never-matches"]), &keywords());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/h1");
    }

    #[test]
    fn test_href_pattern_fallback() {
        let html = r#"
            <a href="/news/2025/story-one">A news path link</a>
            <a href="/about">About us</a>
        "#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &rules_with(&["a.never-matches"]), &keywords());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/news/2025/story-one");
    }

    #[test]
    fn test_keyword_scan_last_resort() {
        let html = r#"
            <a href="/x1">Breakthrough in AI reasoning systems</a>
            <a href="/x2">人工智能行业迎来新一轮投资热潮</a>
            <a href="/x3">short</a>
            <a href="/x4">Weather forecast for the coming weekend</a>
        "#;
        let doc = Html::parse_document(html);
        let mut rules = rules_with(&["a.never-matches"]);
        rules.href_pattern_scan = false;
        rules.heading_scan = false;
        let links = extract_links(&doc, &rules, &keywords());
        assert_eq!(links.len(), 2);
        assert!(links.iter().any(|l| l.href == "/x1"));
        assert!(links.iter().any(|l| l.href == "/x2"));
    }

    #[test]
    fn test_duplicate_hrefs_collapse_within_page() {
        let html = r#"
            <a class="title" href="/dup">Same story linked twice on the page</a>
            <a class="entry-title" href="/dup">Same story linked twice on the page</a>
        "#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &rules_with(&["a.title", "a.entry-title"]), &keywords());
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let html = r#"<a class="title" href="/ok">A perfectly good headline</a>"#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &rules_with(&["!!!", "a.title"]), &keywords());
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_resolve_link_variants() {
        let base = Url::parse("https://www.leiphone.com/category/ai").unwrap();
        assert_eq!(
            resolve_link(&base, "https://other.com/x").as_deref(),
            Some("https://other.com/x")
        );
        // Leading-slash and bare relative links both resolve against the
        // domain, not the page path.
        assert_eq!(
            resolve_link(&base, "/news/1.html").as_deref(),
            Some("https://www.leiphone.com/news/1.html")
        );
        assert_eq!(
            resolve_link(&base, "news/1.html").as_deref(),
            Some("https://www.leiphone.com/news/1.html")
        );
    }
}
