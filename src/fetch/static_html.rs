//! Static-HTML retrieval: plain HTTP GET plus the extraction cascade.

use crate::config::NewsSource;
use crate::error::FetchResult;
use crate::fetch::extract::{extract_links, resolve_link};
use crate::fetch::FetchContext;
use crate::models::Candidate;
use crate::relevance::is_relevant;
use crate::utils::display_date_now;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

/// Fetch a listing page over plain HTTP and extract headline candidates.
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
    debug!(bytes = body.len(), "Fetched listing page");

    Ok(candidates_from_html(&body, source, &ctx.keywords))
}

/// Parse a page body and turn extracted links into well-formed candidates.
///
/// Shared with the rendered strategy, which produces the same HTML through
/// a browser. The parse itself cannot fail: a page that matches nothing
/// simply yields an empty batch.
pub fn candidates_from_html(body: &str, source: &NewsSource, keywords: &[String]) -> Vec<Candidate> {
    let Ok(base) = Url::parse(&source.url) else {
        return Vec::new();
    };
    let doc = Html::parse_document(body);
    let links = extract_links(&doc, &source.rules, keywords);

    let mut candidates = Vec::new();
    for link in links {
        let Some(resolved) = resolve_link(&base, &link.href) else {
            continue;
        };
        if source.filter_relevance && !is_relevant(&link.title, keywords) {
            continue;
        }
        if let Some(candidate) =
            Candidate::new(&link.title, &resolved, display_date_now(), &source.name)
        {
            candidates.push(candidate);
        }
    }
    debug!(count = candidates.len(), "Extracted candidates");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractionRules, SourceKind};

    fn source(filter_relevance: bool) -> NewsSource {
        NewsSource {
            url: "https://example.com/ai".to_string(),
            name: "Example".to_string(),
            kind: SourceKind::StaticHtml,
            enabled: true,
            priority: 4,
            filter_relevance,
            rules: ExtractionRules {
                link_selectors: vec!["a.title".to_string()],
                ..ExtractionRules::default()
            },
        }
    }

    fn keywords() -> Vec<String> {
        vec!["ai".to_string(), "人工智能".to_string()]
    }

    #[test]
    fn test_relative_links_resolve_against_domain() {
        let html = r#"<a class="title" href="/articles/1">New AI model sets records</a>"#;
        let candidates = candidates_from_html(html, &source(true), &keywords());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].link, "https://example.com/articles/1");
        assert_eq!(candidates[0].source, "Example");
    }

    #[test]
    fn test_relevance_filter_applies_when_enabled() {
        let html = r#"
            <a class="title" href="/1">New AI model sets records</a>
            <a class="title" href="/2">Local bakery wins regional prize</a>
        "#;
        let candidates = candidates_from_html(html, &source(true), &keywords());
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].title.contains("AI"));
    }

    #[test]
    fn test_relevance_filter_skipped_when_disabled() {
        let html = r#"
            <a class="title" href="/1">New AI model sets records</a>
            <a class="title" href="/2">Local bakery wins regional prize</a>
        "#;
        let candidates = candidates_from_html(html, &source(false), &keywords());
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_unparseable_page_yields_empty_not_error() {
        let candidates = candidates_from_html("% not html at all %", &source(true), &keywords());
        assert!(candidates.is_empty());
    }
}
