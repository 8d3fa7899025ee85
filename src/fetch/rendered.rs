//! Rendered-HTML retrieval through a headless browser.
//!
//! Some listing pages assemble their content with JavaScript, so a plain
//! GET returns an empty shell. This strategy drives a headless Chromium
//! instance, waits for the source's content marker (falling back to
//! whatever has rendered when the marker never shows), then hands the
//! resulting HTML to the same extraction cascade as the static strategy.
//!
//! The browser instance is owned by a single fetch call and released on
//! every exit path; nothing is shared between sources.

use crate::config::NewsSource;
use crate::error::{FetchError, FetchResult};
use crate::fetch::static_html::candidates_from_html;
use crate::fetch::FetchContext;
use crate::models::Candidate;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Render a listing page in a headless browser and extract candidates.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch(source: &NewsSource, ctx: &FetchContext) -> FetchResult<Vec<Candidate>> {
    let timeout = Duration::from_secs(ctx.browser_timeout_secs);

    let config = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .request_timeout(timeout)
        .build()
        .map_err(FetchError::Browser)?;

    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?;
    let events = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    // Render inside its own scope so the browser is torn down on success
    // and on failure alike.
    let rendered = render_page(&browser, source, timeout).await;

    if let Err(e) = browser.close().await {
        debug!(error = %e, "Browser close reported an error");
    }
    let _ = browser.wait().await;
    events.abort();

    let body = rendered?;
    debug!(bytes = body.len(), "Rendered listing page");
    Ok(candidates_from_html(&body, source, &ctx.keywords))
}

async fn render_page(browser: &Browser, source: &NewsSource, timeout: Duration) -> FetchResult<String> {
    let page = browser
        .new_page(source.url.as_str())
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?;

    match source.rules.content_marker.as_deref() {
        Some(marker) => {
            if !wait_for_marker(&page, marker, timeout).await {
                warn!(marker, "Content marker never appeared; using rendered state as-is");
                let _ = page.wait_for_navigation().await;
            }
        }
        None => {
            let _ = page.wait_for_navigation().await;
        }
    }

    let html = page
        .content()
        .await
        .map_err(|e| FetchError::Browser(e.to_string()));
    let _ = page.close().await;
    html
}

/// Poll for a CSS marker until it appears or the timeout elapses.
async fn wait_for_marker(page: &Page, selector: &str, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(MARKER_POLL_INTERVAL).await;
    }
}
