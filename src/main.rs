//! # AI Daily News
//!
//! A daily news-digest pipeline: scrape AI-related headlines from a
//! configured mix of websites, feeds and JSON APIs, reduce them to a
//! bounded, priority-ranked selection, summarize the selection with an
//! LLM, and deliver the result as a card message to chat webhooks.
//!
//! ## Architecture
//!
//! One run flows through four stages:
//! 1. **Fetch**: each enabled source is retrieved by its configured
//!    strategy (static HTML, rendered HTML, RSS/Atom, JSON API)
//! 2. **Shape**: relevance filtering, per-source caps, title dedup and
//!    priority-quota selection produce the digest
//! 3. **Summarize**: an OpenAI-compatible chat API condenses the digest
//! 4. **Deliver**: the card is posted to every enabled webhook
//!
//! Every stage degrades rather than aborts: a dead source means fewer
//! articles, a dead LLM means a sentinel summary, a dead webhook means
//! delivery through the remaining ones.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod notify;
mod pipeline;
mod relevance;
mod utils;

use cli::Cli;
use config::AppConfig;
use fetch::SourceFetcher;
use models::Digest;
use utils::truncate_for_log;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ai_daily_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.digest_json, dry_run = args.dry_run, "Parsed CLI arguments");

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(provider) = args.provider.clone() {
        config.current_provider = provider;
    }
    info!(
        sources = config.sources.len(),
        webhooks = config.webhooks.len(),
        provider = %config.current_provider,
        "Configuration ready"
    );

    // ---- Aggregate ----
    let fetcher = SourceFetcher::new(&config)?;
    let articles = pipeline::run(&fetcher, &config).await;

    let mut digest = Digest {
        local_date: Local::now().date_naive().to_string(),
        local_time: Local::now().time().to_string(),
        articles,
        summary: String::new(),
    };

    if digest.articles.is_empty() {
        warn!("Aggregation produced no articles; skipping summarization and delivery");
        write_digest_json(&args, &digest).await;
        info!(elapsed = ?start_time.elapsed(), "Execution complete");
        return Ok(());
    }

    info!(count = digest.articles.len(), "Digest assembled");
    for (index, article) in digest.articles.iter().enumerate() {
        debug!(
            index,
            priority = article.priority,
            source = %article.source,
            title = %truncate_for_log(&article.title, 80),
            "Selected article"
        );
    }

    if args.dry_run {
        info!("Dry run: skipping summarization and delivery");
        write_digest_json(&args, &digest).await;
        info!(elapsed = ?start_time.elapsed(), "Execution complete");
        return Ok(());
    }

    // ---- Summarize ----
    digest.summary = api::summarize_news(&config, &digest.articles).await;
    info!(preview = %truncate_for_log(&digest.summary, 200), "Summary ready");

    // ---- Deliver ----
    if notify::deliver(&config, &digest).await {
        info!("Digest delivered");
    } else {
        warn!("Digest was not delivered to any webhook");
    }

    write_digest_json(&args, &digest).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Optionally persist the digest as JSON for inspection or downstream use.
async fn write_digest_json(args: &Cli, digest: &Digest) {
    let Some(path) = &args.digest_json else {
        return;
    };
    match serde_json::to_string_pretty(digest) {
        Ok(json) => {
            if let Err(e) = tokio::fs::write(path, json).await {
                error!(path = %path, error = %e, "Failed writing digest JSON");
            } else {
                info!(path = %path, "Wrote digest JSON");
            }
        }
        Err(e) => error!(error = %e, "Failed serializing digest"),
    }
}
