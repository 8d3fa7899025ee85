//! Digest delivery to chat webhooks.
//!
//! The assembled card is POSTed to every enabled webhook endpoint. Sends
//! fan out concurrently with a bounded limit; one endpoint failing (or
//! all but one) does not fail the run — delivery counts as successful
//! when at least one endpoint accepted the card.

pub mod card;

use crate::config::AppConfig;
use crate::models::Digest;
use chrono::Local;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Upper bound on concurrent webhook posts.
const WEBHOOK_CONCURRENCY: usize = 5;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct DeliveryOutcome {
    name: String,
    ok: bool,
}

/// Send the digest card to all enabled webhooks.
///
/// Returns `true` when at least one endpoint accepted the message.
#[instrument(level = "info", skip_all)]
pub async fn deliver(config: &AppConfig, digest: &Digest) -> bool {
    let webhooks = config.enabled_webhooks();
    if webhooks.is_empty() {
        error!("No enabled webhook endpoints configured");
        return false;
    }

    let date_label = Local::now().format("%Y年%m月%d日").to_string();
    let payload = card::build_card(&digest.summary, &digest.articles, &date_label);

    let client = match reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Cannot build webhook HTTP client");
            return false;
        }
    };

    info!(count = webhooks.len(), "Delivering digest card");
    let limit = WEBHOOK_CONCURRENCY.min(webhooks.len());
    let outcomes: Vec<DeliveryOutcome> = stream::iter(webhooks)
        .map(|webhook| {
            let client = client.clone();
            let payload = payload.clone();
            async move {
                match post_card(&client, &webhook.url, &payload).await {
                    Ok(()) => {
                        info!(webhook = %webhook.name, "Delivered");
                        DeliveryOutcome { name: webhook.name.clone(), ok: true }
                    }
                    Err(e) => {
                        error!(webhook = %webhook.name, error = %e, "Delivery failed");
                        DeliveryOutcome { name: webhook.name.clone(), ok: false }
                    }
                }
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    let delivered = outcomes.iter().filter(|o| o.ok).count();
    let failed: Vec<&str> =
        outcomes.iter().filter(|o| !o.ok).map(|o| o.name.as_str()).collect();
    info!(delivered, failed = failed.len(), "Webhook delivery finished");
    if !failed.is_empty() {
        error!(endpoints = ?failed, "Some webhook endpoints did not accept the card");
    }
    delivered > 0
}

async fn post_card(client: &reqwest::Client, url: &str, payload: &Value) -> Result<(), reqwest::Error> {
    client
        .post(url)
        .json(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
