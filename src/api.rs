//! LLM summarization with exponential backoff retry logic.
//!
//! The digest is summarized through an OpenAI-compatible chat-completions
//! endpoint. Providers (endpoint, model, key) come from configuration, so
//! swapping vendors is a config change. Transient API failures are retried
//! with exponential backoff and jitter; when every attempt fails the
//! caller receives a fixed sentinel string rather than an error, because a
//! missing summary must never sink the delivery of the digest itself.

use crate::config::{AppConfig, ModelProvider};
use crate::models::RankedArticle;
use itertools::Itertools;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Returned in place of a summary when the LLM cannot be reached.
pub const SUMMARY_FAILURE: &str = "无法生成摘要。";

/// Trait for async LLM interaction, so retry behavior can wrap any client.
pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Decorator adding exponential backoff with jitter to an [`AskAsync`].
///
/// Delay follows `min(base * 2^(attempt-1), max) + jitter(0..250ms)`.
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// A single-provider chat-completions client.
#[derive(Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ChatClient {
    /// Build a client from a configured provider. Fails when the provider's
    /// API-key environment variable is unset or empty.
    pub fn from_provider(provider: &ModelProvider) -> Result<Self, Box<dyn Error>> {
        let api_key = std::env::var(&provider.api_key_env).unwrap_or_default();
        if api_key.is_empty() {
            return Err(format!(
                "provider {} has no API key in ${}",
                provider.name, provider.api_key_env
            )
            .into());
        }
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", provider.base_url.trim_end_matches('/')),
            api_key,
            model: provider.model.clone(),
            max_tokens: provider.max_tokens,
        })
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: text,
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or("chat response contained no choices")?;
        Ok(content)
    }
}

/// Render the article list into the summarization prompt.
pub fn digest_prompt(articles: &[RankedArticle]) -> String {
    let lines = articles
        .iter()
        .map(|a| format!("标题: {} (来源: {}, 日期: {})", a.title, a.source, a.date))
        .join("\n");
    format!("请总结以下AI新闻，提取关键信息和趋势:\n{lines}")
}

/// Summarize the digest with the configured provider.
///
/// Always returns usable text: on any failure (no provider, missing key,
/// retries exhausted) the [`SUMMARY_FAILURE`] sentinel is returned and the
/// problem is logged.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn summarize_news(config: &AppConfig, articles: &[RankedArticle]) -> String {
    let Some(provider) = config.current_provider() else {
        error!(name = %config.current_provider, "No enabled model provider with that name");
        return SUMMARY_FAILURE.to_string();
    };
    info!(provider = %provider.name, model = %provider.model, "Summarizing digest");

    let client = match ChatClient::from_provider(provider) {
        Ok(client) => client,
        Err(e) => {
            error!(provider = %provider.name, error = %e, "Cannot build chat client");
            return SUMMARY_FAILURE.to_string();
        }
    };

    let api = RetryAsk::new(client, 5, StdDuration::from_secs(1));
    match api.ask(&digest_prompt(articles)).await {
        Ok(summary) => summary.trim().to_string(),
        Err(e) => {
            error!(provider = %provider.name, error = %e, "Summarization failed");
            SUMMARY_FAILURE.to_string()
        }
    }
}
