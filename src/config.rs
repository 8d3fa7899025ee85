//! Run configuration: news sources, caps, keywords, model providers and
//! webhook endpoints.
//!
//! Configuration is immutable for the duration of a run. A YAML file can be
//! supplied with `--config`; without one the compiled-in defaults below are
//! used, so the binary works out of the box. Secrets (LLM API keys) are
//! never stored in the file — each provider names the environment variable
//! that holds its key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use tracing::{info, warn};

/// Retrieval strategy for a source. Adding a source of an existing kind is
/// a configuration change, not a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Plain HTTP GET and HTML parsing.
    StaticHtml,
    /// Headless-browser rendering before HTML parsing, for JS-heavy pages.
    RenderedHtml,
    /// RSS 2.0 or Atom feed.
    Rss,
    /// JSON news API with a well-known envelope shape.
    JsonApi,
    /// Unknown page shape: rendered like [`SourceKind::RenderedHtml`] with
    /// only the loosest extraction heuristics.
    Generic,
}

/// Ordered extraction heuristics for HTML sources.
///
/// The stages run in order and stop as soon as enough items have been
/// found; sites with stable markup only ever hit the first stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// CSS selectors tried first, most specific first (e.g. `a.body-title`).
    #[serde(default)]
    pub link_selectors: Vec<String>,
    /// Wait for this CSS selector before reading rendered pages.
    #[serde(default)]
    pub content_marker: Option<String>,
    /// Scan heading tags with title-like classes for nested links.
    #[serde(default = "default_true")]
    pub heading_scan: bool,
    /// Scan anchors whose href looks like an article path.
    #[serde(default = "default_true")]
    pub href_pattern_scan: bool,
    /// Last resort: scan every link for keyword-bearing text.
    #[serde(default = "default_true")]
    pub keyword_scan: bool,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            link_selectors: Vec::new(),
            content_marker: None,
            heading_scan: true,
            href_pattern_scan: true,
            keyword_scan: true,
        }
    }
}

impl ExtractionRules {
    fn with_selectors(selectors: &[&str]) -> Self {
        Self {
            link_selectors: selectors.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// One configured news origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSource {
    pub url: String,
    pub name: String,
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 1-5, 5 highest. Controls fetch order, ranking and per-tier quotas.
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Apply the keyword relevance filter to this source's items. Curated
    /// topic-pure sources may turn this off.
    #[serde(default = "default_true")]
    pub filter_relevance: bool,
    #[serde(default)]
    pub rules: ExtractionRules,
}

/// Output-bounding caps for the aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caps {
    /// Most items accepted from any single source.
    #[serde(default = "default_per_source")]
    pub per_source: usize,
    /// Hard ceiling on the final selection.
    #[serde(default = "default_total")]
    pub total: usize,
    /// Per-priority-tier quotas; keeps one prolific low-priority feed from
    /// crowding out hand-curated sources.
    #[serde(default = "default_per_priority")]
    pub per_priority: BTreeMap<u8, usize>,
}

impl Caps {
    /// Quota for a priority tier, with the historical default for tiers
    /// missing from the map.
    pub fn priority_cap(&self, priority: u8) -> usize {
        self.per_priority.get(&priority).copied().unwrap_or(4)
    }
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            per_source: default_per_source(),
            total: default_total(),
            per_priority: default_per_priority(),
        }
    }
}

/// An OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProvider {
    pub name: String,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A chat webhook endpoint that receives the digest card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Top-level configuration for one aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<NewsSource>,
    #[serde(default)]
    pub caps: Caps,
    /// Relevance keywords, matched case-insensitively against titles.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Timeout for plain HTTP requests, seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for browser navigation and marker waits, seconds.
    #[serde(default = "default_browser_timeout")]
    pub browser_timeout_secs: u64,
    /// How many sources may be fetched at once. Merge order stays
    /// deterministic (priority, then configuration order) regardless.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_providers")]
    pub providers: Vec<ModelProvider>,
    /// Name of the provider to summarize with.
    #[serde(default = "default_current_provider")]
    pub current_provider: String,
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            caps: Caps::default(),
            keywords: default_keywords(),
            request_timeout_secs: default_request_timeout(),
            browser_timeout_secs: default_browser_timeout(),
            fetch_concurrency: default_fetch_concurrency(),
            providers: default_providers(),
            current_provider: default_current_provider(),
            webhooks: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, or the built-in defaults when
    /// no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config: AppConfig = serde_yaml::from_str(&raw)?;
                info!(path, "Loaded configuration file");
                config
            }
            None => {
                info!("No configuration file given; using built-in defaults");
                AppConfig::default()
            }
        };
        config.sanitize();
        Ok(config)
    }

    /// Drop malformed source entries before fetching begins and normalize
    /// keywords for case-insensitive matching. Bad entries are a
    /// configuration problem, not a runtime failure.
    fn sanitize(&mut self) {
        self.sources.retain(|s| {
            let ok = !s.url.is_empty() && !s.name.is_empty() && (1..=5).contains(&s.priority);
            if !ok {
                warn!(name = %s.name, url = %s.url, priority = s.priority, "Dropping malformed source entry");
            }
            ok
        });
        for keyword in &mut self.keywords {
            *keyword = keyword.to_lowercase();
        }
        if self.fetch_concurrency == 0 {
            self.fetch_concurrency = 1;
        }
    }

    /// The provider selected by `current_provider`, if enabled.
    pub fn current_provider(&self) -> Option<&ModelProvider> {
        self.providers
            .iter()
            .find(|p| p.name == self.current_provider && p.enabled)
    }

    /// Enabled webhook endpoints.
    pub fn enabled_webhooks(&self) -> Vec<&Webhook> {
        self.webhooks.iter().filter(|w| w.enabled).collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u8 {
    3
}

fn default_per_source() -> usize {
    10
}

fn default_total() -> usize {
    30
}

fn default_per_priority() -> BTreeMap<u8, usize> {
    BTreeMap::from([(5, 8), (4, 6), (3, 4), (2, 2), (1, 1)])
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_browser_timeout() -> u64 {
    30
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_current_provider() -> String {
    "deepseek".to_string()
}

fn default_keywords() -> Vec<String> {
    [
        "ai",
        "artificial intelligence",
        "machine learning",
        "deep learning",
        "neural",
        "algorithm",
        "model",
        "chatgpt",
        "openai",
        "gpt",
        "transformer",
        "llm",
        "人工智能",
        "机器学习",
        "深度学习",
        "智能",
        "算法",
        "大模型",
        "神经网络",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_providers() -> Vec<ModelProvider> {
    vec![
        ModelProvider {
            name: "deepseek".to_string(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            max_tokens: 1000,
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            enabled: true,
        },
        ModelProvider {
            name: "kimi".to_string(),
            base_url: "https://api.moonshot.cn/v1".to_string(),
            model: "moonshot-v1-8k".to_string(),
            max_tokens: 1000,
            api_key_env: "MOONSHOT_API_KEY".to_string(),
            enabled: true,
        },
        ModelProvider {
            name: "glm".to_string(),
            base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            model: "glm-4".to_string(),
            max_tokens: 1000,
            api_key_env: "GLM_API_KEY".to_string(),
            enabled: true,
        },
    ]
}

fn default_sources() -> Vec<NewsSource> {
    let source = |url: &str, name: &str, kind, priority, filter_relevance, rules| NewsSource {
        url: url.to_string(),
        name: name.to_string(),
        kind,
        enabled: true,
        priority,
        filter_relevance,
        rules,
    };

    vec![
        source(
            "https://36kr.com",
            "36氪",
            SourceKind::StaticHtml,
            5,
            true,
            ExtractionRules::with_selectors(&[
                "a.item-title",
                "a.article-title",
                "a.title",
                "a.post-title",
            ]),
        ),
        source(
            "https://www.jiqizhixin.com/",
            "机器之心",
            SourceKind::RenderedHtml,
            5,
            // Dedicated AI outlet; everything on the page is on-topic.
            false,
            ExtractionRules {
                link_selectors: vec![
                    "a.body-title".to_string(),
                    "a.article-item".to_string(),
                    "a.news-item".to_string(),
                    "a.post-title".to_string(),
                    "a.title".to_string(),
                ],
                content_marker: Some(".home__left-body".to_string()),
                ..ExtractionRules::default()
            },
        ),
        source(
            "https://www.aminer.cn/topic/ai",
            "AMiner",
            SourceKind::StaticHtml,
            4,
            true,
            ExtractionRules::with_selectors(&["a.title", "a.paper-title", "a.article-title"]),
        ),
        source(
            "https://www.infoq.cn/topic/AI&LLM",
            "InfoQ",
            SourceKind::StaticHtml,
            3,
            true,
            ExtractionRules::with_selectors(&["a.news-title", "a.article-title", "a.title"]),
        ),
        source(
            "https://www.leiphone.com/category/ai",
            "雷锋网",
            SourceKind::StaticHtml,
            4,
            true,
            ExtractionRules::with_selectors(&["a.title", "a.article-title", "a.post-title"]),
        ),
        source(
            "https://venturebeat.com/category/ai/",
            "VentureBeat",
            SourceKind::StaticHtml,
            4,
            true,
            ExtractionRules::with_selectors(&["a.title", "a.article-title", "a.entry-title"]),
        ),
        source(
            "https://techcrunch.com/category/artificial-intelligence/",
            "TechCrunch",
            SourceKind::StaticHtml,
            4,
            true,
            ExtractionRules::with_selectors(&[
                "a.title",
                "a.article-title",
                "a.entry-title",
                "a.post-title",
            ]),
        ),
        source(
            "https://feeds.feedburner.com/venturebeat/SZYF",
            "VentureBeat RSS",
            SourceKind::Rss,
            3,
            true,
            ExtractionRules::default(),
        ),
        source(
            "https://techcrunch.com/feed/",
            "TechCrunch RSS",
            SourceKind::Rss,
            3,
            true,
            ExtractionRules::default(),
        ),
        source(
            "https://www.artificialintelligence-news.com/feed/",
            "AI News RSS",
            SourceKind::Rss,
            2,
            true,
            ExtractionRules::default(),
        ),
        source(
            "https://www.mit.edu/~jintao/ai_news.xml",
            "MIT AI News RSS",
            SourceKind::Rss,
            2,
            true,
            ExtractionRules::default(),
        ),
        // API sources ship disabled; they need per-operator API keys in the URL.
        NewsSource {
            url: "https://newsapi.org/v2/everything?q=artificial+intelligence&language=en&sortBy=publishedAt&apiKey=YOUR_API_KEY".to_string(),
            name: "NewsAPI".to_string(),
            kind: SourceKind::JsonApi,
            enabled: false,
            priority: 3,
            filter_relevance: true,
            rules: ExtractionRules::default(),
        },
        NewsSource {
            url: "https://gnews.io/api/v4/search?q=artificial+intelligence&token=YOUR_API_KEY".to_string(),
            name: "GNews API".to_string(),
            kind: SourceKind::JsonApi,
            enabled: false,
            priority: 3,
            filter_relevance: true,
            rules: ExtractionRules::default(),
        },
    ]
}
