//! Command-line interface definitions.
//!
//! One invocation performs one aggregation run; scheduling (the "daily" in
//! the daily digest) is left to cron or whatever supervisor launches the
//! binary.

use clap::Parser;

/// Command-line arguments for the AI daily news digest.
///
/// # Examples
///
/// ```sh
/// # Run with the built-in source list and deliver to configured webhooks
/// ai_daily_news -c ./config.yaml
///
/// # Inspect the aggregation result without calling the LLM or webhooks
/// ai_daily_news -c ./config.yaml --dry-run --digest-json ./digest.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Write the final digest as JSON to this file
    #[arg(long)]
    pub digest_json: Option<String>,

    /// Aggregate only: skip LLM summarization and webhook delivery
    #[arg(long)]
    pub dry_run: bool,

    /// Override the model provider named in the configuration
    #[arg(long, env = "MODEL_PROVIDER")]
    pub provider: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["ai_daily_news"]);
        assert!(cli.config.is_none());
        assert!(cli.digest_json.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "ai_daily_news",
            "-c",
            "/etc/ai_daily_news/config.yaml",
            "--dry-run",
            "--digest-json",
            "/tmp/digest.json",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/etc/ai_daily_news/config.yaml"));
        assert_eq!(cli.digest_json.as_deref(), Some("/tmp/digest.json"));
        assert!(cli.dry_run);
    }
}
