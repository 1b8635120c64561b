//! Command-line interface definitions for the feed summarizer.
//!
//! Flags override the values loaded from `--config`. The API key is read from
//! the environment variable named by the config (`GEMINI_API_KEY` or
//! `OPENAI_API_KEY` by default).

use crate::api::ApiKind;
use crate::config::AppConfig;
use clap::{Parser, Subcommand};

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Summarize a feed and print the raw reply
/// feed_summarizer https://example.com/rss
///
/// # Reshape the reply into JSON records and write reports to disk
/// feed_summarizer --format -j ./reports https://example.com/rss
///
/// # Only fetch and print the parsed feed
/// feed_summarizer fetch https://example.com/rss
/// ```
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Feed URLs to summarize
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "FEED_SUMMARIZER_CONFIG")]
    pub config: Option<String>,

    /// Generative AI API to use
    #[arg(long, value_enum)]
    pub gen_api_kind: Option<ApiKind>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// System prompt file
    #[arg(long, requires = "user_prompt")]
    pub system_prompt: Option<String>,

    /// User prompt template file, rendered once per feed item
    #[arg(long, requires = "system_prompt")]
    pub user_prompt: Option<String>,

    /// Reshape the reply into JSON records
    #[arg(short, long)]
    pub format: bool,

    /// Template used by --format instead of the built-in one
    #[arg(long, requires = "format")]
    pub output_template: Option<String>,

    /// Write JSON reports under this directory instead of printing
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Maximum simultaneous page fetches
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Deadline in seconds for fetching the pages of one feed
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

impl Cli {
    /// Overwrite config values with the flags that were given.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(kind) = self.gen_api_kind {
            config.api_kind = kind;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(n) = self.max_concurrency {
            config.fetch.max_concurrency = n;
        }
        if let Some(secs) = self.deadline_secs {
            config.fetch.deadline_secs = secs;
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Fetch feeds and print them as JSON
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "feed_summarizer",
            "--json-output-dir",
            "./json",
            "--format",
            "https://example.com/rss",
            "https://example.org/feed",
        ]);

        assert!(cli.command.is_none());
        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
        assert!(cli.format);
        assert_eq!(cli.urls.len(), 2);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "feed_summarizer",
            "-j",
            "/tmp/json",
            "-c",
            "config.yaml",
            "-f",
            "https://example.com/rss",
        ]);

        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/json"));
        assert_eq!(cli.config.as_deref(), Some("config.yaml"));
        assert!(cli.format);
    }

    #[test]
    fn test_fetch_subcommand() {
        let cli = Cli::parse_from(["feed_summarizer", "fetch", "https://example.com/rss"]);
        assert_eq!(
            cli.command,
            Some(Command::Fetch {
                urls: vec!["https://example.com/rss".into()]
            })
        );
        assert!(cli.urls.is_empty());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "feed_summarizer",
            "--gen-api-kind",
            "openai",
            "--model",
            "gpt-4o-mini",
            "--max-concurrency",
            "3",
            "--deadline-secs",
            "30",
            "https://example.com/rss",
        ]);
        assert_eq!(cli.gen_api_kind, Some(ApiKind::Openai));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(cli.max_concurrency, Some(3));
        assert_eq!(cli.deadline_secs, Some(30));

        let mut config = AppConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.api_kind, ApiKind::Openai);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.fetch.max_concurrency, 3);
        assert_eq!(config.fetch.deadline_secs, 30);
        assert_eq!(config.fetch.request_timeout_secs, 60);
    }

    #[test]
    fn test_prompts_must_come_together() {
        let res = Cli::try_parse_from([
            "feed_summarizer",
            "--system-prompt",
            "sys.txt",
            "https://example.com/rss",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_output_template_requires_format() {
        let res = Cli::try_parse_from([
            "feed_summarizer",
            "--output-template",
            "out.j2",
            "https://example.com/rss",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_urls_required() {
        assert!(Cli::try_parse_from(["feed_summarizer"]).is_err());
    }
}
