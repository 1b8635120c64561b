//! # Feed Summarizer
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... feed_summarizer --format https://example.com/rss
//! feed_summarizer fetch https://example.com/rss
//! ```

use chrono::Local;
use clap::Parser;
use feed_summarizer::api::OpenAiCompatClient;
use feed_summarizer::cli::{Cli, Command};
use feed_summarizer::config::AppConfig;
use feed_summarizer::error::ClientError;
use feed_summarizer::fetcher::feed::{FeedSource, HttpFeedSource};
use feed_summarizer::fetcher::http::HttpPageFetcher;
use feed_summarizer::jsonify::{OutputTemplate, extract_and_format};
use feed_summarizer::models::SummaryReport;
use feed_summarizer::outputs::json;
use feed_summarizer::summarize::Summarizer;
use feed_summarizer::utils::{ensure_writable_dir, time_of_day, truncate_for_log};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

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
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("feed_summarizer starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    args.apply_to(&mut config);
    config.validate()?;

    match &args.command {
        Some(Command::Fetch { urls }) => print_feeds(&config, urls).await?,
        None => summarize_feeds(&args, &config).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(feeds = urls.len()))]
async fn print_feeds(config: &AppConfig, urls: &[String]) -> Result<(), Box<dyn Error>> {
    let feed_source = HttpFeedSource::new(config.fetch.request_timeout())?;
    for url in urls {
        let feed = feed_source.fetch_feed(url).await?;
        info!(%url, items = feed.items.len(), "Fetched feed");
        println!("{}", serde_json::to_string_pretty(&feed)?);
    }
    Ok(())
}

#[instrument(level = "info", skip_all, fields(feeds = args.urls.len(), format = args.format))]
async fn summarize_feeds(args: &Cli, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let key_env = config.api_key_env();
    let api_key =
        std::env::var(key_env).map_err(|_| ClientError::MissingApiKey(key_env.to_string()))?;

    let client = OpenAiCompatClient::new(
        config.base_url(),
        &api_key,
        &config.model,
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    let feed_source = HttpFeedSource::new(config.fetch.request_timeout())?;
    let page_fetcher = HttpPageFetcher::new(config.fetch.request_timeout())?
        .with_text_extraction(config.fetch.extract_text);

    let mut summarizer = Summarizer::new(
        client,
        feed_source,
        page_fetcher,
        config.fetch.max_concurrency,
        config.fetch.deadline(),
    )?;
    if let (Some(system_prompt), Some(user_prompt)) = (&args.system_prompt, &args.user_prompt) {
        summarizer.load_prompt_builder(system_prompt, user_prompt)?;
        info!(%system_prompt, %user_prompt, "Loaded custom prompts");
    }

    let template = match (args.format, &args.output_template) {
        (false, _) => None,
        (true, Some(path)) => Some(OutputTemplate::from_path(path)?),
        (true, None) => Some(OutputTemplate::default_output()?),
    };

    // Early check: the output directory must be writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e.into());
        }
    }

    let mut failed = 0usize;
    for url in &args.urls {
        let summary = match summarizer.summarize(url).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(%url, error = %e, "Failed to summarize feed; skipping");
                failed += 1;
                continue;
            }
        };
        debug!(%url, reply_preview = %truncate_for_log(&summary, 300), "Received summary");

        let items = match &template {
            Some(template) => match extract_and_format(&summary, template) {
                Ok(items) => Some(items),
                Err(e) => {
                    error!(
                        %url,
                        error = %e,
                        reply_preview = %truncate_for_log(&summary, 300),
                        "Failed to format summary; skipping"
                    );
                    failed += 1;
                    continue;
                }
            },
            None => None,
        };

        match &args.json_output_dir {
            Some(dir) => {
                let now = Local::now();
                let report = SummaryReport {
                    feed_url: url.clone(),
                    local_date: now.date_naive().to_string(),
                    time_of_day: time_of_day(),
                    local_time: now.time().format("%H:%M:%S").to_string(),
                    summary,
                    items,
                };
                json::write_report(&report, dir).await?;
            }
            None => match items {
                Some(items) => println!("{}", serde_json::to_string_pretty(&items)?),
                None => println!("{summary}"),
            },
        }
    }

    info!(
        total = args.urls.len(),
        successful = args.urls.len() - failed,
        failed,
        "Completed feed summaries"
    );
    if failed > 0 {
        return Err(format!("{failed} of {} feeds failed", args.urls.len()).into());
    }
    Ok(())
}
