//! Feed summarization pipeline.
//!
//! 1. **Feed**: fetch and parse the feed through a [`FeedSource`]
//! 2. **Pages**: fetch every linked page with [`fetch_all`]; pages that fail
//!    are logged and left out
//! 3. **Prompt**: render one [`RssInfo`] per item into the [`PromptBuilder`]
//! 4. **Generate**: send the prompt to the [`GenAiClient`]

use crate::api::GenAiClient;
use crate::error::{AppError, TemplateError};
use crate::fetcher::feed::FeedSource;
use crate::fetcher::{FetchOutcome, FetchRequest, ResourceFetcher, fetch_all};
use crate::models::{Feed, RssInfo};
use crate::prompt::PromptBuilder;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Build one [`RssInfo`] per feed item, with the page attached when it was
/// fetched. Items whose fetch failed get `page: None`.
pub fn rss_infos(feed: &Feed, pages: &FetchOutcome) -> Vec<RssInfo> {
    feed.items
        .iter()
        .map(|item| RssInfo {
            title: item.title.clone(),
            link: item.link.clone(),
            page: pages.get(&item.link).cloned(),
        })
        .collect()
}

/// Fetch all pages linked from `feed` and pair them with their items.
///
/// Page failures never fail this call; they are logged and the affected items
/// carry no page.
#[instrument(level = "info", skip_all, fields(items = feed.items.len()))]
pub async fn collect_pages<P: ResourceFetcher>(
    feed: &Feed,
    page_fetcher: Arc<P>,
    max_concurrency: usize,
    deadline: Duration,
) -> Vec<RssInfo> {
    let request: FetchRequest = feed.links().collect();
    let (pages, err) = fetch_all(request, page_fetcher, max_concurrency, deadline).await;
    if let Some(err) = err {
        warn!(failed = err.len(), error = %err, "Failed to fetch some pages; continuing without them");
    }
    rss_infos(feed, &pages)
}

/// Summarizes feeds with an AI client.
pub struct Summarizer<C, F, P> {
    client: C,
    feed_source: F,
    page_fetcher: Arc<P>,
    prompt_builder: PromptBuilder,
    max_concurrency: usize,
    deadline: Duration,
}

impl<C, F, P> Summarizer<C, F, P>
where
    C: GenAiClient,
    F: FeedSource,
    P: ResourceFetcher,
{
    /// Create a summarizer with the built-in prompts.
    pub fn new(
        client: C,
        feed_source: F,
        page_fetcher: P,
        max_concurrency: usize,
        deadline: Duration,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            client,
            feed_source,
            page_fetcher: Arc::new(page_fetcher),
            prompt_builder: PromptBuilder::with_defaults()?,
            max_concurrency,
            deadline,
        })
    }

    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    /// Replace the built-in prompts with a system prompt text file and a user
    /// prompt template file.
    pub fn load_prompt_builder(
        &mut self,
        system_prompt_path: impl AsRef<Path>,
        user_prompt_path: impl AsRef<Path>,
    ) -> Result<(), AppError> {
        let system_prompt = read_file(system_prompt_path.as_ref())?;
        let user_template = read_file(user_prompt_path.as_ref())?;
        self.prompt_builder = PromptBuilder::new(system_prompt, user_template)?;
        Ok(())
    }

    /// Summarize the feed at `feed_url`, returning the raw AI reply.
    #[instrument(level = "info", skip(self))]
    pub async fn summarize(&mut self, feed_url: &str) -> Result<String, AppError> {
        let feed = self.feed_source.fetch_feed(feed_url).await?;
        let infos = collect_pages(
            &feed,
            Arc::clone(&self.page_fetcher),
            self.max_concurrency,
            self.deadline,
        )
        .await;
        let with_page = infos.iter().filter(|i| i.page.is_some()).count();
        info!(items = infos.len(), with_page, "Building prompt");

        self.prompt_builder.reset();
        for info in &infos {
            self.prompt_builder.append(info)?;
        }
        let prompt = self.prompt_builder.build();

        Ok(self.client.send(&prompt).await?)
    }
}

fn read_file(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })
}
