//! reqwest-backed [`ResourceFetcher`] for article pages.
//!
//! Any non-200 status is treated as a failure. With `extract_text` enabled
//! the HTML is reduced to the visible text of `<title>` and `<body>`, which
//! keeps prompts small for feeds that link to heavy pages.

use super::ResourceFetcher;
use crate::error::{BoxError, ClientError};
use crate::utils::millis;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("feed_summarizer/", env!("CARGO_PKG_VERSION"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Fetches pages over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    extract_text: bool,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self {
            client,
            extract_text: false,
        })
    }

    /// Return visible text instead of raw HTML.
    pub fn with_text_extraction(mut self, enabled: bool) -> Self {
        self.extract_text = enabled;
        self
    }

    /// GET `url` and return the body as a string.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, BoxError> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(format!(
                "failed to fetch URL: {url}, status code: {}",
                status.as_u16()
            )
            .into());
        }

        let body = resp.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = millis(t0.elapsed()),
            "Downloaded page"
        );
        Ok(body)
    }
}

impl ResourceFetcher for HttpPageFetcher {
    async fn fetch(&self, id: &str) -> Result<String, BoxError> {
        let html = self.fetch_html(id).await?;
        if self.extract_text {
            Ok(visible_text(&html))
        } else {
            Ok(html)
        }
    }
}

/// Collapse the text content of `<title>` and `<body>` into single-spaced lines.
///
/// Script and style contents are dropped.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();

    if let Ok(title_selector) = Selector::parse("title") {
        for title in document.select(&title_selector) {
            let text = title.text().collect::<Vec<_>>().join(" ");
            push_line(&mut out, &text);
        }
    }

    let Ok(body_selector) = Selector::parse("body") else {
        return out;
    };
    for body in document.select(&body_selector) {
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let in_script = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| name == "script" || name == "style" || name == "noscript");
            if !in_script {
                push_line(&mut out, text);
            }
        }
    }
    out
}

fn push_line(out: &mut String, text: &str) {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    if collapsed.is_empty() {
        return;
    }
    out.push_str(&collapsed);
    out.push('\n');
}
