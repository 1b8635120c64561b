//! Data models for feeds, prompt records, and summary reports.
//!
//! - [`Feed`] / [`FeedItem`]: a parsed RSS or Atom document
//! - [`RssInfo`]: one feed item plus its fetched page, as handed to the prompt
//! - [`SummaryReport`]: the output of one summarization run

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed feed.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Feed {
    /// Channel / feed title, when the document has one.
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// Links of every item that has one, in feed order.
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .map(|item| item.link.as_str())
            .filter(|link| !link.is_empty())
    }
}

/// One `<item>` or `<entry>` of a feed.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedItem {
    pub title: String,
    /// Absolute article URL. Empty when the item carried no link.
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication timestamp exactly as written in the feed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

/// A feed item with its page content, rendered into the user prompt.
///
/// `page` is `None` when the page could not be fetched before the deadline;
/// it is never an empty placeholder.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RssInfo {
    pub title: String,
    pub link: String,
    pub page: Option<String>,
}

/// Everything produced for one feed by one run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummaryReport {
    pub feed_url: String,
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// "morning", "afternoon", or "evening".
    pub time_of_day: String,
    pub local_time: String,
    /// Raw AI reply.
    pub summary: String,
    /// Reshaped records, present when formatting was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
}
