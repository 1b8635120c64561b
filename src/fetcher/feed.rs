//! RSS / Atom feed retrieval.
//!
//! [`parse_feed`] understands the three formats seen in the wild:
//!
//! | Format | Item element | Link |
//! |--------|--------------|------|
//! | RSS 2.0 | `<item>` | `<link>` text |
//! | RSS 1.0 (RDF) | `<item>` | `<link>` text |
//! | Atom | `<entry>` | `<link href>` (`rel="alternate"` or no `rel`) |
//!
//! Relative item links are resolved against the feed URL when one is known.

use crate::error::FeedError;
use crate::models::{Feed, FeedItem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Retrieves and parses one feed.
pub trait FeedSource: Send + Sync {
    fn fetch_feed(&self, feed_url: &str) -> impl Future<Output = Result<Feed, FeedError>> + Send;
}

/// Fetches feeds over HTTP and parses them with [`parse_feed`].
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .user_agent(concat!("feed_summarizer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(level = "info", skip(self))]
    async fn fetch_feed(&self, feed_url: &str) -> Result<Feed, FeedError> {
        let base = Url::parse(feed_url).map_err(|e| FeedError::InvalidUrl {
            url: feed_url.to_string(),
            reason: e.to_string(),
        })?;
        let http_err = |reason: String| FeedError::Http {
            url: feed_url.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(base.clone())
            .send()
            .await
            .map_err(|e| http_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(http_err(format!("status code: {}", status.as_u16())));
        }
        let body = resp.text().await.map_err(|e| http_err(e.to_string()))?;

        let feed = parse_feed(&body, Some(&base))?;
        info!(items = feed.items.len(), title = ?feed.title, "Parsed feed");
        Ok(feed)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Published,
}

/// Parse an RSS 2.0, RSS 1.0, or Atom document.
pub fn parse_feed(xml: &str, base: Option<&Url>) -> Result<Feed, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut saw_root = false;
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut depth_in_item = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FeedError::Parse(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => {
                let name = local_name(&start);
                match name.as_str() {
                    "rss" | "RDF" | "feed" => saw_root = true,
                    "item" | "entry" if current.is_none() => {
                        current = Some(FeedItem::default());
                        depth_in_item = 0;
                        continue;
                    }
                    _ => {}
                }
                if current.is_some() {
                    depth_in_item += 1;
                    // Only direct children of the item carry its fields.
                    field = if depth_in_item == 1 { item_field(&name) } else { None };
                    if name == "link" && depth_in_item == 1 {
                        apply_atom_link(&start, current.as_mut(), base)?;
                    }
                } else if name == "title" && feed.title.is_none() {
                    field = Some(Field::Title);
                }
            }
            Event::Empty(start) => {
                if local_name(&start) == "link" && depth_in_item == 0 {
                    apply_atom_link(&start, current.as_mut(), base)?;
                }
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| FeedError::Parse(e.to_string()))?;
                assign(&mut feed, current.as_mut(), field, &value, base);
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let value = String::from_utf8_lossy(&raw);
                assign(&mut feed, current.as_mut(), field, &value, base);
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                if current.is_some() && depth_in_item == 0 && (name == "item" || name == "entry") {
                    if let Some(item) = current.take() {
                        debug!(title = %item.title, link = %item.link, "Parsed feed item");
                        feed.items.push(item);
                    }
                } else if current.is_some() {
                    depth_in_item = depth_in_item.saturating_sub(1);
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedError::Parse(
            "document is not an RSS or Atom feed".to_string(),
        ));
    }
    Ok(feed)
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn item_field(name: &str) -> Option<Field> {
    match name {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "description" | "summary" => Some(Field::Description),
        "pubDate" | "published" | "updated" | "date" => Some(Field::Published),
        _ => None,
    }
}

fn assign(
    feed: &mut Feed,
    item: Option<&mut FeedItem>,
    field: Option<Field>,
    value: &str,
    base: Option<&Url>,
) {
    let Some(field) = field else {
        return;
    };
    match item {
        Some(item) => match field {
            Field::Title => item.title.push_str(value),
            Field::Link if item.link.is_empty() => item.link = resolve(value, base),
            Field::Link => {}
            Field::Description => {
                item.description.get_or_insert_with(String::new).push_str(value)
            }
            Field::Published => {
                if item.published.is_none() {
                    item.published = Some(value.to_string());
                }
            }
        },
        None if field == Field::Title => {
            feed.title.get_or_insert_with(String::new).push_str(value)
        }
        None => {}
    }
}

/// Atom links live in the `href` attribute. Only `alternate` (or rel-less)
/// links name the article itself.
fn apply_atom_link(
    start: &BytesStart<'_>,
    item: Option<&mut FeedItem>,
    base: Option<&Url>,
) -> Result<(), FeedError> {
    let Some(item) = item else {
        return Ok(());
    };
    let mut href = None;
    let mut rel = None;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| FeedError::Parse(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| FeedError::Parse(e.to_string()))?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    if let Some(href) = href {
        let is_alternate = rel.as_deref().is_none_or(|r| r == "alternate");
        if is_alternate && item.link.is_empty() {
            item.link = resolve(&href, base);
        }
    }
    Ok(())
}

fn resolve(link: &str, base: Option<&Url>) -> String {
    let link = link.trim();
    match base {
        Some(base) => base
            .join(link)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| link.to_string()),
        None => link.to_string(),
    }
}
