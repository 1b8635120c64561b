//! Error types for fetching, extraction, and the summarization pipeline.
//!
//! The two core components never short-circuit on a single bad item. They
//! collect per-item failures into an [`AggregatedError`] and hand the whole
//! composite back to the caller:
//!
//! - the fetch coordinator returns its aggregate *alongside* the successes
//! - the extractor escalates any item failure into [`ExtractError::Items`]

use std::fmt;
use thiserror::Error;

/// Boxed error type accepted from injected capabilities (fetchers, templates).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A composite of zero or more independent failures, collected rather than
/// short-circuited.
///
/// Causes are stored in completion order, which callers must not rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedError<E> {
    causes: Vec<E>,
}

impl<E> AggregatedError<E> {
    pub fn new() -> Self {
        Self { causes: Vec::new() }
    }

    pub fn push(&mut self, cause: E) {
        self.causes.push(cause);
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.causes.iter()
    }

    pub fn into_inner(self) -> Vec<E> {
        self.causes
    }

    /// `None` when nothing was collected, so callers can write
    /// `agg.into_option()` instead of checking emptiness themselves.
    pub fn into_option(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl<E> Default for AggregatedError<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<E> for AggregatedError<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            causes: iter.into_iter().collect(),
        }
    }
}

impl<E> IntoIterator for AggregatedError<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.causes.into_iter()
    }
}

impl<E: fmt::Display> fmt::Display for AggregatedError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure(s)", self.causes.len())?;
        for (i, cause) in self.causes.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{cause}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AggregatedError<E> {}

/// Why one identifier did not make it into the fetch outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The fetcher returned an error (network, non-success status, ...).
    Fetch(String),
    /// The global deadline fired before the fetch was dispatched or completed.
    DeadlineExceeded,
    /// The fetcher panicked while handling this identifier.
    Panicked(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Fetch(msg) => write!(f, "{msg}"),
            FailureCause::DeadlineExceeded => write!(f, "deadline exceeded"),
            FailureCause::Panicked(msg) => write!(f, "fetcher panicked: {msg}"),
        }
    }
}

/// One failed fetch attempt, keyed by identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetching {id}: {cause}")]
pub struct FetchFailure {
    pub id: String,
    pub cause: FailureCause,
}

impl FetchFailure {
    pub fn is_deadline(&self) -> bool {
        matches!(self.cause, FailureCause::DeadlineExceeded)
    }
}

/// Which step of per-value processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// Decoding the extracted literal as JSON.
    Decode,
    /// Executing the output template.
    Render,
    /// Decoding the rendered template output as JSON.
    Redecode,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionStage::Decode => "parse JSON object",
            ExtractionStage::Render => "execute template",
            ExtractionStage::Redecode => "parse JSON object from template output",
        };
        f.write_str(s)
    }
}

/// One extracted value that failed decode, render, or re-decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("value #{index}: failed to {stage}: {cause}")]
pub struct ExtractionItemFailure {
    /// Position of the value in discovery order.
    pub index: usize,
    /// The literal (or rendered text, for `Redecode`) that failed.
    pub value: String,
    pub stage: ExtractionStage,
    pub cause: String,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no valid JSON object or array found in the input text")]
    NoStructureFound,

    #[error("found a JSON array but its content is invalid or malformed: {literal}")]
    MalformedArray { literal: String },

    /// At least one value failed. Successful siblings are discarded.
    #[error("failed to format extracted JSON: {0}")]
    Items(AggregatedError<ExtractionItemFailure>),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template error: {0}")]
    Syntax(#[from] minijinja::Error),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to fetch feed from URL {url}: {reason}")]
    Http { url: String, reason: String },

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("LLM error (HTTP {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("LLM returned an empty reply")]
    EmptyReply,

    #[error("missing API key: set {0}")]
    MissingApiKey(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for the summarization pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
