//! Remote document retrieval.
//!
//! - [`ResourceFetcher`]: the injectable "fetch one identifier" capability
//! - [`coordinator::fetch_all`]: bounded, deadline-limited concurrent fetching
//!   with per-identifier failure isolation
//! - [`http::HttpPageFetcher`]: the default reqwest-backed fetcher
//! - [`feed`]: RSS/Atom feed retrieval and parsing

pub mod coordinator;
pub mod feed;
pub mod http;

use crate::error::BoxError;
use itertools::Itertools;
use std::collections::HashMap;
use std::future::Future;

pub use coordinator::fetch_all;

/// Fetches the raw content of one identifier (typically a URL).
///
/// Implementations are shared across worker tasks, so they must be
/// `Send + Sync` and return `Send` futures.
pub trait ResourceFetcher: Send + Sync + 'static {
    fn fetch(&self, id: &str) -> impl Future<Output = Result<String, BoxError>> + Send;
}

/// Identifier → content for every identifier that succeeded before the deadline.
pub type FetchOutcome = HashMap<String, String>;

/// An ordered set of unique identifiers.
///
/// Duplicates are dropped on construction; the first occurrence keeps its place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    ids: Vec<String>,
}

impl FetchRequest {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FetchRequest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).unique().collect(),
        }
    }
}

impl IntoIterator for FetchRequest {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_request_dedupes_keeping_order() {
        let req: FetchRequest = ["b", "a", "b", "c", "a"].into_iter().collect();
        assert_eq!(req.len(), 3);
        assert_eq!(req.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_empty_fetch_request() {
        let req: FetchRequest = Vec::<String>::new().into_iter().collect();
        assert!(req.is_empty());
    }
}
