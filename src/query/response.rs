//! Ranked query responses.

use serde::{Deserialize, Serialize};

/// Error string marking a well-formed query that matched nothing.
pub const EMPTY_RESULTS: &str = "EMPTYRESULTS";

/// One scored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "Document")]
    pub document: String,
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "Info", default)]
    pub info: String,
}

/// A ranked result set, or a structured error. `Results` serialises to
/// `null` on error responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Results")]
    pub results: Option<Vec<SearchResult>>,
    #[serde(rename = "Error", default)]
    pub error: String,
    #[serde(rename = "Source", default)]
    pub source: String,
}

impl Response {
    pub fn new() -> Self {
        Response {
            results: Some(Vec::new()),
            error: String::new(),
            source: String::new(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Response {
            results: None,
            error: msg.into(),
            source: String::new(),
        }
    }

    /// An `EMPTYRESULTS` marker response.
    pub fn empty() -> Self {
        Self::error(EMPTY_RESULTS)
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn is_empty_marker(&self) -> bool {
        self.error == EMPTY_RESULTS
    }

    pub fn len(&self) -> usize {
        self.results.as_ref().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, document: impl Into<String>, score: f64) {
        self.results
            .get_or_insert_with(Vec::new)
            .push(SearchResult {
                document: document.into(),
                score,
                info: String::new(),
            });
    }

    /// Sort descending by score. The sort is stable, so equal scores keep
    /// their insertion order.
    pub fn sort(&mut self) {
        if let Some(results) = self.results.as_mut() {
            results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        }
    }

    /// Append results from `other` for documents not already present.
    pub fn extend_unique(&mut self, other: Response) {
        let Some(incoming) = other.results else {
            return;
        };
        let own = self.results.get_or_insert_with(Vec::new);
        for result in incoming {
            if !own.iter().any(|r| r.document == result.document) {
                own.push(result);
            }
        }
    }
}
