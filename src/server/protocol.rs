//! Wire types for the query server. UTF-8 JSON, one message per line.

use serde::{Deserialize, Serialize};

pub const QUERY_TYPE_PHRASE: &str = "phrase";
pub const QUERY_TYPE_STATS: &str = "stats";

fn default_query_type() -> String {
    QUERY_TYPE_PHRASE.to_string()
}

fn default_threshold() -> f64 {
    1.0
}

/// A query request. `Type` selects between ranked phrase queries and
/// single-term stats lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "Id", default)]
    pub id: String,

    #[serde(rename = "Text", default)]
    pub text: String,

    #[serde(rename = "Type", default = "default_query_type")]
    pub query_type: String,

    #[serde(rename = "Engine", default)]
    pub engine: String,

    /// Comma-separated index tags in preference order.
    #[serde(rename = "IndexPref", default)]
    pub index_pref: String,

    #[serde(rename = "QueryThresh", default = "default_threshold")]
    pub query_thresh: f64,

    #[serde(rename = "Force", default)]
    pub force: bool,
}

impl Default for QueryRequest {
    fn default() -> Self {
        QueryRequest {
            id: String::new(),
            text: String::new(),
            query_type: default_query_type(),
            engine: String::new(),
            index_pref: String::new(),
            query_thresh: 1.0,
            force: false,
        }
    }
}

/// Reply to a stats query: aggregate statistics for one term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsReply {
    #[serde(rename = "Term", default)]
    pub term: String,

    #[serde(rename = "Idf", default)]
    pub idf: f64,

    #[serde(rename = "Df", default)]
    pub df: usize,

    #[serde(rename = "Tf", default)]
    pub tf: u64,

    #[serde(rename = "PostingList", default)]
    pub posting_list: String,

    #[serde(rename = "Error", default)]
    pub error: String,

    #[serde(rename = "Source", default)]
    pub source: String,
}

impl StatsReply {
    pub fn error(msg: impl Into<String>) -> Self {
        StatsReply {
            error: msg.into(),
            ..Default::default()
        }
    }
}
