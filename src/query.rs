//! Ranked query evaluation.
//!
//! Three scoring models sit behind the [`RelevanceRanker`] trait; an
//! [`EngineRegistry`] maps wire names to implementations. The
//! [`evaluate`] entry point analyses the query text, applies the IDF
//! threshold split, dispatches to the ranker, and normalises the result.

pub mod bm25;
pub mod cosine;
pub mod language_model;
pub mod positional;
pub mod response;
pub mod threshold;

pub use bm25::Bm25;
pub use cosine::CosineVsm;
pub use language_model::DirichletQl;
pub use response::{EMPTY_RESULTS, Response, SearchResult};

use std::collections::HashMap;

use ahash::AHashSet;

use crate::analysis::token::{DocumentId, Token};
use crate::error::Result;
use crate::index::Index;

/// A scoring model producing a ranked response for one query.
pub trait RelevanceRanker: Send + Sync {
    fn name(&self) -> &'static str;
    fn process_query(&self, query_terms: &[Token], index: &Index, force: bool) -> Response;
}

/// Maps engine names (`COSINE`, `BM25`, `LM`) to rankers. Built at
/// startup and handed to each backend; not process-global.
pub struct EngineRegistry {
    engines: HashMap<String, Box<dyn RelevanceRanker>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        EngineRegistry {
            engines: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("COSINE", Box::new(CosineVsm::new()));
        reg.register("BM25", Box::new(Bm25::default()));
        reg.register("LM", Box::new(DirichletQl::default()));
        reg
    }

    pub fn register(&mut self, name: impl Into<String>, ranker: Box<dyn RelevanceRanker>) {
        self.engines.insert(name.into(), ranker);
    }

    pub fn get(&self, name: &str) -> Option<&dyn RelevanceRanker> {
        self.engines.get(name).map(|b| b.as_ref())
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Distinct query terms with their in-query frequencies, in first
/// occurrence order.
pub(crate) fn query_frequencies(query_terms: &[Token]) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for token in query_terms {
        let entry = counts.entry(token.text.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(token.text.clone());
        }
        *entry += 1;
    }
    order
        .into_iter()
        .map(|text| {
            let count = counts[text.as_str()] as f64;
            (text, count)
        })
        .collect()
}

/// Mean document frequency across the distinct query terms; unknown
/// terms count as zero.
pub(crate) fn average_df(query_terms: &[Token], index: &Index) -> Result<f64> {
    let mut seen: AHashSet<&str> = AHashSet::new();
    let mut sum = 0f64;
    for token in query_terms {
        if !seen.insert(&token.text) {
            continue;
        }
        if let Some(df) = index.with_posting_list(&token.text, |_, pl| pl.len())? {
            sum += df as f64;
        }
    }
    if seen.is_empty() {
        return Ok(0.0);
    }
    Ok(sum / seen.len() as f64)
}

/// The empty-posting guard: error out when the query's average df falls
/// below `frac` of the collection, unless forced.
pub(crate) fn df_guard(
    query_terms: &[Token],
    index: &Index,
    frac: f64,
    force: bool,
) -> Option<Response> {
    if force {
        return None;
    }
    let avg = match average_df(query_terms, index) {
        Ok(avg) => avg,
        Err(e) => return Some(Response::error(e.to_string())),
    };
    if avg < index.document_count() as f64 * frac {
        return Some(Response::error(format!("Avg DF {avg:.4} too low for index")));
    }
    None
}

/// Turn a doc-id score accumulation into a response, resolving human
/// ids. Documents are added in id order so equal scores rank
/// deterministically.
pub(crate) fn response_from_scores(scores: HashMap<DocumentId, f64>, index: &Index) -> Response {
    let mut scored: Vec<(DocumentId, f64)> = scores.into_iter().collect();
    scored.sort_by_key(|(id, _)| *id);

    let mut response = Response::new();
    for (id, score) in scored {
        match index.doc_info(id) {
            Some(info) => response.push(info.human_id, score),
            None => log::warn!("scored unknown document {id}"),
        }
    }
    response.sort();
    response
}

/// Evaluate one query end to end: analyse the text, split by the IDF
/// threshold, run the ranker over each group, and merge by
/// first-occurrence union.
pub fn evaluate(
    index: &Index,
    registry: &EngineRegistry,
    engine: &str,
    text: &str,
    query_threshold: f64,
    force: bool,
) -> Response {
    let Some(ranker) = registry.get(engine) else {
        return Response::error(format!("Unknown ranking engine '{engine}'"));
    };

    let tokens = match index.analyze_query(text) {
        Ok(tokens) => tokens,
        Err(e) => return Response::error(e.to_string()),
    };
    if tokens.is_empty() {
        return Response::error("no query terms survived analysis");
    }

    let groups = match threshold::threshold_groups(&tokens, query_threshold, index) {
        Ok(groups) => groups,
        Err(e) => return Response::error(e.to_string()),
    };

    let mut merged: Option<Response> = None;
    for group in groups {
        if group.is_empty() {
            continue;
        }
        let response = ranker.process_query(&group, index, force);
        match merged.as_mut() {
            Some(m) if !m.is_error() => {
                if !response.is_error() {
                    m.extend_unique(response);
                }
            }
            _ => merged = Some(response),
        }
    }

    let mut response = merged.unwrap_or_else(|| Response::error("no query terms survived analysis"));
    if !response.is_error() {
        response.sort();
        if response.is_empty() {
            response = Response::empty();
        }
    }
    response
}
