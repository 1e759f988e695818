//! Cosine-normalised vector-space ranking.

use std::collections::HashMap;

use crate::analysis::token::{DocumentId, Token};
use crate::index::Index;
use crate::query::positional::filter_positional;
use crate::query::response::Response;
use crate::query::{RelevanceRanker, df_guard, query_frequencies, response_from_scores};

pub struct CosineVsm;

impl CosineVsm {
    pub fn new() -> Self {
        CosineVsm
    }

    /// Divide the accumulated dot products by the document and query
    /// norms, using the tf-idf weights stored at indexing time.
    fn normalise(
        numerators: HashMap<DocumentId, f64>,
        query_weight: f64,
        index: &Index,
    ) -> Response {
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();
        for (doc_id, numerator) in numerators {
            let Some(info) = index.doc_info(doc_id) else {
                continue;
            };
            let denominator = (info.weight_squared() * query_weight).sqrt();
            let score = if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            };
            scores.insert(doc_id, score);
        }
        response_from_scores(scores, index)
    }

    fn process_positional(&self, query_terms: &[Token], index: &Index, force: bool) -> Response {
        if let Some(guard) = df_guard(query_terms, index, 0.01, force) {
            return guard;
        }

        let pl = match filter_positional(query_terms, index) {
            Ok(Some(pl)) => pl,
            Ok(None) => {
                return Response::error("Could not find phrase using positional posting list");
            }
            Err(e) => return Response::error(e.to_string()),
        };

        let idf = index.idf(pl.len());
        let mut numerators: HashMap<DocumentId, f64> = HashMap::new();
        for entry in pl.iter() {
            *numerators.entry(entry.doc_id()).or_insert(0.0) += entry.frequency() as f64 * idf;
        }
        Self::normalise(numerators, 1.0, index)
    }

    fn process_bag(&self, query_terms: &[Token], index: &Index, force: bool) -> Response {
        if let Some(guard) = df_guard(query_terms, index, 0.05, force) {
            return guard;
        }

        let mut numerators: HashMap<DocumentId, f64> = HashMap::new();
        let mut query_weight = 0.0;

        for (term, q_tf) in query_frequencies(query_terms) {
            let found = index.with_posting_list(&term, |_, pl| {
                let entries: Vec<(DocumentId, u64)> =
                    pl.iter().map(|e| (e.doc_id(), e.frequency())).collect();
                (pl.len(), entries)
            });
            let (df, entries) = match found {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(e) => return Response::error(e.to_string()),
            };
            let idf = index.idf(df);

            for (doc_id, frequency) in entries {
                *numerators.entry(doc_id).or_insert(0.0) += frequency as f64 * idf * q_tf;
            }
            query_weight += q_tf * q_tf;
        }

        Self::normalise(numerators, query_weight, index)
    }
}

impl Default for CosineVsm {
    fn default() -> Self {
        Self::new()
    }
}

impl RelevanceRanker for CosineVsm {
    fn name(&self) -> &'static str {
        "COSINE"
    }

    fn process_query(&self, query_terms: &[Token], index: &Index, force: bool) -> Response {
        if index.is_positional() {
            self.process_positional(query_terms, index, force)
        } else {
            self.process_bag(query_terms, index, force)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::filter::FilterRegistry;
    use crate::analysis::token::TokenType;
    use crate::index::posting::PlKind;
    use crate::reader::trec::TrecDocument;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn query(terms: &[&str]) -> Vec<Token> {
        terms
            .iter()
            .map(|t| Token::new(*t, TokenType::Text))
            .collect()
    }

    fn small_index(dir: &std::path::Path) -> Index {
        let registry = Arc::new(FilterRegistry::with_defaults());
        let mut index = Index::create(dir, -1, PlKind::Basic, registry).unwrap();
        let texts = [
            "wolf wolf sheep",
            "wolf goat zebra",
            "ash birch cedar",
            "dill elm ferns",
            "gum hazel ivy",
        ];
        for (i, text) in texts.iter().enumerate() {
            let id = i as u64 + 1;
            index
                .insert(&TrecDocument::from_text(id, format!("D{id}"), text))
                .unwrap();
        }
        index.wait_insert();
        index
    }

    #[test]
    fn test_matching_documents_are_scored() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir.path().join("idx"));

        let ranker = CosineVsm::new();
        let resp = ranker.process_query(&query(&["goat"]), &index, false);
        assert!(!resp.is_error(), "{}", resp.error);
        let results = resp.results.as_ref().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document, "D2");
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_full_document_query_scores_highest() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir.path().join("idx"));

        let ranker = CosineVsm::new();
        let resp = ranker.process_query(&query(&["ash", "birch", "cedar"]), &index, false);
        assert!(!resp.is_error(), "{}", resp.error);
        let results = resp.results.as_ref().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document, "D3");
        assert!(results[0].score > 0.0);
    }

    #[test]
    fn test_guard_rejects_rare_query_without_force() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir.path().join("idx"));

        let ranker = CosineVsm::new();
        let resp = ranker.process_query(&query(&["absent"]), &index, false);
        assert!(resp.is_error());
        assert!(resp.error.contains("too low for index"));

        let forced = ranker.process_query(&query(&["absent"]), &index, true);
        assert!(!forced.is_error());
        assert!(forced.is_empty());
    }
}
