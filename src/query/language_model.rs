//! Dirichlet-smoothed query-likelihood ranking.

use std::collections::HashMap;

use crate::analysis::token::{DocumentId, Token};
use crate::index::Index;
use crate::query::positional::filter_positional;
use crate::query::response::Response;
use crate::query::{RelevanceRanker, df_guard, query_frequencies, response_from_scores};

/// Scale factor keeping every per-term log positive, so matching more
/// query terms can only improve a document.
const LOG_SCALE: f64 = 1000.0;

pub struct DirichletQl {
    mu: Option<f64>,
}

impl DirichletQl {
    pub fn new(mu: Option<f64>) -> Self {
        DirichletQl { mu }
    }

    fn effective_mu(&self, index: &Index) -> f64 {
        self.mu.unwrap_or_else(|| index.avg_doc_len().sqrt())
    }

    /// One term's smoothed log-likelihood contribution for one document.
    fn term_log(&self, tf_d: f64, len_d: f64, cf: f64, collection_terms: f64, mu: f64) -> f64 {
        let smoothed = (tf_d + mu * (cf / collection_terms)) / (len_d + mu);
        (LOG_SCALE * smoothed).ln()
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

        let mu = self.effective_mu(index);
        let collection_terms = index.total_term_count() as f64;
        let cf = pl.total_frequency() as f64;
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();

        for entry in pl.iter() {
            let Some(info) = index.doc_info(entry.doc_id()) else {
                continue;
            };
            *scores.entry(entry.doc_id()).or_insert(0.0) += self.term_log(
                entry.frequency() as f64,
                info.term_count as f64,
                cf,
                collection_terms,
                mu,
            );
        }

        response_from_scores(scores, index)
    }

    fn process_bag(&self, query_terms: &[Token], index: &Index, force: bool) -> Response {
        if let Some(guard) = df_guard(query_terms, index, 0.05, force) {
            return guard;
        }

        let mu = self.effective_mu(index);
        let collection_terms = index.total_term_count() as f64;
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();

        for (term, _q_tf) in query_frequencies(query_terms) {
            let found = index.with_posting_list(&term, |t, pl| {
                let entries: Vec<(DocumentId, u64)> =
                    pl.iter().map(|e| (e.doc_id(), e.frequency())).collect();
                (t.tf, entries)
            });
            let (cf, entries) = match found {
                Ok(Some(data)) => data,
                Ok(None) => continue,
                Err(e) => return Response::error(e.to_string()),
            };

            for (doc_id, frequency) in entries {
                let Some(info) = index.doc_info(doc_id) else {
                    continue;
                };
                *scores.entry(doc_id).or_insert(0.0) += self.term_log(
                    frequency as f64,
                    info.term_count as f64,
                    cf as f64,
                    collection_terms,
                    mu,
                );
            }
        }

        response_from_scores(scores, index)
    }
}

impl Default for DirichletQl {
    fn default() -> Self {
        DirichletQl { mu: None }
    }
}

impl RelevanceRanker for DirichletQl {
    fn name(&self) -> &'static str {
        "LM"
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
        let texts = ["the cat sat", "the cat the hat", "dogs bark loud"];
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
    fn test_higher_tf_ranks_first() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir.path().join("idx"));

        let ranker = DirichletQl::default();
        let resp = ranker.process_query(&query(&["the"]), &index, false);
        assert!(!resp.is_error(), "{}", resp.error);
        let results = resp.results.as_ref().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document, "D2");
        assert_eq!(results[1].document, "D1");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_matching_more_terms_never_hurts() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir.path().join("idx"));

        let ranker = DirichletQl::default();
        let one = ranker.process_query(&query(&["cat"]), &index, false);
        let two = ranker.process_query(&query(&["cat", "hat"]), &index, false);

        let score_of = |r: &Response, doc: &str| {
            r.results
                .as_ref()
                .unwrap()
                .iter()
                .find(|x| x.document == doc)
                .unwrap()
                .score
        };
        // The scale factor keeps each matched term's log positive, so D2
        // gains from also containing "hat".
        assert!(score_of(&two, "D2") > score_of(&one, "D2"));
    }

    #[test]
    fn test_explicit_mu_is_respected() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir.path().join("idx"));

        let fixed = DirichletQl::new(Some(50.0));
        let resp = fixed.process_query(&query(&["cat"]), &index, false);
        assert!(!resp.is_error());
        // Heavy smoothing pulls both documents toward the collection
        // model; both still rank.
        assert_eq!(resp.results.as_ref().unwrap().len(), 2);
    }
}
