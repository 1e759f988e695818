//! BM25 ranking with Sparck-Jones idf.

use std::collections::HashMap;

use crate::analysis::token::{DocumentId, Token};
use crate::index::Index;
use crate::query::positional::filter_positional;
use crate::query::response::Response;
use crate::query::{RelevanceRanker, df_guard, query_frequencies, response_from_scores};

pub struct Bm25 {
    k1: f64,
    k2: f64,
    b: f64,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 {
            k1: 1.2,
            k2: 1.0,
            b: 0.75,
        }
    }
}

impl Bm25 {
    /// Per-document, per-term contribution before the idf factor.
    fn partial(&self, tf_d: f64, len_d: f64, avg_doc_len: f64, q_tf: f64) -> f64 {
        let mut partial = tf_d * (self.k1 + 1.0);
        partial /= tf_d + self.k1 * ((1.0 - self.b) + self.b * (len_d / avg_doc_len));
        partial * (((self.k2 + 1.0) * q_tf) / (self.k2 * q_tf))
    }

    /// Score the reduced phrase list as a single pseudo-term.
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
        let avg_doc_len = index.avg_doc_len();
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();

        for entry in pl.iter() {
            let Some(info) = index.doc_info(entry.doc_id()) else {
                continue;
            };
            let tf_d = 1.0 + (entry.frequency() as f64).ln();
            *scores.entry(entry.doc_id()).or_insert(0.0) +=
                idf * self.partial(tf_d, info.term_count as f64, avg_doc_len, 1.0);
        }

        response_from_scores(scores, index)
    }

    fn process_bag(&self, query_terms: &[Token], index: &Index, force: bool) -> Response {
        if let Some(guard) = df_guard(query_terms, index, 0.01, force) {
            return guard;
        }

        let avg_doc_len = index.avg_doc_len();
        let mut scores: HashMap<DocumentId, f64> = HashMap::new();

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
                let Some(info) = index.doc_info(doc_id) else {
                    continue;
                };
                let tf_d = 1.0 + (frequency as f64).ln();
                *scores.entry(doc_id).or_insert(0.0) +=
                    idf * self.partial(tf_d, info.term_count as f64, avg_doc_len, q_tf);
            }
        }

        response_from_scores(scores, index)
    }
}

impl RelevanceRanker for Bm25 {
    fn name(&self) -> &'static str {
        "BM25"
    }

    fn process_query(&self, query_terms: &[Token], index: &Index, force: bool) -> Response {
        if index.is_positional() {
            self.process_positional(query_terms, index, force)
        } else {
            self.process_bag(query_terms, index, force)
        }
    }
}
