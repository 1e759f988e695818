//! Posting-list pruning strategies.
//!
//! Pruning trims a term's posting list after building, trading recall
//! for index size. The lexicon applies a pruner through
//! [`ConstrainedLexicon::prune_posting_list`](crate::index::lexicon::ConstrainedLexicon::prune_posting_list),
//! which keeps the cache size accounting in step with the removals.

use crate::analysis::token::DocumentId;
use crate::index::posting::PostingList;

/// Removes entries from a posting list according to some policy.
pub trait PostingListPruner {
    fn prune(&self, aggregate_tf: u64, pl: &mut PostingList);
}

/// Keeps only the `count` highest-frequency entries.
pub struct DocCountPruner {
    pub count: usize,
}

impl PostingListPruner for DocCountPruner {
    fn prune(&self, _aggregate_tf: u64, pl: &mut PostingList) {
        let mut entries: Vec<(DocumentId, u64)> =
            pl.iter().map(|e| (e.doc_id(), e.frequency())).collect();
        // Higher frequency is better; ties keep the lower doc id.
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let doomed: Vec<DocumentId> = entries
            .iter()
            .skip(self.count)
            .map(|(doc_id, _)| *doc_id)
            .collect();
        pl.remove(&doomed);
    }
}

/// Removes entries whose frequency falls below
/// `mean + multiplier * stddev` of the list's frequencies, always
/// keeping at least one entry.
pub struct TfPruner {
    pub multiplier: f64,
}

impl PostingListPruner for TfPruner {
    fn prune(&self, aggregate_tf: u64, pl: &mut PostingList) {
        if pl.len() < 2 {
            return;
        }

        let mean = aggregate_tf as f64 / pl.len() as f64;
        let mut variance = 0.0;
        for entry in pl.iter() {
            let diff = mean - entry.frequency() as f64;
            variance += diff * diff;
        }
        let std_dev = (variance / pl.len() as f64).sqrt();
        let threshold = mean + self.multiplier * std_dev;

        let doomed: Vec<DocumentId> = pl
            .iter()
            .filter(|e| (e.frequency() as f64) < threshold)
            .map(|e| e.doc_id())
            .collect();
        for doc_id in doomed {
            if pl.len() <= 1 {
                break;
            }
            pl.remove(&[doc_id]);
        }
    }
}
