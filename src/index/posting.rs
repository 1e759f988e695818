//! Posting-list entries and posting lists.
//!
//! A posting list maps document ids to per-document occurrence data for one
//! term. Two variants exist: basic lists record only a frequency per
//! document, positional lists record every occurrence position. The variant
//! is fixed per index and selected through [`PlKind`].

use std::collections::BTreeMap;
use std::fmt;

use crate::analysis::token::{DocumentId, Token};
use crate::error::{Result, TrawlError};

/// Which posting-list variant an index stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlKind {
    Basic,
    Positional,
}

impl PlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlKind::Basic => "basic",
            PlKind::Positional => "positional",
        }
    }

    pub fn parse(s: &str) -> Result<PlKind> {
        match s {
            "basic" => Ok(PlKind::Basic),
            "positional" => Ok(PlKind::Positional),
            other => Err(TrawlError::corrupt(format!(
                "unknown posting list type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of a posting list: the occurrence record for a single
/// document.
#[derive(Debug, Clone, PartialEq)]
pub enum PostingEntry {
    Basic {
        doc_id: DocumentId,
        frequency: u64,
    },
    Positional {
        doc_id: DocumentId,
        /// Strictly ascending occurrence positions.
        positions: Vec<u32>,
    },
}

impl PostingEntry {
    /// Create an empty entry of the given variant.
    pub fn new(kind: PlKind, doc_id: DocumentId) -> Self {
        match kind {
            PlKind::Basic => PostingEntry::Basic {
                doc_id,
                frequency: 0,
            },
            PlKind::Positional => PostingEntry::Positional {
                doc_id,
                positions: Vec::new(),
            },
        }
    }

    pub fn doc_id(&self) -> DocumentId {
        match self {
            PostingEntry::Basic { doc_id, .. } => *doc_id,
            PostingEntry::Positional { doc_id, .. } => *doc_id,
        }
    }

    /// The number of occurrences this entry records.
    pub fn frequency(&self) -> u64 {
        match self {
            PostingEntry::Basic { frequency, .. } => *frequency,
            PostingEntry::Positional { positions, .. } => positions.len() as u64,
        }
    }

    /// Occurrence positions; empty for the basic variant.
    pub fn positions(&self) -> &[u32] {
        match self {
            PostingEntry::Basic { .. } => &[],
            PostingEntry::Positional { positions, .. } => positions,
        }
    }

    /// Record an occurrence. The basic variant counts it and discards the
    /// position; the positional variant inserts it keeping the position list
    /// sorted. A position already present is not recorded twice.
    pub fn add_position(&mut self, pos: u32) {
        match self {
            PostingEntry::Basic { frequency, .. } => *frequency += 1,
            PostingEntry::Positional { positions, .. } => {
                if let Err(at) = positions.binary_search(&pos) {
                    positions.insert(at, pos);
                }
            }
        }
    }

    /// Line payload: `<doc-id> <freq>` for basic, `<doc-id> <p1> <p2> ...`
    /// for positional.
    pub fn serialize(&self) -> String {
        match self {
            PostingEntry::Basic { doc_id, frequency } => format!("{doc_id} {frequency}"),
            PostingEntry::Positional { doc_id, positions } => {
                let mut out = doc_id.to_string();
                for p in positions {
                    out.push(' ');
                    out.push_str(&p.to_string());
                }
                out
            }
        }
    }
}

/// A posting list: document ids mapped to entries, iterated in ascending
/// doc-id order.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingList {
    kind: PlKind,
    entries: BTreeMap<DocumentId, PostingEntry>,
}

impl PostingList {
    pub fn new(kind: PlKind) -> Self {
        PostingList {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> PlKind {
        self.kind
    }

    pub fn is_positional(&self) -> bool {
        self.kind == PlKind::Positional
    }

    /// Number of entries, which is this term's document frequency.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, doc_id: DocumentId) -> Option<&PostingEntry> {
        self.entries.get(&doc_id)
    }

    /// Term frequency of this term in the given document; 0 when absent.
    pub fn tf_d(&self, doc_id: DocumentId) -> u64 {
        self.get(doc_id).map_or(0, |e| e.frequency())
    }

    /// Aggregate frequency across all entries (the term's collection
    /// frequency).
    pub fn total_frequency(&self) -> u64 {
        self.entries.values().map(|e| e.frequency()).sum()
    }

    /// Create an entry of this list's variant, not yet inserted.
    pub fn make_entry(&self, doc_id: DocumentId) -> PostingEntry {
        PostingEntry::new(self.kind, doc_id)
    }

    /// Record a token occurrence. Returns true iff a new entry was created
    /// for the token's document.
    pub fn insert_entry(&mut self, token: &Token) -> bool {
        self.insert_raw(token.doc_id, token.position)
    }

    /// Record an occurrence by raw doc id and position. Returns true iff a
    /// new entry was created.
    pub fn insert_raw(&mut self, doc_id: DocumentId, position: u32) -> bool {
        match self.entries.get_mut(&doc_id) {
            Some(entry) => {
                entry.add_position(position);
                false
            }
            None => {
                let mut entry = PostingEntry::new(self.kind, doc_id);
                entry.add_position(position);
                self.entries.insert(doc_id, entry);
                true
            }
        }
    }

    /// Insert a fully-built entry.
    ///
    /// Panics if an entry for the same document already exists; a duplicate
    /// here means the caller's accounting is broken.
    pub fn insert_complete(&mut self, entry: PostingEntry) {
        let doc_id = entry.doc_id();
        let previous = self.entries.insert(doc_id, entry);
        assert!(
            previous.is_none(),
            "duplicate posting entry for document {doc_id}"
        );
    }

    /// Remove the entries for the given documents, returning how many were
    /// actually present.
    pub fn remove(&mut self, doc_ids: &[DocumentId]) -> usize {
        doc_ids
            .iter()
            .filter(|id| self.entries.remove(id).is_some())
            .count()
    }

    /// Iterate entries in ascending doc-id order.
    pub fn iter(&self) -> impl Iterator<Item = &PostingEntry> {
        self.entries.values()
    }

    /// Positional reduction: keep positions of `other` that lie at most
    /// `within` positions at or after some position of `self`, per document.
    ///
    /// For every document present in both lists the two sorted position
    /// lists are walked in step; a position `q` of `other` is emitted when
    /// some position `p` of `self` satisfies `p <= q <= p + within`.
    /// Documents yielding no positions are dropped, as are documents missing
    /// from either side. With `within == 0` only exactly coinciding
    /// positions survive.
    pub fn filter_sequential(&self, other: &PostingList, within: u32) -> Result<PostingList> {
        if !self.is_positional() || !other.is_positional() {
            return Err(TrawlError::invalid_argument(
                "sequential filtering requires positional posting lists",
            ));
        }

        let mut out = PostingList::new(PlKind::Positional);
        for (doc_id, left) in &self.entries {
            let Some(right) = other.entries.get(doc_id) else {
                continue;
            };

            let a = left.positions();
            let b = right.positions();
            let mut entry = PostingEntry::new(PlKind::Positional, *doc_id);
            let mut matched = false;

            let (mut i, mut j) = (0usize, 0usize);
            while i < a.len() && j < b.len() {
                if b[j] < a[i] {
                    j += 1;
                } else if b[j] <= a[i] + within {
                    entry.add_position(b[j]);
                    matched = true;
                    j += 1;
                } else {
                    i += 1;
                }
            }

            if matched {
                out.insert_complete(entry);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PostingList {
    /// Entries rendered as their serialized payloads, joined with " | ".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in self.iter() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(&entry.serialize())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    fn tok(text: &str, doc_id: DocumentId, position: u32) -> Token {
        let mut t = Token::new(text, TokenType::Text);
        t.doc_id = doc_id;
        t.position = position;
        t
    }

    fn positional_with(doc_id: DocumentId, positions: &[u32]) -> PostingEntry {
        let mut e = PostingEntry::new(PlKind::Positional, doc_id);
        for p in positions {
            e.add_position(*p);
        }
        e
    }

    #[test]
    fn test_basic_entry_counts_and_discards_positions() {
        let mut e = PostingEntry::new(PlKind::Basic, 3);
        e.add_position(17);
        e.add_position(4);
        assert_eq!(e.frequency(), 2);
        assert!(e.positions().is_empty());
        assert_eq!(e.serialize(), "3 2");
    }

    #[test]
    fn test_positional_entry_keeps_positions_sorted() {
        let e = positional_with(3, &[9, 2, 5, 2]);
        assert_eq!(e.positions(), &[2, 5, 9]);
        assert_eq!(e.frequency(), 3);
        assert_eq!(e.serialize(), "3 2 5 9");
    }

    #[test]
    fn test_insert_entry_reports_new_documents() {
        let mut pl = PostingList::new(PlKind::Positional);
        assert!(pl.insert_entry(&tok("the", 1, 9)));
        assert!(!pl.insert_entry(&tok("the", 1, 12)));
        assert!(pl.insert_entry(&tok("the", 2, 3)));
        assert_eq!(pl.len(), 2);
        assert_eq!(pl.tf_d(1), 2);
        assert_eq!(pl.tf_d(5), 0);
    }

    #[test]
    fn test_iteration_is_doc_id_ascending() {
        let mut pl = PostingList::new(PlKind::Basic);
        pl.insert_raw(42, 1);
        pl.insert_raw(7, 1);
        pl.insert_raw(19, 1);
        let ids: Vec<_> = pl.iter().map(|e| e.doc_id()).collect();
        assert_eq!(ids, vec![7, 19, 42]);
    }

    #[test]
    #[should_panic(expected = "duplicate posting entry")]
    fn test_insert_complete_panics_on_duplicate() {
        let mut pl = PostingList::new(PlKind::Positional);
        pl.insert_complete(positional_with(5, &[1]));
        pl.insert_complete(positional_with(5, &[2]));
    }

    #[test]
    fn test_remove_returns_removed_count() {
        let mut pl = PostingList::new(PlKind::Basic);
        pl.insert_raw(1, 1);
        pl.insert_raw(2, 1);
        assert_eq!(pl.remove(&[1, 9]), 1);
        assert_eq!(pl.len(), 1);
    }

    #[test]
    fn test_filter_sequential_adjacent_phrase() {
        // "silver" at 10, "ball" at 11: within 1 chains them.
        let mut silver = PostingList::new(PlKind::Positional);
        silver.insert_raw(1001, 10);
        let mut ball = PostingList::new(PlKind::Positional);
        ball.insert_raw(1001, 11);
        ball.insert_raw(1002, 4);

        let filtered = silver.filter_sequential(&ball, 1).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get(1001).unwrap().positions(), &[11]);
    }

    #[test]
    fn test_filter_sequential_within_zero_is_exact_coincidence() {
        let mut a = PostingList::new(PlKind::Positional);
        a.insert_raw(1, 3);
        a.insert_raw(1, 8);
        let mut b = PostingList::new(PlKind::Positional);
        b.insert_raw(1, 2);
        b.insert_raw(1, 8);
        b.insert_raw(1, 9);

        let filtered = a.filter_sequential(&b, 0).unwrap();
        assert_eq!(filtered.get(1).unwrap().positions(), &[8]);
    }

    #[test]
    fn test_filter_sequential_drops_missing_documents() {
        let mut a = PostingList::new(PlKind::Positional);
        a.insert_raw(1, 5);
        a.insert_raw(2, 5);
        let mut b = PostingList::new(PlKind::Positional);
        b.insert_raw(2, 6);

        let filtered = a.filter_sequential(&b, 1).unwrap();
        assert!(filtered.get(1).is_none());
        assert_eq!(filtered.get(2).unwrap().positions(), &[6]);
    }

    #[test]
    fn test_filter_sequential_output_is_subset_of_right_operand() {
        let mut a = PostingList::new(PlKind::Positional);
        a.insert_raw(1, 1);
        a.insert_raw(1, 20);
        let mut b = PostingList::new(PlKind::Positional);
        b.insert_raw(1, 2);
        b.insert_raw(1, 21);
        b.insert_raw(1, 40);

        let filtered = a.filter_sequential(&b, 1).unwrap();
        let got = filtered.get(1).unwrap().positions().to_vec();
        assert_eq!(got, vec![2, 21]);
        for p in got {
            assert!(b.get(1).unwrap().positions().contains(&p));
        }
    }

    #[test]
    fn test_filter_sequential_rejects_basic_lists() {
        let a = PostingList::new(PlKind::Basic);
        let b = PostingList::new(PlKind::Positional);
        assert!(a.filter_sequential(&b, 1).is_err());
        assert!(b.filter_sequential(&a, 1).is_err());
    }
}
