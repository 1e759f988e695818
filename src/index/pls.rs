//! Posting-list sets: the unit of serialisation and eviction.
//!
//! A set bundles the posting lists of the terms that share one storage tag.
//! On disk a set is line-oriented, one entry per line with the term
//! repeated: `<term> # <entry-payload>`.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Write};

use crate::analysis::token::DocumentId;
use crate::error::{Result, TrawlError};
use crate::index::posting::{PlKind, PostingEntry, PostingList};

/// Separator between the term and the entry payload on a dump line. Terms
/// may contain spaces (phrases), so the payload is split off at the last
/// occurrence.
const TERM_SEPARATOR: &str = " # ";

/// A named bundle of `(term -> posting list)` pairs.
#[derive(Debug, Clone)]
pub struct PostingListSet {
    tag: String,
    kind: PlKind,
    lists: BTreeMap<String, PostingList>,
    /// Sum of posting-list lengths; maintained by the lexicon and verified
    /// by [`recalculate_size`](Self::recalculate_size).
    pub size: usize,
}

impl PostingListSet {
    pub fn new(tag: impl Into<String>, kind: PlKind) -> Self {
        PostingListSet {
            tag: tag.into(),
            kind,
            lists: BTreeMap::new(),
            size: 0,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> PlKind {
        self.kind
    }

    /// Number of posting lists stored here.
    pub fn term_count(&self) -> usize {
        self.lists.len()
    }

    /// The posting list for a term, created empty in the configured variant
    /// when absent.
    pub fn get_mut(&mut self, term: &str) -> &mut PostingList {
        let kind = self.kind;
        self.lists
            .entry(term.to_string())
            .or_insert_with(|| PostingList::new(kind))
    }

    pub fn get(&self, term: &str) -> Option<&PostingList> {
        self.lists.get(term)
    }

    /// The posting list for a term, if present; never creates one.
    pub fn get_term_mut(&mut self, term: &str) -> Option<&mut PostingList> {
        self.lists.get_mut(term)
    }

    /// Iterate `(term, posting list)` pairs in term order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.lists.iter().map(|(t, pl)| (t.as_str(), pl))
    }

    /// Walk the lists and recompute `size`. Used as a correctness check
    /// after loads and before dumps.
    pub fn recalculate_size(&mut self) -> usize {
        self.size = self.lists.values().map(|pl| pl.len()).sum();
        self.size
    }

    /// Write every entry as `<term> # <payload>` lines, terms in map order,
    /// entries in ascending doc-id order.
    pub fn dump<W: Write>(&self, w: &mut W) -> Result<()> {
        for (term, pl) in &self.lists {
            for entry in pl.iter() {
                writeln!(w, "{term}{TERM_SEPARATOR}{}", entry.serialize())?;
            }
        }
        Ok(())
    }

    /// Read entries dumped by [`dump`](Self::dump), returning the number of
    /// entries read. Blank lines are tolerated; a line without a payload is
    /// corrupt.
    pub fn load<R: BufRead>(&mut self, r: &mut R) -> Result<usize> {
        let mut entries = 0usize;
        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(split_at) = line.rfind(TERM_SEPARATOR) else {
                return Err(TrawlError::corrupt(format!(
                    "posting list set '{}': malformed line '{line}'",
                    self.tag
                )));
            };
            let term = &line[..split_at];
            let payload = &line[split_at + TERM_SEPARATOR.len()..];

            let mut fields = payload.split_whitespace();
            let doc_id: DocumentId = match fields.next() {
                Some(raw) => raw.parse().map_err(|_| {
                    TrawlError::corrupt(format!(
                        "posting list set '{}': bad doc id in '{line}'",
                        self.tag
                    ))
                })?,
                None => {
                    return Err(TrawlError::corrupt(format!(
                        "posting list set '{}': empty entry payload for '{term}'",
                        self.tag
                    )));
                }
            };

            match self.kind {
                PlKind::Basic => {
                    let frequency: u64 = fields
                        .next()
                        .ok_or_else(|| {
                            TrawlError::corrupt(format!(
                                "posting list set '{}': missing frequency for '{term}'",
                                self.tag
                            ))
                        })?
                        .parse()
                        .map_err(|_| {
                            TrawlError::corrupt(format!(
                                "posting list set '{}': bad frequency in '{line}'",
                                self.tag
                            ))
                        })?;
                    self.get_mut(term)
                        .insert_complete(PostingEntry::Basic { doc_id, frequency });
                }
                PlKind::Positional => {
                    let mut entry = PostingEntry::new(PlKind::Positional, doc_id);
                    let mut any = false;
                    for raw in fields {
                        let pos: u32 = raw.parse().map_err(|_| {
                            TrawlError::corrupt(format!(
                                "posting list set '{}': bad position in '{line}'",
                                self.tag
                            ))
                        })?;
                        entry.add_position(pos);
                        any = true;
                    }
                    if !any {
                        return Err(TrawlError::corrupt(format!(
                            "posting list set '{}': no positions for '{term}' in '{line}'",
                            self.tag
                        )));
                    }
                    self.get_mut(term).insert_complete(entry);
                }
            }
            entries += 1;
        }

        self.size = self.lists.values().map(|pl| pl.len()).sum();
        Ok(entries)
    }

    /// Move the entire posting list for `term` from `src` to `dst`,
    /// adjusting both size counters. Returns the number of entries moved.
    pub fn transfer(src: &mut PostingListSet, dst: &mut PostingListSet, term: &str) -> usize {
        let Some(pl) = src.lists.remove(term) else {
            return 0;
        };
        let moved = pl.len();
        src.size -= moved;
        dst.size += moved;
        dst.lists.insert(term.to_string(), pl);
        moved
    }
}

impl fmt::Display for PostingListSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.tag)?;
        for term in self.lists.keys() {
            write!(f, "{term} ")?;
        }
        f.write_str("]")
    }
}
