//! Left-to-right positional phrase reduction.

use crate::analysis::token::Token;
use crate::error::Result;
use crate::index::Index;
use crate::index::posting::PostingList;

/// Reduce the query tokens to a synthetic posting list of phrase
/// occurrences.
///
/// The accumulator starts as the first known term's posting list; each
/// subsequent known term's list is chained on with
/// [`filter_sequential`](PostingList::filter_sequential). Unknown terms
/// widen the window by one instead of breaking the chain, since the
/// missing word still occupies a position. Returns `None` when no query
/// term is known.
pub fn filter_positional(query_terms: &[Token], index: &Index) -> Result<Option<PostingList>> {
    let mut acc: Option<PostingList> = None;
    let mut within = 1u32;

    for term in query_terms {
        let found = index.with_posting_list(&term.text, |_, pl| pl.clone())?;
        match (acc.take(), found) {
            (Some(current), Some(pl)) => {
                acc = Some(current.filter_sequential(&pl, within)?);
                within = 1;
            }
            (Some(current), None) => {
                acc = Some(current);
                within += 1;
            }
            (None, Some(pl)) => acc = Some(pl),
            (None, None) => {}
        }
    }

    Ok(acc)
}
