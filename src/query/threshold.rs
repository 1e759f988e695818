//! IDF-threshold query splitting.
//!
//! Low-idf terms are cheap and high-recall; a threshold below 1 issues
//! them first as their own group, with the full term set as the fallback.

use crate::analysis::token::Token;
use crate::error::Result;
use crate::index::Index;

/// Split query tokens into evaluation groups: the lowest-idf
/// `floor(threshold * n)` tokens first, then the full set, both in
/// ascending idf order. A threshold of 1 (or a degenerate query) yields a
/// single group. Unknown terms sort last.
pub fn threshold_groups(
    tokens: &[Token],
    threshold: f64,
    index: &Index,
) -> Result<Vec<Vec<Token>>> {
    if threshold >= 1.0 || tokens.len() < 2 {
        return Ok(vec![tokens.to_vec()]);
    }

    let mut keyed: Vec<(f64, Token)> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let idf = index
            .with_posting_list(&token.text, |_, pl| index.idf(pl.len()))?
            .unwrap_or(f64::INFINITY);
        keyed.push((idf, token.clone()));
    }
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let sorted: Vec<Token> = keyed.into_iter().map(|(_, t)| t).collect();
    let prefix_len = (threshold * sorted.len() as f64).floor() as usize;

    let mut groups = Vec::with_capacity(2);
    if prefix_len > 0 {
        groups.push(sorted[..prefix_len].to_vec());
    }
    groups.push(sorted);
    Ok(groups)
}
