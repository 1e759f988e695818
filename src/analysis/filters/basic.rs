//! Pass-through, lowercasing, and digit-normalising filters.

use regex::Regex;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

/// Passes every token through unchanged.
pub struct NullFilter;

impl NullFilter {
    pub fn new() -> Self {
        NullFilter
    }
}

impl Default for NullFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for NullFilter {
    fn name(&self) -> &'static str {
        "null"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        vec![token]
    }
}

/// Lowercases token text. Applies to final tokens as well, since case
/// folding loses nothing a prior filter produced.
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl Default for LowercaseFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for LowercaseFilter {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn ignores_final(&self) -> bool {
        true
    }

    fn apply(&mut self, mut token: Token) -> Vec<Token> {
        token.text = token.text.to_lowercase();
        vec![token]
    }
}

/// Normalises comma-grouped numbers: `10,000,000` becomes `10000000`, and a
/// zero decimal part is dropped (`12.00` becomes `12`). Comma groupings
/// that are not thousands separators are left alone.
pub struct DigitsFilter {
    pattern: Regex,
}

impl DigitsFilter {
    pub fn new() -> Self {
        DigitsFilter {
            pattern: Regex::new(r"^((?:\d+,)*\d+)(?:\.(\d+))?$").expect("digits pattern"),
        }
    }
}

impl Default for DigitsFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for DigitsFilter {
    fn name(&self) -> &'static str {
        "digits"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        if let Some(captures) = self.pattern.captures(&token.text) {
            let grouped = captures.get(1).map_or("", |m| m.as_str());
            let mut repr = String::with_capacity(grouped.len());

            let mut valid = true;
            for (i, group) in grouped.split(',').enumerate() {
                if i > 0 && group.len() != 3 {
                    valid = false;
                    break;
                }
                repr.push_str(group);
            }

            if valid {
                if let Some(decimal) = captures.get(2) {
                    if decimal.as_str().parse::<u64>().map_or(false, |d| d > 0) {
                        repr.push('.');
                        repr.push_str(decimal.as_str());
                    }
                }

                if repr != token.text {
                    return vec![token.clone_with_text(repr)];
                }
            }
        }

        vec![token]
    }
}
