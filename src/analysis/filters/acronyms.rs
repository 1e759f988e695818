//! Dotted acronym normalisation: `Ph.D` becomes `phd`, `U.S.A` becomes
//! `usa`. Undotted words are left for later filters.

use regex::Regex;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

pub struct AcronymFilter {
    pattern: Regex,
}

impl AcronymFilter {
    pub fn new() -> Self {
        AcronymFilter {
            pattern: Regex::new(r"[A-Z][a-z]*(?:\.[A-Z][a-z]*)+").expect("acronym pattern"),
        }
    }
}

impl Default for AcronymFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for AcronymFilter {
    fn name(&self) -> &'static str {
        "acronyms"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        if self.pattern.is_match(&token.text) {
            let collapsed: String = token
                .text
                .chars()
                .filter(|c| *c != '.')
                .flat_map(|c| c.to_lowercase())
                .collect();
            return vec![token.clone_with_text(collapsed)];
        }
        vec![token]
    }
}
