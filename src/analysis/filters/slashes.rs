//! Splits slash-joined alternatives (`and/or`) into separate tokens.

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

pub struct SlashFilter;

impl SlashFilter {
    pub fn new() -> Self {
        SlashFilter
    }
}

impl Default for SlashFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for SlashFilter {
    fn name(&self) -> &'static str {
        "slashes"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        if !token.text.contains('/') {
            return vec![token];
        }
        token
            .text
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| token.clone_with_text(p))
            .collect()
    }
}
