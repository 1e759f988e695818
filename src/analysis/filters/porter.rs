//! Porter stemming.

use porter_stemmer::stem;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

pub struct PorterFilter;

impl PorterFilter {
    pub fn new() -> Self {
        PorterFilter
    }
}

impl Default for PorterFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for PorterFilter {
    fn name(&self) -> &'static str {
        "porter"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        let stemmed = stem(&token.text);
        vec![token.clone_with_text(stemmed)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    #[test]
    fn test_stems_plurals_and_suffixes() {
        let mut f = PorterFilter::new();
        let out = f.apply(Token::new("played", TokenType::Text));
        assert_eq!(out[0].text, "plai");
        let out = f.apply(Token::new("jets", TokenType::Text));
        assert_eq!(out[0].text, "jet");
    }
}
