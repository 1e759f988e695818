//! Stop-word removal from a word-list file.

use std::fs::File;
use std::io::{BufReader, Read};

use ahash::AHashSet;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;
use crate::error::Result;

pub struct StopWordFilter {
    words: AHashSet<String>,
    /// Where the word list came from; written back out on save so the
    /// filter can be reinstantiated.
    source: String,
}

impl StopWordFilter {
    /// Read a whitespace-separated word list.
    pub fn from_reader(r: impl Read, source: impl Into<String>) -> Result<Self> {
        let mut raw = String::new();
        let mut reader = BufReader::new(r);
        reader.read_to_string(&mut raw)?;

        let words = raw.split_whitespace().map(str::to_string).collect();
        Ok(StopWordFilter {
            words,
            source: source.into(),
        })
    }

    pub fn from_path(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, path)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Filter for StopWordFilter {
    fn name(&self) -> &'static str {
        "stopwords"
    }

    fn args(&self) -> String {
        self.source.clone()
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        if self.words.contains(&token.text) {
            Vec::new()
        } else {
            vec![token]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    #[test]
    fn test_removes_listed_words() {
        let mut f = StopWordFilter::from_reader("the a an".as_bytes(), "inline").unwrap();
        assert_eq!(f.len(), 3);
        assert!(f.apply(Token::new("the", TokenType::Text)).is_empty());
        assert_eq!(f.apply(Token::new("silver", TokenType::Text)).len(), 1);
        assert_eq!(f.args(), "inline");
    }
}
