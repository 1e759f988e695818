//! The token filter contract and the filter factory registry.
//!
//! Filters transform a token stream one token at a time. Buffering filters
//! (phrases) release their output when the document completes; the runtime
//! calls [`Filter::flush`] when the `Null` sentinel passes through.

use std::collections::HashMap;

use crate::analysis::token::Token;
use crate::error::{Result, TrawlError};

/// A token stream transformer.
///
/// `apply` is a pure function from one token to zero or more tokens.
/// Filters never see `Null` sentinels or tokens marked final (unless they
/// opt in via [`ignores_final`](Filter::ignores_final)); the runtime routes
/// those around them.
pub trait Filter: Send {
    /// Registry name of this filter.
    fn name(&self) -> &'static str;

    /// Serialized constructor arguments, written to `filters.mdt`.
    fn args(&self) -> String {
        String::new()
    }

    /// When true, tokens marked final are still passed to `apply`.
    fn ignores_final(&self) -> bool {
        false
    }

    /// Transform one token into zero or more tokens.
    fn apply(&mut self, token: Token) -> Vec<Token>;

    /// The current document is complete; emit anything buffered.
    fn flush(&mut self) -> Vec<Token> {
        Vec::new()
    }
}

/// Run one filter over a token, honouring the final flag and the document
/// sentinel.
pub fn run_filter(filter: &mut dyn Filter, token: Token, out: &mut Vec<Token>) {
    if token.is_null() {
        out.extend(filter.flush());
        out.push(token);
    } else if token.is_final && !filter.ignores_final() {
        out.push(token);
    } else {
        out.extend(filter.apply(token));
    }
}

/// Apply a whole chain synchronously. Used at query time, where the input
/// is small and threading the live pipeline would buy nothing.
pub fn apply_chain(filters: &mut [Box<dyn Filter>], tokens: Vec<Token>) -> Vec<Token> {
    let mut current = tokens;
    for filter in filters {
        let mut next = Vec::with_capacity(current.len());
        for token in current {
            run_filter(filter.as_mut(), token, &mut next);
        }
        current = next;
    }
    current
}

type FilterFactory = Box<dyn Fn(&str) -> Result<Box<dyn Filter>> + Send + Sync>;

/// Maps filter names to constructors. Built explicitly at startup and
/// passed where needed; there is no process-global registry.
pub struct FilterRegistry {
    factories: HashMap<String, FilterFactory>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        FilterRegistry {
            factories: HashMap::new(),
        }
    }

    /// A registry holding every built-in filter.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        crate::analysis::filters::register_defaults(&mut reg);
        reg
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&str) -> Result<Box<dyn Filter>> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Instantiate a filter from its name and serialized arguments.
    pub fn instantiate(&self, name: &str, args: &str) -> Result<Box<dyn Filter>> {
        match self.factories.get(name) {
            Some(factory) => factory(args),
            None => Err(TrawlError::UnknownFilter(name.to_string())),
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    struct Upcase;

    impl Filter for Upcase {
        fn name(&self) -> &'static str {
            "upcase"
        }
        fn apply(&mut self, token: Token) -> Vec<Token> {
            let text = token.text.to_uppercase();
            vec![token.clone_with_text(text)]
        }
    }

    #[test]
    fn test_final_tokens_bypass_filters() {
        let mut filters: Vec<Box<dyn Filter>> = vec![Box::new(Upcase)];
        let mut tok = Token::new("keep", TokenType::Text);
        tok.is_final = true;

        let out = apply_chain(&mut filters, vec![tok, Token::new("change", TokenType::Text)]);
        assert_eq!(out[0].text, "keep");
        assert_eq!(out[1].text, "CHANGE");
    }

    #[test]
    fn test_sentinel_passes_through() {
        let mut filters: Vec<Box<dyn Filter>> = vec![Box::new(Upcase)];
        let out = apply_chain(&mut filters, vec![Token::null()]);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_null());
    }

    #[test]
    fn test_registry_unknown_filter() {
        let reg = FilterRegistry::new();
        assert!(reg.instantiate("nope", "").is_err());
    }
}
