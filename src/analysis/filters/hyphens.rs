//! Hyphenated compound handling.
//!
//! Letter-number compounds collapse (`F-16` becomes `F16`, plus the letter
//! part when it is long enough to stand alone). Known prefixes stay glued
//! to their stem; other hyphenated words are emitted both split and
//! joined. Tokens with stray digits (`141-19`) pass through untouched.

use regex::Regex;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

const WORD_PREFIXES: &[&str] = &[
    "anti", "intra", "re", "co", "macro", "semi", "de", "micro", "sub", "hyper", "non", "supra",
    "hypo", "pre", "trans", "infra", "pseudo", "un",
];

fn is_hyphen(c: char) -> bool {
    matches!(c, '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}')
}

pub struct HyphenFilter {
    alpha_num: Regex,
    num_alpha: Regex,
}

impl HyphenFilter {
    pub fn new() -> Self {
        HyphenFilter {
            alpha_num: Regex::new(r"^([A-Za-z]+)-([0-9]+)$").expect("alpha-num pattern"),
            num_alpha: Regex::new(r"^([0-9]+)-([A-Za-z]+)$").expect("num-alpha pattern"),
        }
    }
}

impl Default for HyphenFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for HyphenFilter {
    fn name(&self) -> &'static str {
        "hyphens"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        let mut out = Vec::with_capacity(2);

        if let Some(m) = self.alpha_num.captures(&token.text) {
            let alpha = &m[1];
            let num = &m[2];
            out.push(token.clone_with_text(format!("{alpha}{num}")));
            if alpha.len() >= 3 {
                out.push(token.clone_with_text(alpha));
            }
            return out;
        }

        if let Some(m) = self.num_alpha.captures(&token.text) {
            let num = &m[1];
            let alpha = &m[2];
            out.push(token.clone_with_text(format!("{num}{alpha}")));
            if alpha.len() >= 3 {
                out.push(token.clone_with_text(alpha));
            }
            return out;
        }

        if token.text.chars().any(|c| c.is_ascii_digit()) {
            out.push(token);
            return out;
        }

        let parts: Vec<&str> = token
            .text
            .split(is_hyphen)
            .filter(|p| !p.is_empty())
            .collect();

        match parts.len() {
            0 | 1 => out.push(token),
            2 => {
                if WORD_PREFIXES.contains(&parts[0]) {
                    out.push(token.clone_with_text(parts.concat()));
                    out.push(token.clone_with_text(parts[1]));
                } else {
                    out.push(token.clone_with_text(parts[0]));
                    out.push(token.clone_with_text(parts[1]));
                }
            }
            _ => {
                for part in &parts {
                    out.push(token.clone_with_text(*part));
                }
                out.push(token.clone_with_text(parts.concat()));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    fn apply_one(text: &str) -> Vec<String> {
        let mut f = HyphenFilter::new();
        f.apply(Token::new(text, TokenType::Text))
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_alpha_number_compounds() {
        assert_eq!(apply_one("CDC-50"), vec!["CDC50", "CDC"]);
        assert_eq!(apply_one("F-16"), vec!["F16"]);
        assert_eq!(apply_one("1-hour"), vec!["1hour", "hour"]);
    }

    #[test]
    fn test_multi_hyphen_words() {
        assert_eq!(
            apply_one("part-of-speech"),
            vec!["part", "of", "speech", "partofspeech"]
        );
    }

    #[test]
    fn test_prefixed_words_keep_prefix() {
        assert_eq!(apply_one("pre-rebellion"), vec!["prerebellion", "rebellion"]);
        assert_eq!(apply_one("silver-ball"), vec!["silver", "ball"]);
    }

    #[test]
    fn test_numeric_ranges_pass_through() {
        assert_eq!(apply_one("141-19"), vec!["141-19"]);
    }

    #[test]
    fn test_plain_words_pass_through() {
        assert_eq!(apply_one("plain"), vec!["plain"]);
    }
}
