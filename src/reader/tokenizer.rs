//! Tokenizer for the loose SGML/TREC markup.
//!
//! Markup tags become `XmlStart`/`XmlEnd` tokens, comments are skipped,
//! and a small set of character entities is decoded. Word tokens keep
//! internal hyphens, and keep `.`/`@` when followed by another word
//! character, so `Ph.D's`, `F-16`, and e-mail addresses survive as single
//! tokens for the filters to normalise. Sentence punctuation is dropped
//! unless it directly abuts a word, in which case it surfaces as a
//! `Symbol` token marking a phrase break.

use crate::analysis::token::{Token, TokenType};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}')
}

fn is_terminal_punct(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':')
}

fn decode_entity(name: &str) -> Option<&'static str> {
    match name {
        "&hyph;" => Some("-"),
        "&blank;" => Some(""),
        "&lt;" => Some("<"),
        "&gt;" => Some(">"),
        _ => None,
    }
}

/// A pull tokenizer over one in-memory document file.
pub struct SgmlTokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl SgmlTokenizer {
    pub fn new(input: &str) -> Self {
        SgmlTokenizer {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// The next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            let c = self.peek()?;

            if c.is_whitespace() || c.is_control() {
                self.bump();
                continue;
            }

            if c == '<' {
                if let Some(tag) = self.parse_tag() {
                    return Some(tag);
                }
                continue;
            }

            if is_terminal_punct(c) {
                self.bump();
                // Punctuation glued to a following word separates phrases;
                // sentence-final punctuation just disappears.
                if self.peek().is_some_and(is_word_char) {
                    return Some(Token::new(c, TokenType::Symbol));
                }
                continue;
            }

            if is_word_char(c) || c == '&' {
                if let Some(tok) = self.parse_compound() {
                    return Some(tok);
                }
                continue;
            }

            self.bump();
            return Some(Token::new(c, TokenType::Symbol));
        }
    }

    /// A word token: alphanumerics and hyphens, with embedded `.`/`@`
    /// joining (acronyms, filenames, addresses) and apostrophes elided.
    fn parse_compound(&mut self) -> Option<Token> {
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(c) if is_word_char(c) => {
                    text.push(c);
                    self.bump();
                }
                Some('&') => match self.parse_entity() {
                    Some(decoded) => text.push_str(decoded),
                    None => break,
                },
                Some(c @ ('.' | '@'))
                    if !text.is_empty() && self.peek_at(1).is_some_and(is_word_char) =>
                {
                    text.push(c);
                    self.bump();
                }
                Some('\'') if self.peek_at(1).is_some_and(is_word_char) => {
                    self.bump();
                }
                _ => break,
            }
        }

        if text.is_empty() {
            None
        } else {
            Some(Token::new(text, TokenType::Text))
        }
    }

    /// Decode `&name;`. On anything unrecognised the `&` alone is
    /// consumed and `None` returned, so the following text still
    /// tokenizes.
    fn parse_entity(&mut self) -> Option<&'static str> {
        let start = self.pos;
        self.bump(); // '&'
        let mut name = String::from("&");

        loop {
            match self.peek() {
                Some(';') => {
                    self.bump();
                    name.push(';');
                    let decoded = decode_entity(&name);
                    if decoded.is_none() {
                        self.pos = start + 1;
                    }
                    return decoded;
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '#' => {
                    name.push(c);
                    self.bump();
                }
                _ => {
                    self.pos = start + 1;
                    return None;
                }
            }
        }
    }

    /// `<NAME>` / `</NAME>`; comments (`<!...>`) and tags containing
    /// whitespace are skipped entirely.
    fn parse_tag(&mut self) -> Option<Token> {
        self.bump(); // '<'
        let kind = match self.peek() {
            Some('/') => {
                self.bump();
                TokenType::XmlEnd
            }
            Some('!') => {
                while let Some(c) = self.bump() {
                    if c == '>' {
                        break;
                    }
                }
                return None;
            }
            _ => TokenType::XmlStart,
        };

        let mut name = String::new();
        loop {
            match self.bump() {
                Some('>') => {
                    return if name.is_empty() {
                        None
                    } else {
                        Some(Token::new(name, kind))
                    };
                }
                Some(c) if c.is_whitespace() => {
                    while let Some(c2) = self.bump() {
                        if c2 == '>' {
                            break;
                        }
                    }
                    return None;
                }
                Some(c) => name.push(c),
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(input: &str) -> Vec<(String, TokenType)> {
        let mut tz = SgmlTokenizer::new(input);
        let mut out = Vec::new();
        while let Some(t) = tz.next_token() {
            out.push((t.text, t.kind));
        }
        out
    }

    fn texts(input: &str) -> Vec<String> {
        all_tokens(input)
            .into_iter()
            .filter(|(_, k)| *k == TokenType::Text)
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(texts("the silver ball"), vec!["the", "silver", "ball"]);
    }

    #[test]
    fn test_sentence_punctuation_is_dropped() {
        assert_eq!(
            texts("young boy; I played the silver ball."),
            vec!["young", "boy", "I", "played", "the", "silver", "ball"]
        );
    }

    #[test]
    fn test_compounds_keep_dots_hyphens_and_elide_apostrophes() {
        assert_eq!(texts("Ph.D's don't fly F-16 jets,"), vec!["Ph.Ds", "dont", "fly", "F-16", "jets"]);
        assert_eq!(texts("CDC-50 project"), vec!["CDC-50", "project"]);
        assert_eq!(texts("cwacek@gmail.com jim"), vec!["cwacek@gmail.com", "jim"]);
    }

    #[test]
    fn test_markup_tags() {
        let toks = all_tokens("<DOC> body </DOC>");
        assert_eq!(
            toks,
            vec![
                ("DOC".to_string(), TokenType::XmlStart),
                ("body".to_string(), TokenType::Text),
                ("DOC".to_string(), TokenType::XmlEnd),
            ]
        );
    }

    #[test]
    fn test_comments_and_attributed_tags_are_skipped() {
        assert_eq!(texts("<!-- note --> word"), vec!["word"]);
        assert_eq!(texts("<a href=\"x\">link"), vec!["link"]);
    }

    #[test]
    fn test_entities() {
        assert_eq!(texts("left&hyph;right"), vec!["left-right"]);
        assert_eq!(texts("a&blank;b"), vec!["ab"]);
        assert_eq!(texts("AT&T corp"), vec!["AT", "T", "corp"]);
    }

    #[test]
    fn test_punctuation_abutting_a_word_becomes_a_symbol() {
        let toks = all_tokens("key:value");
        assert_eq!(toks[0], ("key".to_string(), TokenType::Text));
        assert_eq!(toks[1], (":".to_string(), TokenType::Symbol));
        assert_eq!(toks[2], ("value".to_string(), TokenType::Text));
    }
}
