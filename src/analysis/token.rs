//! Token representation shared by the reader, the filter pipeline, and the
//! lexicon.

use std::fmt;

/// Identifier assigned to a document when it is created. Immutable afterwards.
pub type DocumentId = u64;

/// The kind of a token produced by the document tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// A textual term candidate.
    Text,
    /// An opening markup tag (`<DOC>`).
    XmlStart,
    /// A closing markup tag (`</DOC>`).
    XmlEnd,
    /// Punctuation or another non-word character.
    Symbol,
    /// End-of-document sentinel.
    Null,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenType::Text => "TEXT",
            TokenType::XmlStart => "XMLSTART",
            TokenType::XmlEnd => "XMLEND",
            TokenType::Symbol => "SYMBOL",
            TokenType::Null => "NULL",
        };
        f.write_str(s)
    }
}

/// A single token flowing through the filter pipeline.
///
/// Tokens are immutable once built; filters that change a token clone it
/// first (see [`Token::clone_with_text`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token text.
    pub text: String,
    /// What kind of token this is.
    pub kind: TokenType,
    /// The document this token belongs to.
    pub doc_id: DocumentId,
    /// 1-based position within the document.
    pub position: u32,
    /// Groups adjacent textual runs; the phrase filter keys off this.
    pub phrase_id: u32,
    /// Once set, downstream filters must pass the token through unchanged.
    pub is_final: bool,
}

impl Token {
    /// Create a token with the given text and kind.
    pub fn new(text: impl Into<String>, kind: TokenType) -> Self {
        Token {
            text: text.into(),
            kind,
            doc_id: 0,
            position: 0,
            phrase_id: 0,
            is_final: false,
        }
    }

    /// The end-of-document sentinel.
    pub fn null() -> Self {
        Token::new("", TokenType::Null)
    }

    /// The sentinel for a specific document.
    pub fn null_for(doc_id: DocumentId) -> Self {
        let mut t = Token::null();
        t.doc_id = doc_id;
        t
    }

    pub fn is_null(&self) -> bool {
        self.kind == TokenType::Null
    }

    /// Clone this token with new text. The clone is marked final: a filter
    /// that rewrote a token has produced its definitive form.
    pub fn clone_with_text(&self, text: impl Into<String>) -> Token {
        let mut t = self.clone();
        t.text = text.into();
        t.is_final = true;
        t
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} @{}:{}]", self.text, self.kind, self.doc_id, self.position)
    }
}
