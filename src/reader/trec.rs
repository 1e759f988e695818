//! TREC document assembly over the SGML tokenizer.
//!
//! Documents are delimited by `<DOC>`/`</DOC>`; the human-readable
//! identifier comes from `<DOCNO>` and only `<TEXT>` content is indexed.
//! Numeric document ids are drawn from a shared counter when the document
//! is created and never change.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::analysis::token::{DocumentId, Token, TokenType};
use crate::error::{Result, TrawlError};
use crate::reader::tokenizer::SgmlTokenizer;

/// One parsed document: its ids and its positioned tokens.
#[derive(Debug, Clone)]
pub struct TrecDocument {
    id: DocumentId,
    human_id: String,
    tokens: Vec<Token>,
    phrase_counter: u32,
}

impl TrecDocument {
    pub fn new(id: DocumentId) -> Self {
        TrecDocument {
            id,
            human_id: String::new(),
            tokens: Vec::new(),
            phrase_counter: 0,
        }
    }

    /// Build a document directly from text, bypassing the markup layer.
    pub fn from_text(id: DocumentId, human_id: impl Into<String>, text: &str) -> Self {
        let mut doc = TrecDocument::new(id);
        doc.human_id = human_id.into();
        let mut tz = SgmlTokenizer::new(text);
        while let Some(tok) = tz.next_token() {
            doc.add(tok);
        }
        doc
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn human_id(&self) -> &str {
        &self.human_id
    }

    pub fn set_human_id(&mut self, human_id: impl Into<String>) {
        self.human_id = human_id.into();
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Add a token. Text tokens receive the next position and the current
    /// phrase id; symbols advance the phrase id and are not stored.
    pub fn add(&mut self, mut token: Token) {
        match token.kind {
            TokenType::Text => {
                token.doc_id = self.id;
                token.position = self.tokens.len() as u32 + 1;
                token.phrase_id = self.phrase_counter;
                self.tokens.push(token);
            }
            TokenType::Symbol => self.phrase_counter += 1,
            _ => {}
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }
}

/// Streams documents out of one TREC file.
pub struct TrecReader {
    path: PathBuf,
    tokenizer: SgmlTokenizer,
    counter: Arc<AtomicU64>,
}

impl TrecReader {
    /// Open a file, drawing document ids from `counter`.
    pub fn open(path: impl AsRef<Path>, counter: Arc<AtomicU64>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)?;
        debug!("reading documents from {}", path.display());
        Ok(TrecReader {
            path,
            tokenizer: SgmlTokenizer::new(&content),
            counter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The next document, or `None` at end of file.
    pub fn read_document(&mut self) -> Result<Option<TrecDocument>> {
        let mut doc: Option<TrecDocument> = None;
        let mut in_text = false;
        let mut in_docno = false;
        let mut docno = String::new();

        while let Some(token) = self.tokenizer.next_token() {
            match (token.kind, token.text.as_str()) {
                (TokenType::XmlStart, "DOC") => {
                    let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                    doc = Some(TrecDocument::new(id));
                }
                (TokenType::XmlEnd, "DOC") => {
                    return match doc {
                        Some(d) => Ok(Some(d)),
                        None => Err(TrawlError::corrupt(format!(
                            "{}: </DOC> before <DOC>",
                            self.path.display()
                        ))),
                    };
                }
                (TokenType::XmlStart, "TEXT") => {
                    if doc.is_none() {
                        return Err(TrawlError::corrupt(format!(
                            "{}: <TEXT> before <DOC>",
                            self.path.display()
                        )));
                    }
                    in_text = true;
                }
                (TokenType::XmlEnd, "TEXT") => in_text = false,
                (TokenType::XmlStart, "DOCNO") => {
                    in_docno = true;
                    docno.clear();
                }
                (TokenType::XmlEnd, "DOCNO") => {
                    let Some(d) = doc.as_mut() else {
                        return Err(TrawlError::corrupt(format!(
                            "{}: <DOCNO> before <DOC>",
                            self.path.display()
                        )));
                    };
                    d.set_human_id(docno.trim());
                    in_docno = false;
                }
                (TokenType::Text, _) if in_docno => docno.push_str(&token.text),
                (TokenType::Text | TokenType::Symbol, _) if in_text => {
                    if let Some(d) = doc.as_mut() {
                        d.add(token);
                    }
                }
                _ => {}
            }
        }

        if doc.is_some() {
            return Err(TrawlError::corrupt(format!(
                "{}: file ended inside a document",
                self.path.display()
            )));
        }
        Ok(None)
    }

    /// Read every remaining document.
    pub fn read_all(&mut self) -> Result<Vec<TrecDocument>> {
        let mut docs = Vec::new();
        while let Some(doc) = self.read_document()? {
            docs.push(doc);
        }
        Ok(docs)
    }
}
