//! Phrase grouping.
//!
//! Tokens are buffered until the document completes. Words whose
//! within-document normalised frequency reaches the configured limit act
//! as phrase breaks, as do changes of phrase id. Runs are emitted as
//! space-joined phrase tokens up to the configured length, sliding one
//! word at a time so overlapping phrases are all captured.

use ahash::AHashMap;

use crate::analysis::filter::Filter;
use crate::analysis::token::{Token, TokenType};
use crate::error::{Result, TrawlError};

pub struct PhraseFilter {
    phrase_len: usize,
    tf_limit: f64,

    buffer: Vec<Token>,
    freq: AHashMap<String, u64>,
    max_freq: u64,
}

/// Frequency relative to the most frequent word in the document.
fn normalized_tf(tf: u64, max_tf: u64) -> f64 {
    if max_tf == 0 {
        return 0.0;
    }
    tf as f64 / max_tf as f64
}

impl PhraseFilter {
    pub fn new(phrase_len: usize, tf_limit: f64) -> Self {
        PhraseFilter {
            phrase_len: phrase_len.max(1),
            tf_limit,
            buffer: Vec::new(),
            freq: AHashMap::new(),
            max_freq: 0,
        }
    }

    /// Parse `<phrase-len> <tf-limit>` as written by [`args`](Filter::args).
    pub fn from_args(args: &str) -> Result<Self> {
        let fields: Vec<&str> = args.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(TrawlError::invalid_argument(format!(
                "phrase filter expects '<len> <limit>', got '{args}'"
            )));
        }
        let phrase_len: usize = fields[0]
            .parse()
            .map_err(|_| TrawlError::invalid_argument(format!("bad phrase length '{}'", fields[0])))?;
        let tf_limit: f64 = fields[1]
            .parse()
            .map_err(|_| TrawlError::invalid_argument(format!("bad tf limit '{}'", fields[1])))?;
        Ok(Self::new(phrase_len, tf_limit))
    }

    fn emit(&self, window: &[&Token], position: &mut u32, out: &mut Vec<Token>) {
        if window.is_empty() {
            return;
        }
        let text = window
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        *position += 1;

        let mut phrase = Token::new(text, TokenType::Text);
        phrase.doc_id = window[0].doc_id;
        phrase.position = *position;
        phrase.is_final = true;
        out.push(phrase);
    }
}

impl Filter for PhraseFilter {
    fn name(&self) -> &'static str {
        "phrases"
    }

    fn args(&self) -> String {
        format!("{} {:.2}", self.phrase_len, self.tf_limit)
    }

    /// Buffer everything; the real work happens at document completion.
    fn apply(&mut self, token: Token) -> Vec<Token> {
        let count = self.freq.entry(token.text.clone()).or_insert(0);
        *count += 1;
        if *count > self.max_freq {
            self.max_freq = *count;
        }
        self.buffer.push(token);
        Vec::new()
    }

    fn flush(&mut self) -> Vec<Token> {
        let buffer = std::mem::take(&mut self.buffer);

        // Words frequent enough within this document break phrases.
        let stops: ahash::AHashSet<&str> = self
            .freq
            .iter()
            .filter(|(_, f)| normalized_tf(**f, self.max_freq) >= self.tf_limit)
            .map(|(w, _)| w.as_str())
            .collect();

        let mut out = Vec::new();
        let mut window: Vec<&Token> = Vec::with_capacity(self.phrase_len);
        let mut position = 0u32;

        for token in &buffer {
            if stops.contains(token.text.as_str()) {
                self.emit(&window, &mut position, &mut out);
                window.clear();
                continue;
            }

            if !window.is_empty() && window[0].phrase_id != token.phrase_id {
                self.emit(&window, &mut position, &mut out);
                window.clear();
                window.push(token);
                continue;
            }

            if window.len() == self.phrase_len {
                self.emit(&window, &mut position, &mut out);
                window.remove(0);
            }
            window.push(token);
        }
        self.emit(&window, &mut position, &mut out);

        self.freq.clear();
        self.max_freq = 0;
        out
    }
}
