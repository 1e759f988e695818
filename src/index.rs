//! The index façade: wires the filter pipeline to the constrained lexicon
//! and keeps per-document accounting.

pub mod docinfo;
pub mod lexicon;
pub mod pls;
pub mod posting;
pub mod pruning;
pub mod trie;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use log::{error, info};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::analysis::filter::{Filter, FilterRegistry, apply_chain};
use crate::analysis::pipeline::Pipeline;
use crate::analysis::token::{DocumentId, Token, TokenType};
use crate::error::{Result, TrawlError};
use crate::index::docinfo::{DocInfo, DocumentMap};
use crate::index::lexicon::ConstrainedLexicon;
use crate::index::posting::PlKind;
use crate::reader::SgmlTokenizer;
use crate::reader::trec::TrecDocument;

/// Name of the document-map file inside the index directory.
pub const DOCMAP_FILE: &str = "docmap.txt";
/// Name of the filter-configuration file inside the index directory.
pub const FILTERS_FILE: &str = "filters.mdt";

/// Sparck-Jones inverse document frequency.
pub fn idf(df: usize, doc_count: usize) -> f64 {
    ((doc_count as f64 - df as f64 + 0.5) / (df as f64 + 0.5)).log10()
}

/// Aggregate statistics for one term, as served by the stats query.
#[derive(Debug, Clone)]
pub struct TermReport {
    pub tf: u64,
    pub df: usize,
    pub idf: f64,
    pub posting_list: String,
}

/// A single-term index over one document collection.
///
/// During building, tokens flow through the filter pipeline into a
/// dedicated inserter thread; each document finishes when its `Null`
/// sentinel drains. A loaded index serves queries.
///
/// Lock order is lexicon before document map, everywhere.
pub struct Index {
    data_dir: PathBuf,
    kind: PlKind,

    lexicon: Arc<Mutex<ConstrainedLexicon>>,
    doc_map: Arc<RwLock<DocumentMap>>,

    registry: Arc<FilterRegistry>,
    filter_specs: Vec<(String, String)>,
    staged_filters: Vec<Box<dyn Filter>>,

    pipeline: Option<Pipeline>,
    head: Option<Sender<Token>>,
    inserter: Option<JoinHandle<()>>,
    pending: Arc<(Mutex<u64>, Condvar)>,
}

impl Index {
    /// Create a fresh index rooted at `data_dir` (wiped first) with the
    /// given memory budget and posting-list variant.
    pub fn create(
        data_dir: impl AsRef<Path>,
        max_load: i64,
        kind: PlKind,
        registry: Arc<FilterRegistry>,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let lexicon = ConstrainedLexicon::new(max_load, &data_dir, kind)?;
        Ok(Index {
            data_dir,
            kind,
            lexicon: Arc::new(Mutex::new(lexicon)),
            doc_map: Arc::new(RwLock::new(DocumentMap::new())),
            registry,
            filter_specs: Vec::new(),
            staged_filters: Vec::new(),
            pipeline: None,
            head: None,
            inserter: None,
            pending: Arc::new((Mutex::new(0), Condvar::new())),
        })
    }

    /// Append a filter to the chain. Panics once the pipeline is running;
    /// the chain is fixed at the first insert.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        assert!(
            self.pipeline.is_none(),
            "cannot add filters while the inserter is running"
        );
        self.filter_specs
            .push((filter.name().to_string(), filter.args()));
        self.staged_filters.push(filter);
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn is_positional(&self) -> bool {
        self.kind == PlKind::Positional
    }

    pub fn kind(&self) -> PlKind {
        self.kind
    }

    pub fn document_count(&self) -> usize {
        self.doc_map.read().len()
    }

    pub fn term_count(&self) -> usize {
        self.lexicon.lock().term_count()
    }

    /// Total post-filter token count across the collection.
    pub fn total_term_count(&self) -> u64 {
        self.doc_map.read().total_term_count()
    }

    pub fn avg_doc_len(&self) -> f64 {
        let docs = self.document_count();
        if docs == 0 {
            return 0.0;
        }
        self.total_term_count() as f64 / docs as f64
    }

    pub fn doc_info(&self, id: DocumentId) -> Option<DocInfo> {
        self.doc_map.read().get(id).cloned()
    }

    pub fn idf(&self, df: usize) -> f64 {
        idf(df, self.document_count())
    }

    /// Run `f` against a term and its posting list; `None` for unknown
    /// terms.
    pub fn with_posting_list<R>(
        &self,
        text: &str,
        f: impl FnOnce(&lexicon::Term, &posting::PostingList) -> R,
    ) -> Result<Option<R>> {
        self.lexicon.lock().with_posting_list(text, f)
    }

    /// The stats-query view of one term.
    pub fn term_report(&self, text: &str) -> Result<Option<TermReport>> {
        let doc_count = self.document_count();
        self.lexicon.lock().with_posting_list(text, |term, pl| TermReport {
            tf: term.tf,
            df: pl.len(),
            idf: idf(pl.len(), doc_count),
            posting_list: pl.to_string(),
        })
    }

    fn start_pipeline(&mut self) {
        let filters = std::mem::take(&mut self.staged_filters);
        let pipeline = Pipeline::start(filters);
        let tail = pipeline.receiver();
        self.head = Some(pipeline.sender());
        self.pipeline = Some(pipeline);

        let lexicon = Arc::clone(&self.lexicon);
        let doc_map = Arc::clone(&self.doc_map);
        let pending = Arc::clone(&self.pending);

        self.inserter = Some(std::thread::spawn(move || {
            for token in tail {
                if token.is_null() {
                    let (lock, cvar) = &*pending;
                    let mut n = lock.lock();
                    *n = n.saturating_sub(1);
                    cvar.notify_all();
                    continue;
                }

                let mut lex = lexicon.lock();
                let term_id = match lex.insert_token(&token) {
                    Ok(Some(id)) => id,
                    Ok(None) => continue,
                    Err(e) => {
                        error!("failed to insert '{}': {e}", token.text);
                        continue;
                    }
                };

                let doc_count = doc_map.read().len();
                let (tf_d, df) = match lex.term_doc_stats(term_id, token.doc_id) {
                    Ok(stats) => stats,
                    Err(e) => {
                        error!("failed to look up '{}': {e}", token.text);
                        continue;
                    }
                };
                let weight = tf_d as f64 * idf(df, doc_count);
                drop(lex);

                let mut map = doc_map.write();
                if let Some(info) = map.get_mut(token.doc_id) {
                    info.term_count += 1;
                    if tf_d > info.max_tf {
                        info.max_tf = tf_d;
                    }
                    info.term_tf_idf.insert(token.text.clone(), weight);
                }
            }
        }));
    }

    /// Queue a document for insertion. Tokens pass through the filter
    /// chain asynchronously; use [`wait_insert`](Self::wait_insert) to
    /// block until everything queued so far has landed in the lexicon.
    ///
    /// The per-document writer lock is taken when the first token enters
    /// the queue and released when the sentinel drains, so at most one
    /// document is in flight.
    pub fn insert(&mut self, doc: &TrecDocument) -> Result<()> {
        if self.pipeline.is_none() {
            self.start_pipeline();
        }

        {
            let (lock, cvar) = &*self.pending;
            let mut n = lock.lock();
            while *n > 0 {
                cvar.wait(&mut n);
            }
            *n += 1;
        }
        self.doc_map
            .write()
            .insert(DocInfo::new(doc.id(), doc.human_id()));

        let head = self.head.as_ref().expect("pipeline just started");
        for token in doc.tokens() {
            head.send(token.clone())
                .map_err(|_| TrawlError::corrupt("filter pipeline terminated"))?;
        }
        head.send(Token::null_for(doc.id()))
            .map_err(|_| TrawlError::corrupt("filter pipeline terminated"))?;
        Ok(())
    }

    /// Block until every queued document's sentinel has drained out of the
    /// inserter.
    pub fn wait_insert(&self) {
        let (lock, cvar) = &*self.pending;
        let mut n = lock.lock();
        while *n > 0 {
            cvar.wait(&mut n);
        }
    }

    /// Persist the lexicon, the document map, and the filter
    /// configuration into the index directory.
    pub fn save(&mut self) -> Result<()> {
        self.wait_insert();
        self.lexicon.lock().save_to_disk()?;
        self.doc_map.read().save(&self.data_dir.join(DOCMAP_FILE))?;

        let mut filters_out = String::new();
        for (name, args) in &self.filter_specs {
            if args.is_empty() {
                filters_out.push_str(name);
            } else {
                filters_out.push_str(&format!("{name} {args}"));
            }
            filters_out.push('\n');
        }
        fs::write(self.data_dir.join(FILTERS_FILE), filters_out)?;
        info!("saved index to {}", self.data_dir.display());
        Ok(())
    }

    /// Open an index previously written by [`save`](Self::save).
    pub fn load(data_dir: impl AsRef<Path>, registry: Arc<FilterRegistry>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let lexicon = ConstrainedLexicon::load_from_disk(&data_dir)?;
        let kind = lexicon.kind();
        let doc_map = DocumentMap::load(&data_dir.join(DOCMAP_FILE))?;

        let mut filter_specs = Vec::new();
        let filters_raw = fs::read_to_string(data_dir.join(FILTERS_FILE))?;
        for line in filters_raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, args) = match line.split_once(' ') {
                Some((name, args)) => (name.to_string(), args.to_string()),
                None => (line.to_string(), String::new()),
            };
            // Fail now if a filter cannot be reinstantiated.
            registry.instantiate(&name, &args)?;
            filter_specs.push((name, args));
        }

        Ok(Index {
            data_dir,
            kind,
            lexicon: Arc::new(Mutex::new(lexicon)),
            doc_map: Arc::new(RwLock::new(doc_map)),
            registry,
            filter_specs,
            staged_filters: Vec::new(),
            pipeline: None,
            head: None,
            inserter: None,
            pending: Arc::new((Mutex::new(0), Condvar::new())),
        })
    }

    /// Instantiate the configured filter chain.
    fn make_filters(&self) -> Result<Vec<Box<dyn Filter>>> {
        self.filter_specs
            .iter()
            .map(|(name, args)| self.registry.instantiate(name, args))
            .collect()
    }

    /// Tokenize query text the way documents were tokenized and run it
    /// through the configured filters.
    pub fn analyze_query(&self, text: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut phrase = 0u32;
        let mut position = 0u32;

        let mut tz = SgmlTokenizer::new(text);
        while let Some(mut tok) = tz.next_token() {
            match tok.kind {
                TokenType::Text => {
                    position += 1;
                    tok.position = position;
                    tok.phrase_id = phrase;
                    tokens.push(tok);
                }
                TokenType::Symbol => phrase += 1,
                _ => {}
            }
        }
        tokens.push(Token::null());

        let mut filters = self.make_filters()?;
        let filtered = apply_chain(&mut filters, tokens);
        Ok(filtered.into_iter().filter(|t| !t.is_null()).collect())
    }

    /// Write every lexicon term with its posting list.
    pub fn print_lexicon(&self, w: &mut impl std::io::Write) -> Result<()> {
        self.lexicon.lock().print(w)
    }

    /// Write the posting-list-set cache counters.
    pub fn print_stats(&self, w: &mut impl std::io::Write) -> Result<()> {
        self.lexicon.lock().print_stats(w)
    }

    /// Check the lexicon's size bookkeeping; used by tests.
    pub fn sizes_consistent(&self) -> bool {
        self.lexicon.lock().sizes_consistent()
    }

    fn shutdown_pipeline(&mut self) {
        self.head.take();
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
        if let Some(inserter) = self.inserter.take() {
            let _ = inserter.join();
        }
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        self.shutdown_pipeline();
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[index terms:{} docs:{} datadir:{}]",
            self.term_count(),
            self.document_count(),
            self.data_dir.display()
        )
    }
}
