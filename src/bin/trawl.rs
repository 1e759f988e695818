use std::fs::File;
use std::io::BufReader;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use tracing::info;

use trawl::analysis::filters::{PhraseFilter, PorterFilter, StopWordFilter, standard_sequence};
use trawl::query::EngineRegistry;
use trawl::reader::walk_documents;
use trawl::server::client::{parse_topic_file, print_trec_results};
use trawl::server::{Backend, Dispatcher, QueryClient, QueryRequest};
use trawl::{FilterRegistry, Index, PlKind};

#[derive(Parser)]
#[command(name = "trawl", version, about = "Disk-backed inverted-index search engine")]
struct Cli {
    /// Be verbose; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndexType {
    SingleTerm,
    SingleTermPositional,
    Stemmed,
    Phrase,
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IndexType::SingleTerm => "single-term",
            IndexType::SingleTermPositional => "single-term-positional",
            IndexType::Stemmed => "stemmed",
            IndexType::Phrase => "phrase",
        };
        f.write_str(s)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Build an index from a document collection
    BuildIndex {
        /// Root directory of the document collection
        #[arg(long)]
        docroot: PathBuf,

        /// Regex that document file names must match
        #[arg(long, default_value = ".*")]
        doc_pattern: String,

        /// Directory in which to store the index
        #[arg(long, default_value = "/tmp/trawl")]
        index_store: PathBuf,

        /// Maximum number of posting entries held in memory; negative
        /// disables the budget
        #[arg(long, default_value_t = -1)]
        memlimit: i64,

        #[arg(long, value_enum, default_value_t = IndexType::SingleTerm)]
        index_type: IndexType,

        /// File of stop words to drop during indexing
        #[arg(long)]
        stopwords: Option<PathBuf>,

        /// Maximum phrase length for phrase indexes
        #[arg(long, default_value_t = 2)]
        phrase_len: usize,

        /// Relative in-document frequency at which a word breaks phrases
        #[arg(long, default_value_t = 0.2)]
        phrase_limit: f64,

        /// Print the full lexicon after building
        #[arg(long)]
        print_lexicon: bool,
    },

    /// Serve loaded indexes over a request/reply socket
    RunQueryEngine {
        /// Directory containing a positional index
        #[arg(long)]
        positional: Option<PathBuf>,

        /// Directory containing a single-term index
        #[arg(long)]
        single: Option<PathBuf>,

        /// Directory containing a stemmed index
        #[arg(long)]
        stem: Option<PathBuf>,

        /// Directory containing a phrase index
        #[arg(long)]
        phrase: Option<PathBuf>,

        #[arg(long, default_value_t = 10800)]
        port: u16,
    },

    /// Run queries from a topic file against a query engine
    RunQueryClient {
        #[arg(long, default_value = "localhost")]
        host: String,

        #[arg(long, default_value_t = 10800)]
        port: u16,

        /// TREC topic file with the queries to run
        #[arg(long)]
        queryfile: PathBuf,

        /// Ranking engine: COSINE, BM25, or LM
        #[arg(long)]
        ranking: String,

        /// Comma-separated index tags in preference order
        #[arg(long)]
        index_pref: String,

        /// IDF threshold in (0, 1]
        #[arg(long, default_value_t = 1.0)]
        query_thresh: f64,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Tokenize a document collection and report per-document counts
    PrintTokens {
        #[arg(long)]
        docroot: PathBuf,

        #[arg(long, default_value = ".*")]
        doc_pattern: String,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 | 1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .init();
}

fn build_index(
    docroot: PathBuf,
    doc_pattern: String,
    index_store: PathBuf,
    memlimit: i64,
    index_type: IndexType,
    stopwords: Option<PathBuf>,
    phrase_len: usize,
    phrase_limit: f64,
    print_lexicon: bool,
) -> anyhow::Result<()> {
    let registry = Arc::new(FilterRegistry::with_defaults());
    let kind = match index_type {
        IndexType::SingleTermPositional => PlKind::Positional,
        _ => PlKind::Basic,
    };

    let mut index = Index::create(&index_store, memlimit, kind, registry)
        .with_context(|| format!("creating index at {}", index_store.display()))?;

    match index_type {
        IndexType::SingleTerm | IndexType::SingleTermPositional => {
            for filter in standard_sequence() {
                index.add_filter(filter);
            }
        }
        IndexType::Stemmed => {
            for filter in standard_sequence() {
                index.add_filter(filter);
            }
            index.add_filter(Box::new(PorterFilter::new()));
        }
        IndexType::Phrase => {
            index.add_filter(Box::new(PhraseFilter::new(phrase_len, phrase_limit)));
        }
    }

    if let Some(path) = stopwords {
        let path = path.to_string_lossy();
        index.add_filter(Box::new(
            StopWordFilter::from_path(&path).with_context(|| format!("reading stop words from {path}"))?,
        ));
        info!("using stop word list {path}");
    }

    let pattern = Regex::new(&doc_pattern).context("bad document pattern")?;
    let counter = Arc::new(AtomicU64::new(0));
    let read = walk_documents(&docroot, &pattern, counter, &mut |doc| {
        index.insert(&doc)
    })?;
    index.wait_insert();

    println!("{index}");
    println!("Indexed {read} documents");
    index.print_stats(&mut std::io::stdout())?;
    if print_lexicon {
        index.print_lexicon(&mut std::io::stdout())?;
    }

    index.save()?;
    Ok(())
}

fn run_query_engine(
    stores: Vec<(&'static str, Option<PathBuf>)>,
    port: u16,
) -> anyhow::Result<()> {
    let mut dispatcher = Dispatcher::new();

    for (tag, path) in stores {
        let Some(path) = path else { continue };
        let registry = Arc::new(FilterRegistry::with_defaults());
        let index = Index::load(&path, registry)
            .with_context(|| format!("loading index '{tag}' from {}", path.display()))?;
        info!("loaded '{tag}' [{index}]");
        dispatcher.add_backend(Backend::spawn(tag, index, EngineRegistry::with_defaults()));
    }

    if dispatcher.is_empty() {
        bail!("at least one index store must be supplied");
    }

    let listener = TcpListener::bind(("0.0.0.0", port))?;
    info!("query engine listening on port {port}");
    dispatcher.serve(listener)?;
    Ok(())
}

fn run_query_client(
    host: String,
    port: u16,
    queryfile: PathBuf,
    ranking: String,
    index_pref: String,
    query_thresh: f64,
    limit: usize,
) -> anyhow::Result<()> {
    let file = File::open(&queryfile)
        .with_context(|| format!("opening query file {}", queryfile.display()))?;
    let queries = parse_topic_file(BufReader::new(file))?;

    let mut client = QueryClient::connect(&host, port)
        .with_context(|| format!("connecting to {host}:{port}"))?;

    let mut stdout = std::io::stdout();
    for (id, text) in queries {
        let request = QueryRequest {
            id: id.clone(),
            text,
            engine: ranking.clone(),
            index_pref: index_pref.clone(),
            query_thresh,
            ..Default::default()
        };
        let response = client.send(&request)?;
        if response.is_error() {
            eprintln!("query {id} failed: {}", response.error);
            continue;
        }
        print_trec_results(&mut stdout, &id, &response, limit)?;
    }
    Ok(())
}

fn print_tokens(docroot: PathBuf, doc_pattern: String) -> anyhow::Result<()> {
    let pattern = Regex::new(&doc_pattern).context("bad document pattern")?;
    let counter = Arc::new(AtomicU64::new(0));
    walk_documents(&docroot, &pattern, counter, &mut |doc| {
        println!("Document {} [{}] ({} tokens)", doc.human_id(), doc.id(), doc.len());
        Ok(())
    })?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::BuildIndex {
            docroot,
            doc_pattern,
            index_store,
            memlimit,
            index_type,
            stopwords,
            phrase_len,
            phrase_limit,
            print_lexicon,
        } => build_index(
            docroot,
            doc_pattern,
            index_store,
            memlimit,
            index_type,
            stopwords,
            phrase_len,
            phrase_limit,
            print_lexicon,
        ),
        Command::RunQueryEngine {
            positional,
            single,
            stem,
            phrase,
            port,
        } => run_query_engine(
            vec![
                ("single", single),
                ("positional", positional),
                ("stem", stem),
                ("phrase", phrase),
            ],
            port,
        ),
        Command::RunQueryClient {
            host,
            port,
            queryfile,
            ranking,
            index_pref,
            query_thresh,
            limit,
        } => run_query_client(host, port, queryfile, ranking, index_pref, query_thresh, limit),
        Command::PrintTokens {
            docroot,
            doc_pattern,
        } => print_tokens(docroot, doc_pattern),
    }
}
