//! End-to-end: read a TREC file, build positional and single-term
//! indexes, and answer ranked queries through the dispatcher.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tempfile::TempDir;

use trawl::analysis::filters::standard_sequence;
use trawl::query::{EngineRegistry, Response};
use trawl::server::protocol::StatsReply;
use trawl::server::{Backend, Dispatcher};
use trawl::{FilterRegistry, Index, PlKind, TrecReader};

const CORPUS: &str = "\
<DOC>
<DOCNO> A02 </DOCNO>
<TEXT>
Since I was a young boy; I played the silver ball.
</TEXT>
</DOC>
<DOC>
<DOCNO> A03 </DOCNO>
<TEXT>
Since Ph.D's don't fly F-16 jets, but they might work for the CDC on the CDC-50 project
</TEXT>
</DOC>
";

fn build_index(dir: &std::path::Path, kind: PlKind, corpus_path: &std::path::Path) -> Index {
    let registry = Arc::new(FilterRegistry::with_defaults());
    let mut index = Index::create(dir, -1, kind, registry).unwrap();
    for filter in standard_sequence() {
        index.add_filter(filter);
    }

    let counter = Arc::new(AtomicU64::new(1000));
    let mut reader = TrecReader::open(corpus_path, counter).unwrap();
    while let Some(doc) = reader.read_document().unwrap() {
        index.insert(&doc).unwrap();
    }
    index.wait_insert();
    index
}

fn scenario_dispatcher(root: &std::path::Path) -> Dispatcher {
    let corpus_path = root.join("corpus.trec");
    fs::write(&corpus_path, CORPUS).unwrap();

    let positional = build_index(&root.join("positional"), PlKind::Positional, &corpus_path);
    let single = build_index(&root.join("single"), PlKind::Basic, &corpus_path);

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_backend(Backend::spawn(
        "positional",
        positional,
        EngineRegistry::with_defaults(),
    ));
    dispatcher.add_backend(Backend::spawn(
        "single",
        single,
        EngineRegistry::with_defaults(),
    ));
    dispatcher
}

#[test]
fn test_positional_postings_match_expectations() {
    let dir = TempDir::new().unwrap();
    let corpus_path = dir.path().join("corpus.trec");
    fs::write(&corpus_path, CORPUS).unwrap();
    let index = build_index(&dir.path().join("idx"), PlKind::Positional, &corpus_path);

    let excerpts = [
        ("since", "1001 1 | 1002 1"),
        ("i", "1001 2 7"),
        ("cdc", "1002 13 16"),
        ("f16", "1002 5"),
        ("the", "1001 9 | 1002 12 15"),
    ];
    for (term, expected) in excerpts {
        let got = index
            .with_posting_list(term, |_, pl| pl.to_string())
            .unwrap()
            .unwrap_or_else(|| panic!("term '{term}' missing"));
        assert_eq!(got, expected, "posting list for '{term}'");
    }
}

#[test]
fn test_phrase_query_bm25() {
    let dir = TempDir::new().unwrap();
    let dispatcher = scenario_dispatcher(dir.path());

    let reply = dispatcher.handle_line(
        r#"{"Id":"q1","Text":"silver ball","Type":"phrase","Engine":"BM25","IndexPref":"positional","QueryThresh":1.0,"Force":false}"#,
    );
    let response: Response = serde_json::from_str(&reply).unwrap();
    assert!(!response.is_error(), "{}", response.error);
    assert_eq!(response.source, "positional");
    let results = response.results.as_ref().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document, "A02");
}

#[test]
fn test_cosine_query_scores_single_match() {
    let dir = TempDir::new().unwrap();
    let dispatcher = scenario_dispatcher(dir.path());

    let reply = dispatcher.handle_line(
        r#"{"Id":"q2","Text":"cdc","Engine":"COSINE","IndexPref":"positional"}"#,
    );
    let response: Response = serde_json::from_str(&reply).unwrap();
    assert!(!response.is_error(), "{}", response.error);
    let results = response.results.as_ref().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document, "A03");
}

#[test]
fn test_lm_ranks_by_term_frequency() {
    let dir = TempDir::new().unwrap();
    let dispatcher = scenario_dispatcher(dir.path());

    let reply = dispatcher
        .handle_line(r#"{"Id":"q3","Text":"the","Engine":"LM","IndexPref":"positional"}"#);
    let response: Response = serde_json::from_str(&reply).unwrap();
    assert!(!response.is_error(), "{}", response.error);
    let results = response.results.as_ref().unwrap();
    assert_eq!(results.len(), 2);
    // "the" occurs twice in A03, once in A02.
    assert_eq!(results[0].document, "A03");
    assert_eq!(results[1].document, "A02");
    assert!(results[0].score > results[1].score);
}

#[test]
fn test_unknown_word_without_force_errors() {
    let dir = TempDir::new().unwrap();
    let dispatcher = scenario_dispatcher(dir.path());

    for engine in ["COSINE", "BM25", "LM"] {
        let line = format!(
            r#"{{"Id":"q4","Text":"nonexistentword","Engine":"{engine}","IndexPref":"single"}}"#
        );
        let reply = dispatcher.handle_line(&line);
        let response: Response = serde_json::from_str(&reply).unwrap();
        assert!(response.is_error(), "{engine} should error");
    }
}

#[test]
fn test_stats_query_for_since() {
    let dir = TempDir::new().unwrap();
    let dispatcher = scenario_dispatcher(dir.path());

    let reply = dispatcher.handle_line(
        r#"{"Text":"since","Type":"stats","IndexPref":"positional,single"}"#,
    );
    let stats: StatsReply = serde_json::from_str(&reply).unwrap();
    assert!(stats.error.is_empty(), "{}", stats.error);
    assert_eq!(stats.df, 2);
    assert_eq!(stats.tf, 2);
    assert!((stats.idf - (0.5f64 / 2.5).log10()).abs() < 1e-9);
}

#[test]
fn test_saved_index_answers_queries_after_reload() {
    let dir = TempDir::new().unwrap();
    let corpus_path = dir.path().join("corpus.trec");
    fs::write(&corpus_path, CORPUS).unwrap();
    let idx_dir = dir.path().join("idx");
    {
        let mut index = build_index(&idx_dir, PlKind::Positional, &corpus_path);
        index.save().unwrap();
    }

    let registry = Arc::new(FilterRegistry::with_defaults());
    let index = Index::load(&idx_dir, registry).unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_backend(Backend::spawn(
        "positional",
        index,
        EngineRegistry::with_defaults(),
    ));

    let reply = dispatcher.handle_line(
        r#"{"Id":"q5","Text":"silver ball","Engine":"BM25","IndexPref":"positional"}"#,
    );
    let response: Response = serde_json::from_str(&reply).unwrap();
    assert!(!response.is_error(), "{}", response.error);
    assert_eq!(response.results.as_ref().unwrap()[0].document, "A02");
}
