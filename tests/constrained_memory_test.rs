//! Memory-constrained build: a tiny budget forces posting-list sets to
//! swap to disk mid-build, and the result must still equal an
//! unconstrained build.

use std::fs;

use tempfile::TempDir;

use trawl::index::lexicon::SWAP_FILE_PREFIX;
use trawl::index::pls::PostingListSet;
use trawl::{ConstrainedLexicon, PlKind, TrecDocument};

fn test_documents() -> Vec<TrecDocument> {
    vec![
        TrecDocument::from_text(1, "A01", "The quick brown fox"),
        TrecDocument::from_text(2, "A02", "The slight brown dog"),
        TrecDocument::from_text(3, "A03", "Here dog. Here doggie dog dog"),
    ]
}

fn build_lexicon(dir: &std::path::Path, max_load: i64) -> ConstrainedLexicon {
    let mut lex = ConstrainedLexicon::new(max_load, dir, PlKind::Positional).unwrap();
    for doc in test_documents() {
        for token in doc.tokens() {
            lex.insert_token(token).unwrap();
        }
    }
    lex
}

#[test]
fn test_constrained_build_swaps_and_stays_consistent() {
    let dir = TempDir::new().unwrap();
    let lexdir = dir.path().join("lex");
    let mut lex = build_lexicon(&lexdir, 12);

    assert_eq!(lex.per_pls_load(), 2);
    assert!(lex.stats().dumps > 0, "a 12-entry budget must evict");
    assert!(lex.sizes_consistent());

    lex.save_to_disk().unwrap();

    // Every swap file on disk reloads to a set whose size matches the
    // sum of its posting-list lengths.
    let mut swap_files = 0;
    for entry in fs::read_dir(&lexdir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(tag) = name.strip_prefix(SWAP_FILE_PREFIX) else {
            continue;
        };
        swap_files += 1;

        let mut pls = PostingListSet::new(tag, PlKind::Positional);
        let file = fs::File::open(entry.path()).unwrap();
        let read = pls.load(&mut std::io::BufReader::new(file)).unwrap();
        assert_eq!(pls.recalculate_size(), read, "set '{name}' is inconsistent");
    }
    assert!(swap_files > 0);
}

#[test]
fn test_constrained_build_equals_unconstrained_build() {
    let dir = TempDir::new().unwrap();
    let constrained_dir = dir.path().join("constrained");
    {
        let mut lex = build_lexicon(&constrained_dir, 12);
        lex.save_to_disk().unwrap();
    }

    let unconstrained_dir = dir.path().join("unconstrained");
    let mut unconstrained = build_lexicon(&unconstrained_dir, -1);

    // Reload the constrained build and compare the full term and posting
    // sets against the in-memory unconstrained build.
    let mut reloaded = ConstrainedLexicon::load_from_disk(&constrained_dir).unwrap();
    assert_eq!(reloaded.term_count(), unconstrained.term_count());

    let ids = unconstrained.ordered_term_ids();
    for id in ids {
        let term = unconstrained.term(id);
        let text = term.text.clone();
        let expected_tf = term.tf;
        let expected_pl = unconstrained
            .with_posting_list(&text, |_, pl| pl.to_string())
            .unwrap()
            .unwrap();

        let got = reloaded
            .with_posting_list(&text, |term, pl| (term.tf, pl.to_string()))
            .unwrap()
            .unwrap_or_else(|| panic!("term '{text}' missing after reload"));
        assert_eq!(got.0, expected_tf, "tf for '{text}'");
        assert_eq!(got.1, expected_pl, "posting list for '{text}'");
    }
}

#[test]
fn test_unbounded_budget_never_touches_disk() {
    let dir = TempDir::new().unwrap();
    let lexdir = dir.path().join("lex");
    let lex = build_lexicon(&lexdir, -1);

    assert_eq!(lex.stats().dumps, 0);
    assert_eq!(lex.stats().loads, 0);
    let swap_files = fs::read_dir(&lexdir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with(SWAP_FILE_PREFIX)
        })
        .count();
    assert_eq!(swap_files, 0);
}
