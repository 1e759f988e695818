//! Document input: the SGML tokenizer, TREC document streaming, and the
//! directory walker that feeds indexing.

pub mod tokenizer;
pub mod trec;

pub use tokenizer::SgmlTokenizer;
pub use trec::{TrecDocument, TrecReader};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use log::{info, warn};
use regex::Regex;

use crate::error::Result;

/// Walk `root` recursively, reading every file whose name matches
/// `pattern` as a TREC file and handing each document to `f`. Returns the
/// number of documents read.
pub fn walk_documents(
    root: &Path,
    pattern: &Regex,
    counter: Arc<AtomicU64>,
    f: &mut impl FnMut(TrecDocument) -> Result<()>,
) -> Result<usize> {
    let mut count = 0usize;
    walk_dir(root, pattern, &counter, f, &mut count)?;
    info!("read {count} documents under {}", root.display());
    Ok(count)
}

fn walk_dir(
    dir: &Path,
    pattern: &Regex,
    counter: &Arc<AtomicU64>,
    f: &mut impl FnMut(TrecDocument) -> Result<()>,
    count: &mut usize,
) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(&path, pattern, counter, f, count)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !pattern.is_match(&name) {
            continue;
        }

        let mut reader = match TrecReader::open(&path, Arc::clone(counter)) {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        while let Some(doc) = reader.read_document()? {
            *count += 1;
            f(doc)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walks_matching_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(
            dir.path().join("sub/a.trec"),
            "<DOC><DOCNO>A</DOCNO><TEXT>one two</TEXT></DOC>",
        )
        .unwrap();
        fs::write(dir.path().join("ignore.txt"), "<DOC></DOC>").unwrap();

        let pattern = Regex::new(r"\.trec$").unwrap();
        let counter = Arc::new(AtomicU64::new(0));
        let mut seen = Vec::new();
        let read = walk_documents(dir.path(), &pattern, counter, &mut |doc| {
            seen.push(doc.human_id().to_string());
            Ok(())
        })
        .unwrap();

        assert_eq!(read, 1);
        assert_eq!(seen, vec!["A"]);
    }
}
