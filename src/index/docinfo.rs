//! Per-document metadata tracked during indexing and persisted alongside
//! the lexicon.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::token::DocumentId;
use crate::error::Result;

/// Metadata for one indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocInfo {
    #[serde(rename = "Id")]
    pub id: DocumentId,

    /// The identifier carried by the source markup (`DOCNO`).
    #[serde(rename = "HumanId")]
    pub human_id: String,

    /// Number of tokens the document contributed after filtering.
    #[serde(rename = "TermCount")]
    pub term_count: u64,

    /// Highest term frequency observed in this document.
    #[serde(rename = "MaxTf")]
    pub max_tf: u64,

    /// Per-term tf-idf weight snapshot taken at insertion time.
    #[serde(rename = "TermTfIdf")]
    pub term_tf_idf: HashMap<String, f64>,
}

impl DocInfo {
    pub fn new(id: DocumentId, human_id: impl Into<String>) -> Self {
        DocInfo {
            id,
            human_id: human_id.into(),
            term_count: 0,
            max_tf: 0,
            term_tf_idf: HashMap::new(),
        }
    }

    /// Sum of squared stored term weights, the document's weight in the
    /// cosine model.
    pub fn weight_squared(&self) -> f64 {
        self.term_tf_idf.values().map(|w| w * w).sum()
    }
}

/// The document-info map for a whole index.
#[derive(Debug, Default)]
pub struct DocumentMap {
    docs: AHashMap<DocumentId, DocInfo>,
}

impl DocumentMap {
    pub fn new() -> Self {
        DocumentMap::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn insert(&mut self, info: DocInfo) {
        self.docs.insert(info.id, info);
    }

    pub fn get(&self, id: DocumentId) -> Option<&DocInfo> {
        self.docs.get(&id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut DocInfo> {
        self.docs.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocInfo> {
        self.docs.values()
    }

    /// Total token count across the collection; the numerator of the
    /// average document length.
    pub fn total_term_count(&self) -> u64 {
        self.docs.values().map(|d| d.term_count).sum()
    }

    /// Write the map as a JSON array, ordered by document id.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut docs: Vec<&DocInfo> = self.docs.values().collect();
        docs.sort_by_key(|d| d.id);
        let json = serde_json::to_string_pretty(&docs)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a map written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let docs: Vec<DocInfo> = serde_json::from_str(&raw)?;
        let mut map = DocumentMap::new();
        for doc in docs {
            map.insert(doc);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let mut map = DocumentMap::new();
        let mut info = DocInfo::new(1001, "FR890101-0001");
        info.term_count = 11;
        info.max_tf = 2;
        info.term_tf_idf.insert("silver".to_string(), 0.25);
        map.insert(info);
        map.insert(DocInfo::new(1002, "FR890101-0002"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docmap.txt");
        map.save(&path).unwrap();

        let loaded = DocumentMap::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let d = loaded.get(1001).unwrap();
        assert_eq!(d.human_id, "FR890101-0001");
        assert_eq!(d.term_count, 11);
        assert_eq!(d.max_tf, 2);
        assert_eq!(d.term_tf_idf["silver"], 0.25);
        assert_eq!(loaded.total_term_count(), 11);
    }

    #[test]
    fn test_wire_field_names() {
        let info = DocInfo::new(7, "DOC-7");
        let json = serde_json::to_string(&info).unwrap();
        for key in ["\"Id\"", "\"HumanId\"", "\"TermCount\"", "\"MaxTf\"", "\"TermTfIdf\""] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn test_weight_squared() {
        let mut info = DocInfo::new(1, "a");
        info.term_tf_idf.insert("x".into(), 3.0);
        info.term_tf_idf.insert("y".into(), 4.0);
        assert!((info.weight_squared() - 25.0).abs() < 1e-9);
    }
}
