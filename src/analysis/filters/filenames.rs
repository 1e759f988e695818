//! Emits the bare name for tokens that look like filenames, alongside the
//! original.

use ahash::AHashSet;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

const FILE_EXTENSIONS: &[&str] = &[
    "aiff", "aif", "au", "avi", "bat", "bmp", "class", "java", "csk", "cvs", "dbf", "dif", "doc",
    "docx", "eps", "exe", "fm", "gif", "hqx", "htm", "html", "jpg", "mac", "map", "mdb", "mid",
    "midi", "mov", "qt", "mtb", "mtw", "pdf", "p", "t", "png", "ppt", "psd", "psp", "qxd", "ra",
    "sit", "tar", "tif", "txt", "wav", "xls", "xlsx", "zip",
];

pub struct FilenameFilter {
    extensions: AHashSet<&'static str>,
}

impl FilenameFilter {
    pub fn new() -> Self {
        FilenameFilter {
            extensions: FILE_EXTENSIONS.iter().copied().collect(),
        }
    }
}

impl Default for FilenameFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for FilenameFilter {
    fn name(&self) -> &'static str {
        "filenames"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        let mut out = Vec::with_capacity(2);

        let parts: Vec<&str> = token.text.split('.').collect();
        if parts.len() > 1 && self.extensions.contains(parts[parts.len() - 1]) {
            out.push(token.clone_with_text(parts[..parts.len() - 1].concat()));
        }

        out.push(token);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::TokenType;

    fn apply_one(text: &str) -> Vec<String> {
        let mut f = FilenameFilter::new();
        f.apply(Token::new(text, TokenType::Text))
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_known_extensions() {
        assert_eq!(apply_one("test.jpg"), vec!["test", "test.jpg"]);
        assert_eq!(apply_one("report.pdf"), vec!["report", "report.pdf"]);
    }

    #[test]
    fn test_unknown_extensions_pass() {
        assert_eq!(apply_one("example.nope"), vec!["example.nope"]);
        assert_eq!(apply_one("plain"), vec!["plain"]);
    }
}
