//! Core data models used throughout vocab-context.
//!
//! These types represent the documents in the learner's library, the
//! snippets extracted from them, and the annotated records produced by a
//! search.

use serde::{Deserialize, Serialize};

/// How a document was written. Informational only; extraction treats
/// every kind the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Markdown,
    Plain,
}

impl DocumentKind {
    /// Infer the kind from a file name (`.md` / `.markdown` are markdown).
    pub fn from_file_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            DocumentKind::Markdown
        } else {
            DocumentKind::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Markdown => "markdown",
            DocumentKind::Plain => "plain",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "markdown" => DocumentKind::Markdown,
            _ => DocumentKind::Plain,
        }
    }
}

/// A document read from disk, before it has been added to the library.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub content: String,
    pub kind: DocumentKind,
}

/// A document in the library. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    pub kind: DocumentKind,
    /// Unix seconds.
    pub uploaded_at: i64,
}

impl Document {
    /// Build an in-memory document; used by tests and library callers
    /// that do not go through the SQLite store.
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            kind: DocumentKind::from_file_name(&name),
            name,
            content: content.into(),
            uploaded_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// A window of sentences around a keyword match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// Trimmed sentences of the window joined by single spaces.
    pub text: String,
    pub document_id: String,
    pub document_name: String,
    /// Index of the matching sentence within its document.
    pub sentence_index: usize,
}

/// One item of an annotation service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// 1-based position of the snippet this annotation refers to.
    #[serde(rename = "exampleIndex")]
    pub example_index: i64,
    pub translation: String,
    #[serde(rename = "wordMeaningInContext")]
    pub meaning: String,
}

/// A snippet merged with its annotation, ready for display or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRecord {
    pub original_sentence: String,
    pub translation: String,
    pub meaning_in_context: String,
    pub source_doc_id: String,
    pub source_doc_name: String,
}
