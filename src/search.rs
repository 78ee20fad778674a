//! Vocabulary search orchestration.
//!
//! Ties the pieces together for one search: validate the word, record it
//! in history, extract snippets from the library, and, when an annotator
//! is supplied, annotate them. Used by `vctx search` and
//! `vctx history rerun`.

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::annotate::{self, Annotator};
use crate::config::Config;
use crate::db;
use crate::export;
use crate::extract::extract_with;
use crate::history;
use crate::library;
use crate::models::{AnalysisRecord, Snippet};

/// What a search produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// No sentence in any document contains the word.
    NoExamples { word: String },
    /// Snippets found, annotation skipped.
    SnippetsOnly { word: String, snippets: Vec<Snippet> },
    /// Snippets found and annotated.
    Analyzed {
        word: String,
        records: Vec<AnalysisRecord>,
    },
}

/// Output formats for `vctx search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing.
    Text,
    /// Numbered plain-text report, ready to paste into notes.
    Report,
    /// JSON document.
    Json,
    /// CSV with one row per example.
    Csv,
}

/// Run one search against the library in `pool`.
///
/// Pass `None` for `annotator` to get raw snippets without a model call.
///
/// # Errors
///
/// Fails if `word` is blank, the library is empty, or annotation fails.
/// An annotation failure is reported as a single message; nothing found
/// so far is returned alongside it.
pub async fn search_vocabulary(
    config: &Config,
    pool: &SqlitePool,
    annotator: Option<&dyn Annotator>,
    word: &str,
) -> Result<SearchOutcome> {
    let word = word.trim();
    if word.is_empty() {
        bail!("search word must not be empty");
    }

    let documents = library::list_documents(pool).await?;
    if documents.is_empty() {
        bail!("No documents in the library. Use `vctx add <path>` to upload some first.");
    }

    history::record_search(pool, word, config.history.max_entries).await?;

    let snippets = extract_with(&documents, word, &config.extraction.options());
    tracing::info!(
        word,
        documents = documents.len(),
        snippets = snippets.len(),
        "extraction finished"
    );

    if snippets.is_empty() {
        return Ok(SearchOutcome::NoExamples {
            word: word.to_string(),
        });
    }

    let Some(annotator) = annotator else {
        return Ok(SearchOutcome::SnippetsOnly {
            word: word.to_string(),
            snippets,
        });
    };

    let records = annotate::analyze_vocabulary(annotator, word, &snippets)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, model = annotator.model_name(), "annotation failed");
            anyhow!(
                "Failed to analyze vocabulary: {}. Check your API key and try again.",
                e
            )
        })?;

    Ok(SearchOutcome::Analyzed {
        word: word.to_string(),
        records,
    })
}

/// CLI entry point: runs a search and prints or writes the outcome.
pub async fn run_search(
    config: &Config,
    word: &str,
    format: OutputFormat,
    model: Option<String>,
    no_annotate: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let annotator = if no_annotate || !config.annotation.is_enabled() {
        None
    } else {
        let mut ann_config = config.annotation.clone();
        if let Some(m) = model {
            ann_config.model = m;
        }
        Some(annotate::create_annotator(&ann_config).context("Annotation is not available")?)
    };

    let pool = db::connect(config).await?;
    let outcome = search_vocabulary(config, &pool, annotator.as_deref(), word).await;
    pool.close().await;
    let outcome = outcome?;

    let content = match (&outcome, format) {
        (SearchOutcome::NoExamples { .. }, OutputFormat::Json) => {
            serde_json::to_string_pretty(&outcome)?
        }
        (SearchOutcome::NoExamples { word }, _) => {
            println!(
                "No examples found for \"{}\" in your documents. Try another word.",
                word
            );
            return Ok(());
        }
        (_, OutputFormat::Json) => serde_json::to_string_pretty(&outcome)?,
        (_, OutputFormat::Text) => render_text(&outcome),
        (_, OutputFormat::Report) => export::render_report(outcome.word(), &outcome.records()),
        (_, OutputFormat::Csv) => export::render_csv(&outcome.records()),
    };

    let target = output.map(|p| resolve_output(&p, outcome.word(), format));
    export::write_output(&content, target.as_deref())
}

impl SearchOutcome {
    pub fn word(&self) -> &str {
        match self {
            SearchOutcome::NoExamples { word }
            | SearchOutcome::SnippetsOnly { word, .. }
            | SearchOutcome::Analyzed { word, .. } => word,
        }
    }

    /// Results as display records. Unannotated snippets get empty
    /// translation and meaning fields.
    pub fn records(&self) -> Vec<AnalysisRecord> {
        match self {
            SearchOutcome::NoExamples { .. } => Vec::new(),
            SearchOutcome::SnippetsOnly { snippets, .. } => snippets
                .iter()
                .map(|s| AnalysisRecord {
                    original_sentence: s.text.clone(),
                    translation: String::new(),
                    meaning_in_context: String::new(),
                    source_doc_id: s.document_id.clone(),
                    source_doc_name: s.document_name.clone(),
                })
                .collect(),
            SearchOutcome::Analyzed { records, .. } => records.clone(),
        }
    }
}

/// A directory target gets the default file name for the format.
fn resolve_output(path: &Path, word: &str, format: OutputFormat) -> PathBuf {
    if !path.is_dir() {
        return path.to_path_buf();
    }
    match format {
        OutputFormat::Csv => path.join(export::default_csv_name(word)),
        OutputFormat::Json => path.join(export::default_file_name(word, "json")),
        OutputFormat::Text | OutputFormat::Report => {
            path.join(export::default_file_name(word, "txt"))
        }
    }
}

fn render_text(outcome: &SearchOutcome) -> String {
    let mut out = String::new();

    match outcome {
        SearchOutcome::NoExamples { .. } => {}
        SearchOutcome::SnippetsOnly { word, snippets } => {
            out.push_str(&format!(
                "Examples for \"{}\" ({} found, not annotated)\n\n",
                word,
                snippets.len()
            ));
            for (i, s) in snippets.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, s.document_name));
                out.push_str(&format!("    context: {}\n", s.text.replace('\n', " ")));
                out.push_str(&format!("    id: {}\n\n", s.document_id));
            }
        }
        SearchOutcome::Analyzed { word, records } => {
            out.push_str(&format!(
                "Results for \"{}\" ({} examples found)\n\n",
                word,
                records.len()
            ));
            for (i, r) in records.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, r.source_doc_name));
                out.push_str(&format!(
                    "    context: {}\n",
                    r.original_sentence.replace('\n', " ")
                ));
                out.push_str(&format!("    translation: {}\n", r.translation));
                out.push_str(&format!("    meaning: {}\n\n", r.meaning_in_context));
            }
        }
    }

    out.trim_end().to_string()
}
