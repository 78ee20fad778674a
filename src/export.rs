//! Export analysis results.
//!
//! Two shapes are produced: a plain-text report for pasting into notes,
//! and CSV for spreadsheets and flashcard tools.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::AnalysisRecord;

const CSV_HEADERS: [&str; 4] = [
    "Source Document Name",
    "Original Sentence",
    "Translation",
    "Contextual Meaning",
];

const REPORT_SEPARATOR: &str = "\n----------------------------------------\n\n";

/// Render results as a numbered plain-text report.
pub fn render_report(word: &str, records: &[AnalysisRecord]) -> String {
    let body = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] Source: {}\nContext: {}\nTranslation: {}\nMeaning: {}\n",
                i + 1,
                r.source_doc_name,
                r.original_sentence,
                r.translation,
                r.meaning_in_context
            )
        })
        .collect::<Vec<_>>()
        .join(REPORT_SEPARATOR);

    format!("Vocabulary Analysis for \"{}\"\n\n{}", word, body)
}

/// Render results as CSV. Every field is quoted; rows end with `\n`
/// except the last.
pub fn render_csv(records: &[AnalysisRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for r in records {
        lines.push(
            [
                escape_csv_field(&r.source_doc_name),
                escape_csv_field(&r.original_sentence),
                escape_csv_field(&r.translation),
                escape_csv_field(&r.meaning_in_context),
            ]
            .join(","),
        );
    }

    lines.join("\n")
}

fn escape_csv_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Default CSV file name for a searched word.
pub fn default_csv_name(word: &str) -> String {
    default_file_name(word, "csv")
}

/// `vocabulary_<word>.<ext>`, with path separators in `word` replaced so
/// the name always stays inside the target directory.
pub fn default_file_name(word: &str, ext: &str) -> String {
    let stem: String = word
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("vocabulary_{}.{}", stem, ext)
}

/// Write `content` to `output`, or to stdout when `output` is `None`.
pub fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
