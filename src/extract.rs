//! Keyword-in-context snippet extraction.
//!
//! Scans documents for sentences containing a keyword and builds a
//! bounded window of surrounding sentences for each match. This runs
//! locally, before any model call, so only a handful of relevant
//! excerpts are ever sent for annotation.
//!
//! # Algorithm
//!
//! 1. Split each document into sentences ([`split_sentences`]).
//! 2. For every sentence whose lowercase form contains the lowercase
//!    keyword, take `context_window` sentences either side (clamped to
//!    the document) and join them, trimmed, with single spaces.
//! 3. Keep document order, then sentence order.
//! 4. Drop snippets whose text equals an earlier snippet's text,
//!    regardless of which document produced it.
//! 5. Keep at most `max_snippets`, earliest first.
//!
//! Matching is plain substring containment: no word boundaries, so
//! `"art"` matches `"heart"`. Windows never span two documents.
//!
//! Extraction is pure and synchronous. It never fails: a document with
//! no sentence terminators simply contributes nothing.

use std::collections::HashSet;

use crate::models::{Document, Snippet};
use crate::sentence::{split_sentences, trim_js};

/// Sentences of context on each side of a match.
pub const DEFAULT_CONTEXT_WINDOW: usize = 2;

/// Upper bound on snippets returned by one extraction.
pub const DEFAULT_MAX_SNIPPETS: usize = 8;

/// Tunables for [`extract_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub context_window: usize,
    pub max_snippets: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_snippets: DEFAULT_MAX_SNIPPETS,
        }
    }
}

/// Extract up to 8 deduplicated snippets with 2 sentences of context.
///
/// The keyword is used as-is; callers are expected to trim it and reject
/// blank input, since an empty keyword matches every sentence.
pub fn extract(documents: &[Document], keyword: &str) -> Vec<Snippet> {
    extract_with(documents, keyword, &ExtractOptions::default())
}

/// Extract snippets with explicit window and cap settings.
pub fn extract_with(
    documents: &[Document],
    keyword: &str,
    options: &ExtractOptions,
) -> Vec<Snippet> {
    if options.max_snippets == 0 {
        return Vec::new();
    }

    let needle = keyword.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut snippets = Vec::new();

    for doc in documents {
        let sentences = split_sentences(&doc.content);

        for (i, sentence) in sentences.iter().enumerate() {
            if !sentence.to_lowercase().contains(&needle) {
                continue;
            }

            let start = i.saturating_sub(options.context_window);
            let end = sentences
                .len()
                .min(i.saturating_add(options.context_window).saturating_add(1));

            let text = sentences[start..end]
                .iter()
                .map(|s| trim_js(s))
                .collect::<Vec<_>>()
                .join(" ");

            // Dedup is global across documents; first occurrence wins
            if !seen.insert(text.clone()) {
                continue;
            }

            snippets.push(Snippet {
                text,
                document_id: doc.id.clone(),
                document_name: doc.name.clone(),
                sentence_index: i,
            });

            if snippets.len() >= options.max_snippets {
                tracing::debug!(cap = options.max_snippets, "snippet cap reached");
                return snippets;
            }
        }
    }

    snippets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, content: &str) -> Document {
        Document::new(id, format!("{}.txt", id), content)
    }

    #[test]
    fn test_mitigate_scenario() {
        let docs = vec![doc(
            "d1",
            "The policy aims to mitigate risk. It is effective. Critics disagree. The mitigate strategy works.",
        )];
        let snippets = extract(&docs, "mitigate");
        assert_eq!(snippets.len(), 2);
        assert_eq!(
            snippets[0].text,
            "The policy aims to mitigate risk. It is effective. Critics disagree."
        );
        assert_eq!(snippets[0].sentence_index, 0);
        assert_eq!(
            snippets[1].text,
            "It is effective. Critics disagree. The mitigate strategy works."
        );
        assert_eq!(snippets[1].sentence_index, 3);
    }

    #[test]
    fn test_empty_documents() {
        assert!(extract(&[], "test").is_empty());
    }

    #[test]
    fn test_no_match() {
        let docs = vec![doc("d1", "Nothing to see here. Move along.")];
        assert!(extract(&docs, "absent").is_empty());
    }

    #[test]
    fn test_document_without_terminator_contributes_nothing() {
        let docs = vec![
            doc("d1", "keyword without any ending"),
            doc("d2", "A keyword sentence."),
        ];
        let snippets = extract(&docs, "keyword");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].document_id, "d2");
    }

    #[test]
    fn test_window_clamped_at_end() {
        let docs = vec![doc("d1", "Target here. Second. Third.")];
        let snippets = extract(&docs, "target");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "Target here. Second. Third.");
    }

    #[test]
    fn test_window_full_width() {
        let docs = vec![doc("d1", "S0. S1. S2 hit. S3. S4. S5. S6.")];
        let snippets = extract(&docs, "hit");
        assert_eq!(snippets[0].text, "S0. S1. S2 hit. S3. S4.");
    }

    #[test]
    fn test_case_insensitive_substring() {
        let docs = vec![doc("d1", "My HEART is full. Nothing else.")];
        let snippets = extract(&docs, "Art");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "My HEART is full. Nothing else.");
    }

    #[test]
    fn test_document_order_preserved() {
        let docs = vec![
            doc("d1", "Alpha word here. Filler one."),
            doc("d2", "Beta word here. Filler two."),
        ];
        let snippets = extract(&docs, "word");
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].document_id, "d1");
        assert_eq!(snippets[0].document_name, "d1.txt");
        assert_eq!(snippets[1].document_id, "d2");
    }

    #[test]
    fn test_dedup_across_documents() {
        let content = "Same text with word. Nothing more.";
        let docs = vec![doc("d1", content), doc("d2", content)];
        let snippets = extract(&docs, "word");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].document_id, "d1");
    }

    #[test]
    fn test_adjacent_matches_overlapping_windows_kept() {
        let docs = vec![doc("d1", "Word one. Word two. Plain three.")];
        let snippets = extract(&docs, "word");
        // Both windows cover the same three sentences, so the second is a duplicate
        assert_eq!(snippets.len(), 1);

        let docs = vec![doc("d1", "Word one. Plain. Plain. Word four.")];
        let snippets = extract(&docs, "word");
        assert_eq!(snippets.len(), 2);
        assert_ne!(snippets[0].text, snippets[1].text);
    }

    #[test]
    fn test_cap_at_eight() {
        let docs: Vec<Document> = (0..9)
            .map(|i| doc(&format!("d{}", i), &format!("Match number {} here.", i)))
            .collect();
        let snippets = extract(&docs, "match");
        assert_eq!(snippets.len(), 8);
        for (i, s) in snippets.iter().enumerate() {
            assert_eq!(s.document_id, format!("d{}", i));
        }
    }

    #[test]
    fn test_cap_counts_unique_snippets() {
        // Duplicates do not consume cap slots
        let mut docs = vec![doc("dup", "Match repeated."), doc("dup2", "Match repeated.")];
        docs.extend((0..8).map(|i| doc(&format!("d{}", i), &format!("Match {}.", i))));
        let snippets = extract(&docs, "match");
        assert_eq!(snippets.len(), 8);
        assert_eq!(snippets[0].document_id, "dup");
        assert_eq!(snippets[7].document_id, "d6");
    }

    #[test]
    fn test_custom_options() {
        let docs = vec![doc("d1", "A. B. C hit. D. E.")];
        let opts = ExtractOptions {
            context_window: 0,
            max_snippets: 8,
        };
        let snippets = extract_with(&docs, "hit", &opts);
        assert_eq!(snippets[0].text, "C hit.");
    }

    #[test]
    fn test_zero_cap_returns_nothing() {
        let docs = vec![doc("d1", "A hit. Another hit.")];
        let opts = ExtractOptions {
            context_window: 2,
            max_snippets: 0,
        };
        assert!(extract_with(&docs, "hit", &opts).is_empty());
    }

    #[test]
    fn test_bom_trimmed_from_snippet() {
        let docs = vec![
            doc("d1", "\u{FEFF}Lead sentence here. Next."),
            doc("d2", "Lead sentence here. Next."),
        ];
        let snippets = extract(&docs, "lead");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].text, "Lead sentence here. Next.");
        assert_eq!(snippets[0].document_id, "d1");
    }

    #[test]
    fn test_properties_hold_on_mixed_input() {
        let docs = vec![
            doc("d1", "The art of war. Heart and soul. Start now! Artful dodger? Party."),
            doc("d2", "Smart move. Art again. Chart it. Apart. Depart. Cart."),
            doc("d3", "no terminator art"),
        ];
        let snippets = extract(&docs, "art");
        assert!(snippets.len() <= DEFAULT_MAX_SNIPPETS);
        let unique: HashSet<&str> = snippets.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(unique.len(), snippets.len());
        assert!(snippets.iter().all(|s| s.document_id != "d3"));
    }
}
