//! Punctuation-based sentence splitter.
//!
//! A sentence is a run of one or more non-terminator characters followed
//! by one or more terminators (`.`, `!`, `?`). A candidate only closes
//! when its whole terminator run is followed by whitespace or the end of
//! the text. When a candidate fails to close (`3.14`, `e.g.x`), scanning
//! resumes right after its terminator run, so the text before it is
//! dropped rather than merged into the next sentence.
//!
//! This is deliberately naive: abbreviations, decimals, and quotations
//! split wrongly. The windows a search produces depend on these exact
//! boundaries, so the heuristic must not be "improved".
//!
//! Returned sentences borrow from the input and keep any leading
//! whitespace; callers trim when rendering.

/// Returns true for the characters that can end a sentence.
pub fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Whitespace as a JavaScript regex `\s` sees it: Unicode `White_Space`
/// without NEXT LINE (U+0085), plus the byte-order mark (U+FEFF).
pub fn is_js_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{FEFF}'
}

/// Trim leading and trailing [`is_js_whitespace`] characters.
pub fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

/// Split text into sentences, in order. Text without any closing
/// terminator yields no sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let body_len = match text[pos..].find(is_terminator) {
            // Terminators are ASCII, so stepping one byte stays on a char boundary
            Some(0) => {
                pos += 1;
                continue;
            }
            Some(n) => n,
            None => break,
        };

        let run_start = pos + body_len;
        let run_end = text[run_start..]
            .find(|c: char| !is_terminator(c))
            .map(|n| run_start + n)
            .unwrap_or(text.len());

        let closes = text[run_end..]
            .chars()
            .next()
            .map_or(true, is_js_whitespace);

        if closes {
            sentences.push(&text[pos..run_end]);
        }
        pos = run_end;
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sentences() {
        let s = split_sentences("One. Two! Three?");
        assert_eq!(s, vec!["One.", " Two!", " Three?"]);
    }

    #[test]
    fn test_no_terminator() {
        assert!(split_sentences("no punctuation here").is_empty());
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t ").is_empty());
    }

    #[test]
    fn test_trailing_fragment_dropped() {
        let s = split_sentences("Closed sentence. dangling fragment");
        assert_eq!(s, vec!["Closed sentence."]);
    }

    #[test]
    fn test_terminator_runs_kept_together() {
        let s = split_sentences("Really?! Yes... ok.");
        assert_eq!(s, vec!["Really?!", " Yes...", " ok."]);
    }

    #[test]
    fn test_unclosed_candidate_is_dropped() {
        // "Pi is 3." is not followed by whitespace, so scanning resumes at "14"
        let s = split_sentences("Pi is 3.14 now. Next one.");
        assert_eq!(s, vec!["14 now.", " Next one."]);
    }

    #[test]
    fn test_leading_terminators_skipped() {
        let s = split_sentences("...Hello there. Bye.");
        assert_eq!(s, vec!["Hello there.", " Bye."]);
    }

    #[test]
    fn test_newline_closes_sentence() {
        let s = split_sentences("# Title\n\nFirst line.\nSecond line.\n");
        assert_eq!(s, vec!["# Title\n\nFirst line.", "\nSecond line."]);
    }

    #[test]
    fn test_multibyte_text() {
        let s = split_sentences("Café au lait. Crème brûlée! Ça va?");
        assert_eq!(s, vec!["Café au lait.", " Crème brûlée!", " Ça va?"]);
    }

    #[test]
    fn test_unicode_whitespace_closes() {
        let s = split_sentences("Un.\u{00A0}Deux.");
        assert_eq!(s, vec!["Un.", "\u{00A0}Deux."]);
    }

    #[test]
    fn test_bom_counts_as_whitespace() {
        let s = split_sentences("A.\u{FEFF}B.");
        assert_eq!(s, vec!["A.", "\u{FEFF}B."]);
        assert_eq!(trim_js(s[1]), "B.");
    }

    #[test]
    fn test_next_line_does_not_close() {
        // U+0085 is not whitespace for the pattern, so "A." never closes
        // and scanning resumes at the NEXT LINE character
        let s = split_sentences("A.\u{85}B.");
        assert_eq!(s, vec!["\u{85}B."]);
        assert_eq!(trim_js(s[0]), "\u{85}B.");
    }

    #[test]
    fn test_trim_js() {
        assert_eq!(trim_js("\u{FEFF} x \u{3000}"), "x");
        assert_eq!(trim_js("\u{85}x\u{85}"), "\u{85}x\u{85}");
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta. Gamma delta! Epsilon? Zeta";
        assert_eq!(split_sentences(text), split_sentences(text));
    }
}
