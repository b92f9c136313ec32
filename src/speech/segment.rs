//! Clause segmentation for read-aloud text
//!
//! Selected text is split into clause-sized chunks so the first clause can be
//! synthesized and played while later ones are still being generated. Each
//! chunk keeps its trailing punctuation for the caption, while the text sent
//! to the engine has it stripped.

use crate::messages::ChunkRequest;
use regex::Regex;
use std::sync::LazyLock;

/// Clause-ending marks kept on the caption but stripped before synthesis
pub const CLAUSE_MARKS: [char; 3] = ['。', '、', '」'];

/// Filler mark that is never worth synthesizing on its own
pub const FILLER_MARK: char = '·';

/// A run of non-separators, optionally closed by one clause mark.
/// `\s` covers the ideographic space and line breaks.
static CLAUSE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^。、」\s]+[。、」]?").expect("clause pattern is valid"));

/// Split text into display tokens, punctuation retained.
pub fn split_into_clauses(text: &str) -> Vec<String> {
    CLAUSE_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Strip trailing clause marks for synthesis.
pub fn synthesis_text(display: &str) -> String {
    display.trim_end_matches(CLAUSE_MARKS).trim().to_string()
}

/// Whether a synthesis text should be skipped entirely.
pub fn is_unspeakable(synthesis: &str) -> bool {
    synthesis.is_empty() || synthesis.chars().all(|c| c == FILLER_MARK)
}

/// Segment text into ordered chunk requests.
pub fn segment(text: &str) -> Vec<ChunkRequest> {
    split_into_clauses(text)
        .into_iter()
        .map(|display| ChunkRequest {
            synthesis_text: synthesis_text(&display),
            display_text: display,
        })
        .collect()
}
