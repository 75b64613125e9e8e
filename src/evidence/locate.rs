//! Evidence localization inside a document's full text.
//!
//! Given a snippet the generation step claims to have quoted from a document,
//! find the best-matching span. Strategies escalate from cheap to expensive:
//!
//! 1. Exact substring search
//! 2. Whole-document token-set gate (paraphrase-tolerant accept/reject)
//! 3. Best-window token-set search with own offsets
//! 4. Bounded edit-distance search for near matches
//!
//! The first strategy to produce a match wins. Absence is always reported as
//! `MatchResult::NotFound`, never as an error. All offsets are byte indices
//! into the document text, always on char boundaries.
//!
//! The gate (strategy 2) can accept a snippet on similarity alone while the
//! verbatim lookup fails; that case is reported as a match with a score but no
//! offsets, and callers must treat it as "approved but unlocated" rather than
//! assume a span is present.

use serde::Serialize;
use tracing::debug;

use super::similarity::{token_set_score, tokenize};

/// Default acceptance threshold for similarity-based strategies
pub const DEFAULT_THRESHOLD: f64 = 80.0;

/// Outcome of a localization attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    /// A match was accepted (offsets may still be absent, see [`Match`])
    Found(Match),
    /// No strategy produced an acceptable match
    NotFound,
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }

    /// The accepted match, if any
    pub fn found(&self) -> Option<&Match> {
        match self {
            MatchResult::Found(m) => Some(m),
            MatchResult::NotFound => None,
        }
    }
}

/// An accepted match.
///
/// `start`/`end` are byte offsets into the document text with
/// `0 <= start <= end <= len`. They are `None` when the snippet was accepted
/// on whole-document similarity but never located verbatim; `matched_text` is
/// `None` in the same case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub matched_text: Option<String>,
    /// Similarity score on a 0-100 scale (100 = literal occurrence)
    pub score: f64,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl Match {
    fn located(matched_text: &str, score: f64, start: usize, end: usize) -> Self {
        Self {
            matched_text: Some(matched_text.to_string()),
            score,
            start: Some(start),
            end: Some(end),
        }
    }

    fn unlocated(score: f64) -> Self {
        Self {
            matched_text: None,
            score,
            start: None,
            end: None,
        }
    }

    /// Offsets as a pair, when both are present
    pub fn span(&self) -> Option<(usize, usize)> {
        self.start.zip(self.end)
    }
}

/// Find the first literal occurrence of `snippet` in `document_text`.
pub fn exact_search(snippet: &str, document_text: &str) -> MatchResult {
    match document_text.find(snippet) {
        Some(idx) => MatchResult::Found(Match::located(
            snippet,
            100.0,
            idx,
            idx + snippet.len(),
        )),
        None => MatchResult::NotFound,
    }
}

/// Whole-document similarity gate.
///
/// Scores the snippet against the entire document text. Below `threshold` the
/// result is `NotFound`. At or above, the snippet is accepted; if it also
/// occurs verbatim the match carries offsets, otherwise it is returned with
/// the score alone.
pub fn document_gate(snippet: &str, document_text: &str, threshold: f64) -> MatchResult {
    let score = token_set_score(snippet, document_text);

    if score < threshold {
        return MatchResult::NotFound;
    }

    match document_text.find(snippet) {
        Some(idx) => MatchResult::Found(Match {
            matched_text: Some(snippet.to_string()),
            score,
            start: Some(idx),
            end: Some(idx + snippet.len()),
        }),
        None => MatchResult::Found(Match::unlocated(score)),
    }
}

/// Best-window token-set search.
///
/// Scores word-aligned windows of the document against the snippet (window
/// widths within one token of the snippet's token count) and returns the
/// highest-scoring window at or above `threshold` with its own offsets.
/// Ties go to the leftmost window.
pub fn best_window_search(snippet: &str, document_text: &str, threshold: f64) -> MatchResult {
    let words = tokenize(document_text);
    let snippet_words = tokenize(snippet).len();

    if words.is_empty() || snippet_words == 0 {
        return MatchResult::NotFound;
    }

    let min_width = snippet_words.saturating_sub(1).max(1);
    let max_width = (snippet_words + 1).min(words.len());

    let mut best: Option<(f64, usize, usize)> = None;

    for i in 0..words.len() {
        for width in min_width..=max_width {
            let Some(last) = words.get(i + width - 1) else {
                break;
            };
            let start = words[i].start;
            let end = last.end;
            let score = token_set_score(snippet, &document_text[start..end]);

            if score >= threshold && best.map_or(true, |(s, _, _)| score > s) {
                best = Some((score, start, end));
            }
        }
    }

    match best {
        Some((score, start, end)) => MatchResult::Found(Match::located(
            &document_text[start..end],
            score,
            start,
            end,
        )),
        None => MatchResult::NotFound,
    }
}

/// Default edit-distance budget for a snippet: half its length, at least 2.
pub fn default_max_distance(snippet: &str) -> usize {
    (snippet.chars().count() / 2).max(2)
}

/// Bounded edit-distance search.
///
/// Enumerates document substrings whose length is within `max_distance` of
/// the snippet's and keeps the one with the lowest Levenshtein distance,
/// leftmost on ties. With `max_distance` 0 this is exactly the literal
/// search. The score is `(len - distance) / len` on a 0-100 scale.
pub fn bounded_distance_search(
    snippet: &str,
    document_text: &str,
    max_distance: usize,
) -> MatchResult {
    let snippet_len = snippet.chars().count();
    if snippet_len == 0 {
        return MatchResult::NotFound;
    }

    // Char-boundary byte offsets, with the one-past-the-end sentinel so a
    // window can run to the end of the document.
    let mut boundaries: Vec<usize> = document_text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(document_text.len());
    let doc_len = boundaries.len() - 1;

    let min_width = snippet_len.saturating_sub(max_distance).max(1);
    let max_width = snippet_len + max_distance;

    let mut best: Option<(usize, usize, usize)> = None;

    'scan: for i in 0..doc_len {
        for width in min_width..=max_width {
            if i + width > doc_len {
                break;
            }
            let start = boundaries[i];
            let end = boundaries[i + width];
            let distance = strsim::levenshtein(snippet, &document_text[start..end]);

            if distance <= max_distance && best.map_or(true, |(d, _, _)| distance < d) {
                best = Some((distance, start, end));
                if distance == 0 {
                    // Scanning left to right, so this is already the
                    // leftmost possible winner.
                    break 'scan;
                }
            }
        }
    }

    match best {
        Some((distance, start, end)) => {
            let score = (snippet_len as f64 - distance as f64) / snippet_len as f64 * 100.0;
            MatchResult::Found(Match::located(
                &document_text[start..end],
                score,
                start,
                end,
            ))
        }
        None => MatchResult::NotFound,
    }
}

/// Locate a snippet in a document, escalating through all strategies.
///
/// Returns the first strategy's accepted match, or `NotFound` once all are
/// exhausted. Pure with respect to both inputs.
pub fn locate(snippet: &str, document_text: &str, threshold: f64) -> MatchResult {
    let result = exact_search(snippet, document_text);
    if result.is_found() {
        return result;
    }

    debug!(snippet_len = snippet.len(), "no literal occurrence, trying similarity gate");
    let result = document_gate(snippet, document_text, threshold);
    if result.is_found() {
        return result;
    }

    debug!("similarity gate rejected, trying window search");
    let result = best_window_search(snippet, document_text, threshold);
    if result.is_found() {
        return result;
    }

    debug!("window search found nothing, trying bounded edit distance");
    bounded_distance_search(snippet, document_text, default_max_distance(snippet))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "This is a test contract which contains lots of important \
                       contractual data. The Head of Purchasing is Sean Cousins. \
                       Rest of the test contract";

    #[test]
    fn test_exact_search_found() {
        let result = exact_search("Sean Cousins", DOC);
        let m = result.found().expect("should find");
        assert_eq!(m.score, 100.0);
        let (start, end) = m.span().unwrap();
        assert_eq!(&DOC[start..end], "Sean Cousins");
        assert_eq!(m.matched_text.as_deref(), Some("Sean Cousins"));
    }

    #[test]
    fn test_exact_search_absent() {
        assert_eq!(exact_search("force majeure", DOC), MatchResult::NotFound);
    }

    #[test]
    fn test_exact_search_first_occurrence() {
        let result = exact_search("test contract", DOC);
        let (start, _) = result.found().unwrap().span().unwrap();
        assert_eq!(start, DOC.find("test contract").unwrap());
    }

    #[test]
    fn test_gate_accepts_literal_with_offsets() {
        let result = document_gate("The Head of Purchasing is Sean Cousins", DOC, 80.0);
        let m = result.found().expect("should accept");
        assert!(m.score >= 80.0);
        let (start, end) = m.span().unwrap();
        assert_eq!(&DOC[start..end], "The Head of Purchasing is Sean Cousins");
    }

    #[test]
    fn test_gate_accepts_paraphrase_without_offsets() {
        // Every word of the paraphrase occurs in the document, but not as a
        // contiguous string, so the gate accepts without a span.
        let result = document_gate("Head of Purchasing: Sean Cousins", DOC, 80.0);
        let m = result.found().expect("should accept");
        assert!(m.score >= 80.0);
        assert_eq!(m.matched_text, None);
        assert_eq!(m.start, None);
        assert_eq!(m.end, None);
    }

    #[test]
    fn test_gate_rejects_unrelated() {
        let result = document_gate("entirely unrelated wording here", DOC, 80.0);
        assert_eq!(result, MatchResult::NotFound);
    }

    #[test]
    fn test_best_window_finds_region() {
        let result = best_window_search("Purchasing Head Sean Cousins", DOC, 70.0);
        let m = result.found().expect("should find a window");
        let (start, end) = m.span().unwrap();
        let window = &DOC[start..end];
        assert!(window.contains("Sean Cousins"), "window was {window:?}");
        assert_eq!(m.matched_text.as_deref(), Some(window));
    }

    #[test]
    fn test_best_window_nothing_above_threshold() {
        let result = best_window_search("quantum flux capacitor", DOC, 80.0);
        assert_eq!(result, MatchResult::NotFound);
    }

    #[test]
    fn test_bounded_distance_exact_at_zero() {
        // A zero budget admits only literal occurrences, scored 100.
        let result = bounded_distance_search("Sean Cousins", DOC, 0);
        let m = result.found().unwrap();
        assert_eq!(m.score, 100.0);
        let (start, end) = m.span().unwrap();
        assert_eq!(&DOC[start..end], "Sean Cousins");

        assert_eq!(
            bounded_distance_search("Sean Cousinz", DOC, 0),
            MatchResult::NotFound
        );
    }

    #[test]
    fn test_bounded_distance_near_match() {
        let result = bounded_distance_search("Sean Cousens", DOC, 2);
        let m = result.found().unwrap();
        assert_eq!(m.matched_text.as_deref(), Some("Sean Cousins"));
        assert!(m.score > 90.0);
    }

    #[test]
    fn test_bounded_distance_leftmost_tie() {
        let doc = "abcd ... abcd";
        let result = bounded_distance_search("abcd", doc, 1);
        let (start, _) = result.found().unwrap().span().unwrap();
        assert_eq!(start, 0);
    }

    #[test]
    fn test_bounded_distance_respects_budget() {
        assert_eq!(
            bounded_distance_search("zzzzzzzz", "aaaaaaaa", 2),
            MatchResult::NotFound
        );
    }

    #[test]
    fn test_default_max_distance() {
        assert_eq!(default_max_distance("ab"), 2);
        assert_eq!(default_max_distance("abcd"), 2);
        assert_eq!(default_max_distance("abcdefghij"), 5);
    }

    #[test]
    fn test_locate_prefers_exact() {
        let result = locate("Sean Cousins", DOC, 80.0);
        assert_eq!(result.found().unwrap().score, 100.0);
    }

    #[test]
    fn test_locate_never_panics_on_multibyte() {
        let doc = "Müller Straße contract covering delivery für 50 Stück";
        let result = locate("Müller Straße", doc, 80.0);
        let (start, end) = result.found().unwrap().span().unwrap();
        assert_eq!(&doc[start..end], "Müller Straße");
    }

    #[test]
    fn test_locate_offsets_within_bounds() {
        let result = locate("Rest of the test contract", DOC, 80.0);
        let m = result.found().unwrap();
        let (start, end) = m.span().unwrap();
        assert!(start <= end && end <= DOC.len());
    }
}
