//! Token-set similarity scoring.
//!
//! Scores are order-insensitive comparisons of the distinct word-tokens two
//! strings contain, on a 0-100 scale. A snippet whose words all appear
//! somewhere in a document scores 100 against it regardless of word order or
//! surrounding text, which is what makes the score usable as an acceptance
//! gate for paraphrased evidence.

use std::collections::BTreeSet;

/// A word token with its byte offsets in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Split text into lowercased alphanumeric word tokens.
///
/// Offsets are byte indices into the original text. Punctuation and
/// whitespace separate tokens and are never part of one.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            tokens.push(Token {
                text: &text[s..i],
                start: s,
                end: i,
            });
        }
    }

    if let Some(s) = start {
        tokens.push(Token {
            text: &text[s..],
            start: s,
            end: text.len(),
        });
    }

    tokens
}

/// Distinct lowercased tokens of a string
fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .iter()
        .map(|t| t.text.to_lowercase())
        .collect()
}

/// Normalized similarity of two strings on a 0-100 scale.
///
/// 100 means identical, 0 means nothing in common. Two empty strings are
/// identical by convention.
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Token-set similarity score between two strings (0-100).
///
/// Both inputs are reduced to their distinct word-token sets. The score is
/// the best pairwise similarity among the sorted intersection, and the
/// intersection extended with each side's unique tokens. When one side's
/// tokens are a subset of the other's, the score is 100.
pub fn token_set_score(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);

    if set_a.is_empty() && set_b.is_empty() {
        return 100.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = set_a.intersection(&set_b).map(|s| s.as_str()).collect();
    let only_a: Vec<&str> = set_a.difference(&set_b).map(|s| s.as_str()).collect();
    let only_b: Vec<&str> = set_b.difference(&set_a).map(|s| s.as_str()).collect();

    let base = common.join(" ");

    let mut left = base.clone();
    if !only_a.is_empty() {
        if !left.is_empty() {
            left.push(' ');
        }
        left.push_str(&only_a.join(" "));
    }

    let mut right = base.clone();
    if !only_b.is_empty() {
        if !right.is_empty() {
            right.push(' ');
        }
        right.push_str(&only_b.join(" "));
    }

    ratio(&base, &left)
        .max(ratio(&base, &right))
        .max(ratio(&left, &right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_offsets() {
        let tokens = tokenize("Hello, world!");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "Hello");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 5));
        assert_eq!(tokens[1].text, "world");
        assert_eq!((tokens[1].start, tokens[1].end), (7, 12));
    }

    #[test]
    fn test_tokenize_trailing_token() {
        let tokens = tokenize("delivery_date: 2024-06-15");
        let words: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(words, vec!["delivery", "date", "2024", "06", "15"]);
    }

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(token_set_score("quantity 50 reels", "quantity 50 reels"), 100.0);
    }

    #[test]
    fn test_order_insensitive() {
        let a = token_set_score("the quick brown fox", "fox brown quick the");
        assert_eq!(a, 100.0);
    }

    #[test]
    fn test_subset_scores_100() {
        // Every snippet token appears in the document, so the intersection
        // equals the snippet side and the best pairing is exact.
        let doc = "This is a test contract. specific piece of information \
                   to be returned: password123. Rest of the test contract";
        let snippet = "specific piece of information: password123";
        assert_eq!(token_set_score(snippet, doc), 100.0);
    }

    #[test]
    fn test_disjoint_scores_low() {
        let score = token_set_score("alpha beta gamma", "delivery quantity pallet");
        assert!(score < 40.0, "expected low score, got {score}");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(token_set_score("", ""), 100.0);
        assert_eq!(token_set_score("something", ""), 0.0);
        assert_eq!(token_set_score("", "something"), 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(token_set_score("Supplier Name", "supplier name"), 100.0);
    }
}
