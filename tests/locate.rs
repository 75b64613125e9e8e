//! Evidence Locator Integration Tests
//!
//! End-to-end properties of the escalating localization strategies.

use covenant::evidence::{
    bounded_distance_search, default_max_distance, exact_search, locate, MatchResult,
};

const DOC: &str = "This is a test contract. specific piece of information to be \
                   returned: password123. Rest of the test contract";

#[test]
fn exact_substring_scores_100_with_matching_text() {
    for snippet in [
        "This is a test contract.",
        "password123",
        "Rest of the test contract",
    ] {
        let result = locate(snippet, DOC, 80.0);
        let m = result.found().unwrap_or_else(|| panic!("{snippet:?} not found"));

        assert_eq!(m.score, 100.0);
        let (start, end) = m.span().expect("literal matches carry offsets");
        assert_eq!(&DOC[start..end], snippet);
        assert_eq!(m.matched_text.as_deref(), Some(snippet));
    }
}

#[test]
fn paraphrased_snippet_is_approved_but_unlocated() {
    // The snippet paraphrases the document ("information:" instead of
    // "information to be returned:"), so the literal lookup fails while the
    // whole-document similarity clears the threshold. The result must be a
    // match without offsets - not an error, and not a substituted string.
    let snippet = "specific piece of information: password123";
    assert_eq!(exact_search(snippet, DOC), MatchResult::NotFound);

    let result = locate(snippet, DOC, 80.0);
    let m = result.found().expect("gate should approve the paraphrase");

    assert!(m.score >= 80.0, "score was {}", m.score);
    assert_eq!(m.matched_text, None);
    assert_eq!(m.start, None);
    assert_eq!(m.end, None);
}

#[test]
fn offsets_always_within_bounds() {
    let snippets = [
        "test contract",
        "specific piece of information to be returned: password123",
        "Rest of",
    ];
    for snippet in snippets {
        if let MatchResult::Found(m) = locate(snippet, DOC, 80.0) {
            if let Some((start, end)) = m.span() {
                assert!(start <= end);
                assert!(end <= DOC.len());
            }
        }
    }
}

#[test]
fn zero_distance_budget_matches_exact_search() {
    let present = "specific piece of information";
    let absent = "specifc piece of informatin";

    // Present snippets behave identically to exact search.
    let bounded = bounded_distance_search(present, DOC, 0);
    let exact = exact_search(present, DOC);
    assert_eq!(bounded, exact);
    assert_eq!(bounded.found().unwrap().score, 100.0);

    // Absent snippets are simply not found, however close they are.
    assert_eq!(bounded_distance_search(absent, DOC, 0), MatchResult::NotFound);
    assert_eq!(exact_search(absent, DOC), MatchResult::NotFound);
}

#[test]
fn typo_snippet_recovered_by_fuzzy_strategies() {
    // The misspelling is not a document token, so the whole-document gate
    // rejects and the later strategies resolve it to the close word.
    let doc = "The deposit is forfeited on default.";
    let snippet = "depossit";

    let result = locate(snippet, doc, 80.0);
    let m = result.found().expect("near match should be found");
    let (start, end) = m.span().unwrap();
    assert_eq!(&doc[start..end], "deposit");
    assert!(m.score > 80.0);
}

#[test]
fn unrelated_snippet_is_not_found() {
    let result = locate(
        "kubernetes cluster autoscaler configuration",
        "Payment is due within thirty days of delivery.",
        80.0,
    );
    assert_eq!(result, MatchResult::NotFound);
}

#[test]
fn locate_is_pure() {
    let snippet = "password123";
    let first = locate(snippet, DOC, 80.0);
    let second = locate(snippet, DOC, 80.0);
    assert_eq!(first, second);
}

#[test]
fn default_distance_budget_floor() {
    assert_eq!(default_max_distance("ab"), 2);
    assert_eq!(default_max_distance("0123456789"), 5);
}
