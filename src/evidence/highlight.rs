//! Highlight rendering for located spans.
//!
//! Splices opening/closing markers around each span of the original text.
//! Spans are processed in ascending start order with a running offset equal
//! to the marker lengths added so far; since the enclosed text itself never
//! changes length, every later span's original coordinates stay valid after
//! adjustment. That arithmetic only holds when the spans are pairwise
//! disjoint, so overlap is rejected up front instead of corrupting offsets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opening marker used for HTML output
pub const HTML_MARK_OPEN: &str = "<span style=\"background-color: yellow;\">";
/// Closing marker used for HTML output
pub const HTML_MARK_CLOSE: &str = "</span>";

/// A field's extracted value with its (possibly unresolved) location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpan {
    /// Name of the field this span evidences
    pub field: String,
    /// The extracted value (empty means nothing to highlight)
    pub value: String,
    /// Byte offset of the span start, if located
    pub start: Option<usize>,
    /// Byte offset one past the span end, if located
    pub end: Option<usize>,
}

impl FieldSpan {
    pub fn new(field: impl Into<String>, value: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    /// A span whose location was never resolved
    pub fn unlocated(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            start: None,
            end: None,
        }
    }

    fn offsets(&self) -> Option<(usize, usize)> {
        self.start.zip(self.end)
    }

    /// True when this span has offsets and a non-empty value
    pub fn is_renderable(&self) -> bool {
        !self.value.is_empty() && self.offsets().is_some()
    }
}

/// Precondition violations detected before any text is mutated
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("spans for '{first}' and '{second}' overlap in the original text")]
    Overlap { first: String, second: String },

    #[error("span for '{field}' ({start}..{end}) is outside the text (len {len})")]
    OutOfBounds {
        field: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("span for '{field}' ({start}..{end}) does not fall on char boundaries")]
    NotCharAligned {
        field: String,
        start: usize,
        end: usize,
    },
}

/// Drop spans that cannot be rendered, sort the rest, and resolve overlaps
/// by keeping the leftmost span of any overlapping pair.
///
/// This is the explicit normalization step for callers whose spans may
/// overlap; [`render`] itself rejects overlap outright.
pub fn normalize_spans(spans: &[FieldSpan]) -> Vec<FieldSpan> {
    let mut kept: Vec<(usize, usize, &FieldSpan)> = spans
        .iter()
        .filter(|s| !s.value.is_empty())
        .filter_map(|s| s.offsets().map(|(start, end)| (start, end, s)))
        .collect();
    kept.sort_by_key(|(start, _, _)| *start);

    let mut result: Vec<FieldSpan> = Vec::with_capacity(kept.len());
    let mut covered_to = 0usize;

    for (start, end, span) in kept {
        if result.is_empty() || start >= covered_to {
            covered_to = end;
            result.push(span.clone());
        }
    }

    result
}

/// Wrap each span of `text` in `opening`/`closing` markers.
///
/// Spans with missing offsets or an empty value are discarded; the rest are
/// processed in ascending start order. The surviving spans must be pairwise
/// disjoint, in bounds, and char-aligned, or the call fails without
/// producing output. The enclosed text is reproduced byte-for-byte.
pub fn render(
    text: &str,
    spans: &[FieldSpan],
    opening: &str,
    closing: &str,
) -> Result<String, HighlightError> {
    let mut renderable: Vec<(usize, usize, &FieldSpan)> = spans
        .iter()
        .filter(|s| !s.value.is_empty())
        .filter_map(|s| s.offsets().map(|(start, end)| (start, end, s)))
        .collect();
    renderable.sort_by_key(|(start, _, _)| *start);

    // Validate everything before touching the text.
    let mut prev: Option<(usize, &FieldSpan)> = None;
    for &(start, end, span) in &renderable {
        if start > end || end > text.len() {
            return Err(HighlightError::OutOfBounds {
                field: span.field.clone(),
                start,
                end,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(HighlightError::NotCharAligned {
                field: span.field.clone(),
                start,
                end,
            });
        }
        if let Some((prev_end, prev_span)) = prev {
            if start < prev_end {
                return Err(HighlightError::Overlap {
                    first: prev_span.field.clone(),
                    second: span.field.clone(),
                });
            }
        }
        prev = Some((end, span));
    }

    let mut out = String::with_capacity(
        text.len() + renderable.len() * (opening.len() + closing.len()),
    );
    let mut cursor = 0usize;

    for &(start, end, _) in &renderable {
        out.push_str(&text[cursor..start]);
        out.push_str(opening);
        out.push_str(&text[start..end]);
        out.push_str(closing);
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    Ok(out)
}

/// Render the full highlighted HTML document: the annotated text inside an
/// enclosing `<html><body><pre>` container, with the non-highlighted text
/// reproduced byte-for-byte.
pub fn render_html(text: &str, spans: &[FieldSpan]) -> Result<String, HighlightError> {
    let annotated = render(text, spans, HTML_MARK_OPEN, HTML_MARK_CLOSE)?;
    Ok(format!("<html><body><pre>{annotated}</pre></body></html>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_two_spans() {
        let spans = vec![
            FieldSpan::new("a", "BC", 1, 3),
            FieldSpan::new("b", "GH", 6, 8),
        ];
        let out = render("ABCDEFGHIJ", &spans, "[", "]").unwrap();
        assert_eq!(out, "A[BC]DEF[GH]IJ");
    }

    #[test]
    fn test_render_single_span_length() {
        let text = "ABCDEFGHIJ";
        let spans = vec![FieldSpan::new("x", "CDE", 2, 5)];
        let out = render(text, &spans, "<<", ">>").unwrap();
        assert_eq!(out.len(), text.len() + 4);
        assert_eq!(out, "AB<<CDE>>FGHIJ");
    }

    #[test]
    fn test_render_unsorted_input() {
        let spans = vec![
            FieldSpan::new("b", "GH", 6, 8),
            FieldSpan::new("a", "BC", 1, 3),
        ];
        let out = render("ABCDEFGHIJ", &spans, "[", "]").unwrap();
        assert_eq!(out, "A[BC]DEF[GH]IJ");
    }

    #[test]
    fn test_render_discards_unlocated_and_empty() {
        let spans = vec![
            FieldSpan::unlocated("missing", "value"),
            FieldSpan::new("empty", "", 0, 0),
            FieldSpan::new("a", "BC", 1, 3),
        ];
        let out = render("ABCDEFGHIJ", &spans, "[", "]").unwrap();
        assert_eq!(out, "A[BC]DEFGHIJ");
    }

    #[test]
    fn test_render_rejects_overlap() {
        let spans = vec![
            FieldSpan::new("a", "BCD", 1, 4),
            FieldSpan::new("b", "CDE", 2, 5),
        ];
        let err = render("ABCDEFGHIJ", &spans, "[", "]").unwrap_err();
        assert!(matches!(err, HighlightError::Overlap { .. }));
    }

    #[test]
    fn test_render_rejects_out_of_bounds() {
        let spans = vec![FieldSpan::new("a", "X", 8, 20)];
        let err = render("ABCDEFGHIJ", &spans, "[", "]").unwrap_err();
        assert!(matches!(err, HighlightError::OutOfBounds { .. }));
    }

    #[test]
    fn test_render_rejects_mid_char_offsets() {
        let text = "héllo";
        // Offset 2 lands inside the two-byte 'é'.
        let spans = vec![FieldSpan::new("a", "x", 2, 3)];
        let err = render(text, &spans, "[", "]").unwrap_err();
        assert!(matches!(err, HighlightError::NotCharAligned { .. }));
    }

    #[test]
    fn test_render_adjacent_spans_ok() {
        let spans = vec![
            FieldSpan::new("a", "AB", 0, 2),
            FieldSpan::new("b", "CD", 2, 4),
        ];
        let out = render("ABCD", &spans, "[", "]").unwrap();
        assert_eq!(out, "[AB][CD]");
    }

    #[test]
    fn test_normalize_drops_overlapping_keeps_leftmost() {
        let spans = vec![
            FieldSpan::new("a", "BCD", 1, 4),
            FieldSpan::new("b", "CDE", 2, 5),
            FieldSpan::new("c", "GH", 6, 8),
        ];
        let kept = normalize_spans(&spans);
        let fields: Vec<&str> = kept.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "c"]);
    }

    #[test]
    fn test_render_html_wrapper() {
        let spans = vec![FieldSpan::new("a", "BC", 1, 3)];
        let html = render_html("ABCD", &spans).unwrap();
        assert_eq!(
            html,
            "<html><body><pre>A<span style=\"background-color: yellow;\">BC</span>D</pre></body></html>"
        );
    }

    #[test]
    fn test_render_no_spans_reproduces_text() {
        let out = render("unchanged text", &[], "[", "]").unwrap();
        assert_eq!(out, "unchanged text");
    }
}
