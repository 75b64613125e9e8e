//! Evidence grounding: locating generated snippets in source documents and
//! rendering highlighted output.
//!
//! The generation step returns free-text quotes it believes appear in the
//! document. This module re-locates those quotes as concrete byte spans
//! (escalating from exact search through fuzzy strategies) and splices
//! highlight markers around the accepted spans.
//!
//! # Design Principles
//!
//! - **Honest unresolved**: a quote that cannot be placed keeps a score but
//!   no offsets; we never fabricate a span.
//! - **Absence is a value**: "no match" is [`MatchResult::NotFound`], not an
//!   error.
//! - **No silent offset corruption**: overlapping highlight spans are
//!   rejected before any text is mutated.

pub mod highlight;
pub mod locate;
pub mod similarity;

pub use highlight::{
    normalize_spans, render, render_html, FieldSpan, HighlightError, HTML_MARK_CLOSE,
    HTML_MARK_OPEN,
};
pub use locate::{
    best_window_search, bounded_distance_search, default_max_distance, document_gate,
    exact_search, locate, Match, MatchResult, DEFAULT_THRESHOLD,
};
pub use similarity::token_set_score;
