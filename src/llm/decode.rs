//! Structured-value extraction from raw generation output.
//!
//! The upstream generator is not guaranteed to emit strictly valid JSON: it
//! may wrap the object in a fenced code block, or quote with single quotes.
//! Decoding therefore extracts the JSON-shaped substring first (fenced block
//! interior, else the outermost brace-delimited run), tries a straight parse,
//! and falls back to one repair pass swapping single quotes for double
//! quotes. Anything beyond that is surfaced as [`DecodeError`] with the raw
//! content attached for diagnosis.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Raised when no structured value can be recovered from a response
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no JSON object found in response content")]
    NoJsonObject { raw: String },

    #[error("extracted JSON failed to parse: {source}")]
    Parse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// The raw response content, for diagnostics
    pub fn raw(&self) -> &str {
        match self {
            DecodeError::NoJsonObject { raw } | DecodeError::Parse { raw, .. } => raw,
        }
    }
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("fenced-block pattern is valid"))
}

/// The JSON-shaped substring of `raw`: a fenced block interior if one is
/// present, otherwise the outermost brace-delimited run.
fn json_candidate(raw: &str) -> Option<&str> {
    if let Some(captures) = fenced_block_re().captures(raw) {
        return Some(captures.get(1).expect("pattern has one group").as_str());
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Extract a structured value from raw response text.
pub fn decode(raw: &str) -> Result<serde_json::Value, DecodeError> {
    let candidate = json_candidate(raw).ok_or_else(|| DecodeError::NoJsonObject {
        raw: raw.to_string(),
    })?;

    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(_) => {
            // Single repair pass: the generator sometimes quotes with
            // apostrophes instead of double quotes.
            let repaired = candidate.replace('\'', "\"");
            serde_json::from_str(&repaired).map_err(|source| DecodeError::Parse {
                raw: raw.to_string(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let value = decode(r#"{"evidence": "exact wording"}"#).unwrap();
        assert_eq!(value, json!({"evidence": "exact wording"}));
    }

    #[test]
    fn test_fenced_block_equals_unfenced() {
        let unfenced = decode(r#"{"a": 1}"#).unwrap();
        let fenced = decode("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(unfenced, fenced);
    }

    #[test]
    fn test_surrounding_prose_stripped() {
        let raw = "Here is the result you asked for:\n{\"quantity\": \"50\"}\nLet me know!";
        let value = decode(raw).unwrap();
        assert_eq!(value, json!({"quantity": "50"}));
    }

    #[test]
    fn test_single_quote_repair() {
        let value = decode("{'evidence': 'delivery by June'}").unwrap();
        assert_eq!(value, json!({"evidence": "delivery by June"}));
    }

    #[test]
    fn test_nested_object_outermost_braces() {
        let raw = r#"{"info": {"contract_number": "332889"}, "details": {"quantity": "50"}}"#;
        let value = decode(raw).unwrap();
        assert_eq!(value["info"]["contract_number"], "332889");
    }

    #[test]
    fn test_no_json_is_error() {
        let err = decode("I could not find anything relevant.").unwrap_err();
        assert!(matches!(err, DecodeError::NoJsonObject { .. }));
        assert_eq!(err.raw(), "I could not find anything relevant.");
    }

    #[test]
    fn test_unrepairable_is_error_with_raw() {
        let raw = "{not json at all]}";
        let err = decode(raw).unwrap_err();
        assert!(matches!(err, DecodeError::Parse { .. }));
        assert_eq!(err.raw(), raw);
    }

    #[test]
    fn test_fenced_block_wins_over_outer_braces() {
        let raw = "prose {decoy} more\n```json\n{\"real\": true}\n```";
        let value = decode(raw).unwrap();
        assert_eq!(value, json!({"real": true}));
    }
}
