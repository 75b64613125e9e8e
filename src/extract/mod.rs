//! Term extraction and evidence generation prompts.
//!
//! Composes the natural-language requests sent through the cached query
//! client: schema-driven term extraction, per-field extraction with
//! locations, and "quote the exact wording" evidence generation. Responses
//! are decoded leniently: the generator's position fields may arrive as
//! integers, numeric strings, or empty strings.

pub mod schema;

use anyhow::{bail, Result};
use serde_json::Value;

use crate::document::Document;
use crate::evidence::FieldSpan;
use crate::llm::{ChatMessage, QueryClient};

pub use schema::{ContractTerms, ExtractionSchema, FieldShape, FieldSpec};

/// Extraction operations over a cached query client
pub struct TermExtractor<'a> {
    client: &'a QueryClient,
}

impl<'a> TermExtractor<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    /// Extract the schema's fields from a document
    pub async fn extract_terms(
        &self,
        document: &Document,
        schema: &ExtractionSchema,
    ) -> Result<ContractTerms> {
        let value = self.extract_terms_raw(document, schema).await?;
        Ok(ContractTerms::from_value(&value))
    }

    /// Extract the schema's fields, returning the undecoded structure
    pub async fn extract_terms_raw(
        &self,
        document: &Document,
        schema: &ExtractionSchema,
    ) -> Result<Value> {
        let messages = vec![
            ChatMessage::system(format!(
                "You are an assistant that extracts structured information from \
                 documents. Output the extracted information as JSON in exactly \
                 this format: {}.",
                schema.template()
            )),
            ChatMessage::user(format!(
                "Extract the key details from the following document:\n\n{}",
                document.full_text()
            )),
        ];

        self.client.query(&messages).await
    }

    /// Extract named fields together with their positions in the document.
    ///
    /// Every requested field comes back as a [`FieldSpan`]; fields the
    /// generator could not place (or answered with unparseable positions)
    /// have no offsets.
    pub async fn extract_terms_with_locations(
        &self,
        document: &Document,
        fields: &[&str],
    ) -> Result<Vec<FieldSpan>> {
        let messages = vec![
            ChatMessage::system(format!(
                "You are a document parser. Extract the specified fields along \
                 with their locations in the document. Each field must have a \
                 'value', 'start_position', and 'end_position'. The fields are: \
                 {fields:?}. Output in the JSON format: \
                 {{\"field\": {{\"value\": \"\", \"start_position\": \"\", \
                 \"end_position\": \"\"}}...}}."
            )),
            ChatMessage::user(format!(
                "Extract the key details from the following document. If a value \
                 is missing, leave it empty. Ensure the response follows the \
                 described format:\n\n{}",
                document.full_text()
            )),
        ];

        let value = self.client.query(&messages).await?;
        Ok(fields
            .iter()
            .map(|name| field_span_from_value(name, &value[*name]))
            .collect())
    }

    /// Ask for the exact contiguous wording in the document that evidences
    /// `claim`. The returned string is the generator's quote; resolving it
    /// to offsets is the locator's job.
    pub async fn evidence_for(&self, document: &Document, claim: &str) -> Result<String> {
        let messages = vec![
            ChatMessage::system(
                "You are an assistant that, given a text string, searches the \
                 given document and returns the exact wording from the document. \
                 Include the surrounding context needed to make the result one \
                 continuous string exactly as it appears in the document. Input \
                 arrives as:\n\
                 Document: <document text>\n\
                 text to evidence: <text>\n\
                 Output in the JSON form {\"evidence\": <exact wording>}\n\n\
                 Document: 'This is a test contract. specific piece of \
                 information to be returned: password123. Rest of the test \
                 contract'\n\
                 text to evidence: 'specific piece of information: password123'\n\
                 {\"evidence\": \"specific piece of information to be returned: \
                 password123\"}",
            ),
            ChatMessage::user(format!(
                "Document: {}\ntext to evidence: {}",
                document.full_text(),
                claim
            )),
        ];

        let value = self.client.query(&messages).await?;
        match value["evidence"].as_str() {
            Some(evidence) => Ok(evidence.to_string()),
            None => bail!("Evidence response carried no 'evidence' field: {value}"),
        }
    }
}

/// Parse a position that may arrive as an integer, a numeric string, or an
/// empty placeholder.
fn parse_position(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode one field's record into a span, treating unusable positions as
/// unresolved rather than failing the document.
fn field_span_from_value(name: &str, record: &Value) -> FieldSpan {
    let value = record["value"].as_str().unwrap_or_default().to_string();
    let start = parse_position(&record["start_position"]);
    let end = parse_position(&record["end_position"]);

    match (start, end) {
        (Some(start), Some(end)) => FieldSpan {
            field: name.to_string(),
            value,
            start: Some(start),
            end: Some(end),
        },
        _ => FieldSpan::unlocated(name, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_position_variants() {
        assert_eq!(parse_position(&json!(42)), Some(42));
        assert_eq!(parse_position(&json!("42")), Some(42));
        assert_eq!(parse_position(&json!(" 7 ")), Some(7));
        assert_eq!(parse_position(&json!("")), None);
        assert_eq!(parse_position(&json!(null)), None);
        assert_eq!(parse_position(&json!(-3)), None);
    }

    #[test]
    fn test_field_span_with_positions() {
        let record = json!({"value": "2024-06-15", "start_position": "10", "end_position": 20});
        let span = field_span_from_value("delivery_date", &record);
        assert_eq!(span.start, Some(10));
        assert_eq!(span.end, Some(20));
        assert_eq!(span.value, "2024-06-15");
    }

    #[test]
    fn test_field_span_without_positions_is_unlocated() {
        let record = json!({"value": "50", "start_position": "", "end_position": ""});
        let span = field_span_from_value("quantity", &record);
        assert_eq!(span.start, None);
        assert_eq!(span.end, None);
        assert!(!span.is_renderable());
    }

    #[test]
    fn test_field_span_missing_record() {
        let span = field_span_from_value("weight", &json!(null));
        assert_eq!(span.value, "");
        assert!(!span.is_renderable());
    }
}
