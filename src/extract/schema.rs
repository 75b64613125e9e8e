//! Typed extraction schemas.
//!
//! A schema enumerates the fields the generation step should extract and the
//! shape each value is expected to take. Schemas are validated when built,
//! so a malformed field list fails before any service call is made. The
//! schema renders to the JSON template embedded in the extraction prompt.

use std::collections::BTreeMap;
use std::collections::HashSet;

use anyhow::{bail, Result};
use serde_json::{json, Value};

/// Expected shape of an extracted value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Free text
    Text,
    /// Calendar date
    Date,
    /// Numeric amount
    Number,
    /// Physical dimensions string
    Dimensions,
}

impl FieldShape {
    /// Placeholder rendered into the prompt template
    fn placeholder(&self) -> &'static str {
        match self {
            FieldShape::Date => "YYYY-MM-DD",
            FieldShape::Text | FieldShape::Number | FieldShape::Dimensions => "",
        }
    }
}

/// A named field and its expected shape
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub shape: FieldShape,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// A validated extraction schema.
///
/// Fields are split the way the enforcement flow consumes them: `info`
/// identifies the contract (who, which number), `details` are the terms
/// checked against delivered values.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    name: String,
    info_fields: Vec<FieldSpec>,
    detail_fields: Vec<FieldSpec>,
}

impl ExtractionSchema {
    /// Build a schema, rejecting empty or duplicate field names
    pub fn new(
        name: impl Into<String>,
        info_fields: Vec<FieldSpec>,
        detail_fields: Vec<FieldSpec>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            bail!("Schema name cannot be empty");
        }
        if info_fields.is_empty() && detail_fields.is_empty() {
            bail!("Schema '{}' has no fields", name);
        }

        let mut seen = HashSet::new();
        for field in info_fields.iter().chain(detail_fields.iter()) {
            if field.name.is_empty() {
                bail!("Schema '{}' has a field with an empty name", name);
            }
            if !seen.insert(field.name.as_str()) {
                bail!("Schema '{}' has duplicate field '{}'", name, field.name);
            }
        }

        Ok(Self {
            name,
            info_fields,
            detail_fields,
        })
    }

    /// The contract-enforcement schema: identity fields plus the delivery
    /// terms compared against the delivery store.
    pub fn contract_enforcement() -> Self {
        Self {
            name: "contract_enforcement".to_string(),
            info_fields: vec![
                FieldSpec::new("supplier_name", FieldShape::Text),
                FieldSpec::new("contract_number", FieldShape::Text),
            ],
            detail_fields: vec![
                FieldSpec::new("delivery_date", FieldShape::Date),
                FieldSpec::new("pallet_dimensions", FieldShape::Dimensions),
                FieldSpec::new("quantity", FieldShape::Number),
                FieldSpec::new("weight", FieldShape::Number),
            ],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail_names(&self) -> impl Iterator<Item = &str> {
        self.detail_fields.iter().map(|f| f.name.as_str())
    }

    /// JSON template embedded in the extraction prompt
    pub fn template(&self) -> Value {
        let section = |fields: &[FieldSpec]| -> Value {
            let map: serde_json::Map<String, Value> = fields
                .iter()
                .map(|f| (f.name.clone(), Value::String(f.shape.placeholder().into())))
                .collect();
            Value::Object(map)
        };

        json!({
            "info": section(&self.info_fields),
            "details": section(&self.detail_fields),
        })
    }
}

/// Contract terms decoded from an extraction response
#[derive(Debug, Clone, PartialEq)]
pub struct ContractTerms {
    pub supplier_name: String,
    pub contract_number: String,
    /// Enforceable terms, keyed by field name
    pub details: BTreeMap<String, String>,
}

/// Render a JSON scalar the way it would appear in prose
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl ContractTerms {
    /// Decode terms from the extraction response, tolerating scalars where
    /// strings were asked for. Missing fields decode as empty.
    pub fn from_value(value: &Value) -> Self {
        let info = &value["info"];
        let details = value["details"]
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            supplier_name: value_to_string(&info["supplier_name"]),
            contract_number: value_to_string(&info["contract_number"]),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforcement_schema_template() {
        let schema = ExtractionSchema::contract_enforcement();
        let template = schema.template();
        assert_eq!(template["info"]["supplier_name"], "");
        assert_eq!(template["details"]["delivery_date"], "YYYY-MM-DD");
        assert_eq!(template["details"]["quantity"], "");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = ExtractionSchema::new(
            "bad",
            vec![FieldSpec::new("quantity", FieldShape::Number)],
            vec![FieldSpec::new("quantity", FieldShape::Number)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(ExtractionSchema::new("empty", vec![], vec![]).is_err());
        assert!(ExtractionSchema::new("", vec![FieldSpec::new("x", FieldShape::Text)], vec![]).is_err());
    }

    #[test]
    fn test_empty_field_name_rejected() {
        let result = ExtractionSchema::new(
            "bad",
            vec![FieldSpec::new("", FieldShape::Text)],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_terms_from_value() {
        let value = serde_json::json!({
            "info": {"supplier_name": "AluMetals", "contract_number": 332889},
            "details": {"quantity": "50", "weight": 35.13}
        });
        let terms = ContractTerms::from_value(&value);
        assert_eq!(terms.supplier_name, "AluMetals");
        assert_eq!(terms.contract_number, "332889");
        assert_eq!(terms.details["quantity"], "50");
        assert_eq!(terms.details["weight"], "35.13");
    }

    #[test]
    fn test_terms_tolerate_missing_sections() {
        let terms = ContractTerms::from_value(&serde_json::json!({}));
        assert_eq!(terms.contract_number, "");
        assert!(terms.details.is_empty());
    }
}
