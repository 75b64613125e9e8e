//! Breach detection: contract terms versus delivered values.
//!
//! Each enforceable term is rendered as a comparison sentence against the
//! delivered value on record, and the comparison list is sent to the
//! generation service for a breach verdict.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::extract::ContractTerms;
use crate::llm::{ChatMessage, QueryClient};
use crate::store::{DeliveryRecord, DeliveryStore};

/// The service's verdict over a comparison list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachVerdict {
    pub breached: bool,
    #[serde(default)]
    pub breached_description: String,
}

/// A full detection result for one contract
#[derive(Debug, Clone, Serialize)]
pub struct BreachReport {
    pub id: Uuid,
    pub contract_number: String,
    pub comparisons: Vec<String>,
    pub breached: bool,
    pub breached_description: String,
    pub analysed_at: DateTime<Utc>,
}

/// Breach detection over a delivery store and a cached query client
pub struct BreachDetector<'a> {
    client: &'a QueryClient,
    store: &'a DeliveryStore,
}

/// The delivered value for a contract detail field, if the store records it
fn delivered_value(record: &DeliveryRecord, field: &str) -> Option<String> {
    match field {
        "delivery_date" => Some(record.delivery_date.clone()),
        "pallet_dimensions" => Some(record.pallet_dimensions.clone()),
        "quantity" => Some(record.quantity.to_string()),
        "weight" => Some(record.weight.to_string()),
        _ => None,
    }
}

/// One comparison sentence per non-empty contract detail with a delivered
/// counterpart
pub fn comparisons(terms: &ContractTerms, record: &DeliveryRecord) -> Vec<String> {
    terms
        .details
        .iter()
        .filter(|(_, expected)| !expected.is_empty())
        .filter_map(|(field, expected)| match delivered_value(record, field) {
            Some(actual) => Some(format!(
                "The contract states that the value for {field} should be {expected}. \
                 The delivered value was {actual}."
            )),
            None => {
                warn!(field, "no delivered counterpart for contract detail, skipping");
                None
            }
        })
        .collect()
}

impl<'a> BreachDetector<'a> {
    pub fn new(client: &'a QueryClient, store: &'a DeliveryStore) -> Self {
        Self { client, store }
    }

    /// Delivered rows recorded against the contract's number
    pub fn search_store(&self, terms: &ContractTerms) -> Result<Vec<DeliveryRecord>> {
        self.store.lookup_contract(&terms.contract_number)
    }

    /// Ask the service whether the comparisons amount to a breach
    pub async fn analyse(&self, comparisons: &[String]) -> Result<BreachVerdict> {
        let messages = vec![
            ChatMessage::system(
                "You are an assistant that reviews comparisons between contracted \
                 and delivered values and decides whether the contract has been \
                 breached. A delivered value that falls short of, exceeds, or \
                 otherwise fails to satisfy the contracted value is a breach. \
                 Output in the JSON form {\"breached\": <true or false>, \
                 \"breached_description\": <description of every breach found, \
                 empty string if none>}.",
            ),
            ChatMessage::user(
                comparisons
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}. {}", i + 1, c))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        ];

        let value = self.client.query(&messages).await?;
        serde_json::from_value(value).context("Breach verdict had an unexpected shape")
    }

    /// Run the full detection flow for one contract's terms.
    ///
    /// Returns `None` when the store has no delivered rows for the contract
    /// number; an empty lookup is a normal outcome, not a failure. When
    /// several rows exist, the first delivered row is compared (rows are
    /// ordered by delivery then item).
    pub async fn detect(&self, terms: &ContractTerms) -> Result<Option<BreachReport>> {
        if terms.contract_number.is_empty() {
            anyhow::bail!("Extracted terms carry no contract number");
        }

        let records = self.search_store(terms)?;
        let Some(record) = records.first() else {
            return Ok(None);
        };

        let comparisons = comparisons(terms, record);
        let verdict = self.analyse(&comparisons).await?;

        Ok(Some(BreachReport {
            id: Uuid::new_v4(),
            contract_number: terms.contract_number.clone(),
            comparisons,
            breached: verdict.breached,
            breached_description: verdict.breached_description,
            analysed_at: Utc::now(),
        }))
    }
}
