//! Delivery records store.
//!
//! Loads the deliveries and items JSON exports into an in-memory SQLite
//! database and answers contract lookups with a join across the two tables.
//! The store is read-only after construction.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

/// A joined deliveries-items row for one contract
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRecord {
    pub delivery_id: i64,
    pub delivery_date: String,
    pub supplier: String,
    pub material_number: String,
    pub description: String,
    pub quantity: f64,
    pub weight: f64,
    pub pallet_dimensions: String,
    pub contract_number: String,
}

/// In-memory store over the deliveries and items exports
pub struct DeliveryStore {
    conn: Connection,
}

/// Render a JSON scalar as text (numbers without quoting artifacts)
fn text_field(record: &Value, key: &str) -> String {
    match &record[key] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn number_field(record: &Value, key: &str) -> f64 {
    match &record[key] {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn int_field(record: &Value, key: &str) -> i64 {
    match &record[key] {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

impl DeliveryStore {
    /// Load both exports into a fresh in-memory database
    pub fn open(deliveries_path: impl AsRef<Path>, items_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;

        conn.execute_batch(
            "CREATE TABLE deliveries (
                 delivery_id   INTEGER PRIMARY KEY,
                 delivery_date TEXT NOT NULL,
                 supplier      TEXT NOT NULL
             );
             CREATE TABLE items (
                 item_id           INTEGER PRIMARY KEY,
                 delivery_id       INTEGER NOT NULL,
                 material_number   TEXT NOT NULL,
                 description       TEXT NOT NULL,
                 quantity          REAL NOT NULL,
                 weight            REAL NOT NULL,
                 pallet_dimensions TEXT NOT NULL,
                 contract_number   TEXT NOT NULL
             );",
        )
        .context("Failed to create tables")?;

        let store = Self { conn };
        store.load_deliveries(deliveries_path.as_ref())?;
        store.load_items(items_path.as_ref())?;
        Ok(store)
    }

    fn read_records(path: &Path) -> Result<Vec<Value>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(records)
    }

    fn load_deliveries(&self, path: &Path) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO deliveries (delivery_id, delivery_date, supplier) VALUES (?1, ?2, ?3)")?;

        for record in Self::read_records(path)? {
            stmt.execute(rusqlite::params![
                int_field(&record, "delivery_id"),
                text_field(&record, "delivery_date"),
                text_field(&record, "supplier"),
            ])
            .context("Failed to insert delivery row")?;
        }
        Ok(())
    }

    fn load_items(&self, path: &Path) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO items (item_id, delivery_id, material_number, description,
                                quantity, weight, pallet_dimensions, contract_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for record in Self::read_records(path)? {
            stmt.execute(rusqlite::params![
                int_field(&record, "item_id"),
                int_field(&record, "delivery_id"),
                text_field(&record, "material_number"),
                text_field(&record, "description"),
                number_field(&record, "quantity"),
                number_field(&record, "weight"),
                text_field(&record, "pallet_dimensions"),
                text_field(&record, "contract_number"),
            ])
            .context("Failed to insert item row")?;
        }
        Ok(())
    }

    /// All delivered rows recorded against a contract number.
    ///
    /// An unknown contract returns an empty list, not an error.
    pub fn lookup_contract(&self, contract_number: &str) -> Result<Vec<DeliveryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.delivery_id, d.delivery_date, d.supplier,
                    i.material_number, i.description, i.quantity, i.weight,
                    i.pallet_dimensions, i.contract_number
             FROM deliveries d
             JOIN items i ON d.delivery_id = i.delivery_id
             WHERE i.contract_number = ?1
             ORDER BY d.delivery_id, i.item_id",
        )?;

        let rows = stmt
            .query_map([contract_number], |row| {
                Ok(DeliveryRecord {
                    delivery_id: row.get(0)?,
                    delivery_date: row.get(1)?,
                    supplier: row.get(2)?,
                    material_number: row.get(3)?,
                    description: row.get(4)?,
                    quantity: row.get(5)?,
                    weight: row.get(6)?,
                    pallet_dimensions: row.get(7)?,
                    contract_number: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read contract rows")?;

        Ok(rows)
    }
}
