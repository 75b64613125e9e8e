//! Document loading and flattened text.
//!
//! A document is an ordered list of paragraph strings flattened into a
//! single immutable full-text string (paragraphs joined with `\n`). All
//! evidence offsets refer to that flattened string. Parsing richer source
//! formats is an external concern; the loader here reads UTF-8 text files,
//! one paragraph per line.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

/// An immutable loaded document
#[derive(Debug, Clone)]
pub struct Document {
    paragraphs: Vec<String>,
    text: String,
}

impl Document {
    /// Build a document from ordered paragraphs
    pub fn from_paragraphs(paragraphs: Vec<String>) -> Self {
        let text = paragraphs.join("\n");
        Self { paragraphs, text }
    }

    /// Load a document from a UTF-8 text file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document: {}", path.display()))?;

        let paragraphs = content
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        Ok(Self::from_paragraphs(paragraphs))
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// The flattened full text all offsets refer to
    pub fn full_text(&self) -> &str {
        &self.text
    }
}
