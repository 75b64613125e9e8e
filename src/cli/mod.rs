//! Command-line interface for covenant.
//!
//! Provides commands for extracting contract terms, detecting breaches
//! against the delivery store, producing highlighted evidence copies, and
//! managing the query cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use crate::cache::CacheStore;
use crate::config;
use crate::detect::BreachDetector;
use crate::document::Document;
use crate::evidence::{self, FieldSpan, MatchResult};
use crate::extract::{ExtractionSchema, TermExtractor};
use crate::llm::{OpenAiService, QueryClient};
use crate::store::DeliveryStore;

/// covenant - contract term extraction, evidence grounding, and breach detection
#[derive(Parser, Debug)]
#[command(name = "covenant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract contract terms as JSON
    Extract {
        /// Contract document to process
        contract: PathBuf,
    },

    /// Check contracts against the delivery store for breaches
    Detect {
        /// Contract paths or glob patterns
        contracts: Vec<String>,
    },

    /// Write a highlighted HTML copy of a contract
    Highlight {
        /// Contract document to process
        contract: PathBuf,

        /// Questions whose evidence should be highlighted (repeatable);
        /// without any, the standard term fields are highlighted instead
        #[arg(short, long)]
        query: Vec<String>,

        /// Output HTML path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Locate a snippet inside a contract document
    Locate {
        /// Contract document to search
        contract: PathBuf,

        /// Snippet to locate
        snippet: String,

        /// Acceptance threshold (0-100) for similarity strategies
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Restrict to a single strategy instead of escalating
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Delete every cached query result
    CacheClear,
}

/// Localization strategy selector
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Strategy {
    /// Escalate through all strategies
    Auto,
    /// Literal substring search only
    Exact,
    /// Whole-document similarity gate
    Gate,
    /// Best-window similarity search
    Window,
    /// Bounded edit-distance search
    Distance,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Extract { contract } => extract_terms(&contract).await,
            Commands::Detect { contracts } => detect_breaches(&contracts).await,
            Commands::Highlight {
                contract,
                query,
                output,
            } => highlight(&contract, &query, &output).await,
            Commands::Locate {
                contract,
                snippet,
                threshold,
                strategy,
            } => {
                locate_snippet(
                    &contract,
                    &snippet,
                    threshold,
                    strategy.unwrap_or(Strategy::Auto),
                )
                .await
            }
            Commands::Config => show_config(),
            Commands::CacheClear => clear_cache().await,
        }
    }
}

/// Build the cached query client from resolved configuration
async fn build_client() -> Result<QueryClient> {
    let cfg = config::config()?;

    let mut service = OpenAiService::from_env(cfg.model.clone())?;
    if let Some(ref base_url) = cfg.base_url {
        service = service.with_base_url(base_url.clone());
    }

    let cache = CacheStore::open(&cfg.cache).await?;
    Ok(QueryClient::new(Arc::new(service), cache))
}

/// Extract terms from a single contract and print them
async fn extract_terms(contract: &Path) -> Result<()> {
    let client = build_client().await?;
    let extractor = TermExtractor::new(&client);
    let schema = ExtractionSchema::contract_enforcement();

    let document = Document::load(contract).await?;
    let value = extractor.extract_terms_raw(&document, &schema).await?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Expand contract arguments: glob patterns fan out, plain paths pass through
fn expand_contracts(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.chars().any(|c| matches!(c, '*' | '?' | '[')) {
            for entry in glob::glob(pattern)
                .with_context(|| format!("Invalid glob pattern: {pattern}"))?
            {
                paths.push(entry?);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    if paths.is_empty() {
        anyhow::bail!("No contract documents matched");
    }
    Ok(paths)
}

/// Run breach detection over every contract, isolating per-document failures
async fn detect_breaches(contracts: &[String]) -> Result<()> {
    let cfg = config::config()?;
    let client = build_client().await?;
    let store = DeliveryStore::open(&cfg.deliveries, &cfg.items)?;
    let extractor = TermExtractor::new(&client);
    let detector = BreachDetector::new(&client, &store);
    let schema = ExtractionSchema::contract_enforcement();

    let mut failures = 0usize;

    for path in expand_contracts(contracts)? {
        println!("----------------------------------------------");
        println!("{}", path.display());

        // One failing document must not halt the rest.
        match detect_one(&extractor, &detector, &schema, &path).await {
            Ok(()) => {}
            Err(e) => {
                failures += 1;
                error!(contract = %path.display(), error = %e, "detection failed");
                println!("Detection failed: {e:#}");
            }
        }
    }

    if failures > 0 {
        info!(failures, "some contracts failed to process");
    }
    Ok(())
}

async fn detect_one(
    extractor: &TermExtractor<'_>,
    detector: &BreachDetector<'_>,
    schema: &ExtractionSchema,
    path: &Path,
) -> Result<()> {
    let document = Document::load(path).await?;
    let terms = extractor.extract_terms(&document, schema).await?;

    println!("Contract number: {}", terms.contract_number);

    match detector.detect(&terms).await? {
        Some(report) => {
            for (i, comparison) in report.comparisons.iter().enumerate() {
                println!("{}. {}", i + 1, comparison);
            }
            if report.breached {
                println!(
                    "The contract has been breached: {}",
                    report.breached_description
                );
            } else {
                println!("No breach detected.");
            }
        }
        None => {
            println!(
                "No delivery records found for contract {}",
                terms.contract_number
            );
        }
    }

    Ok(())
}

/// Produce the highlighted HTML copy of a contract
async fn highlight(contract: &Path, queries: &[String], output: &Path) -> Result<()> {
    let cfg = config::config()?;
    let client = build_client().await?;
    let extractor = TermExtractor::new(&client);
    let document = Document::load(contract).await?;

    let spans: Vec<FieldSpan> = if queries.is_empty() {
        // Field flow: the generator reports positions alongside values.
        let schema = ExtractionSchema::contract_enforcement();
        let fields: Vec<&str> = schema.detail_names().collect();
        extractor
            .extract_terms_with_locations(&document, &fields)
            .await?
    } else {
        // Query flow: ask for the exact wording, then ground it ourselves.
        let mut spans = Vec::with_capacity(queries.len());
        for query in queries {
            let quote = extractor.evidence_for(&document, query).await?;
            let result = evidence::locate(&quote, document.full_text(), cfg.threshold);

            match result.found() {
                Some(m) => match m.span() {
                    Some((start, end)) => {
                        spans.push(FieldSpan::new(query.clone(), quote, start, end));
                    }
                    None => {
                        info!(%query, score = m.score, "evidence approved but unlocated");
                        spans.push(FieldSpan::unlocated(query.clone(), quote));
                    }
                },
                None => {
                    info!(%query, "no evidence located");
                    spans.push(FieldSpan::unlocated(query.clone(), quote));
                }
            }
        }
        spans
    };

    let spans = evidence::normalize_spans(&spans);
    let html = evidence::render_html(document.full_text(), &spans)?;

    tokio::fs::write(output, html)
        .await
        .with_context(|| format!("Failed to write highlighted copy: {}", output.display()))?;

    println!(
        "Highlighted {} span(s) into {}",
        spans.len(),
        output.display()
    );
    Ok(())
}

/// Run the locator directly and print the result as JSON
async fn locate_snippet(
    contract: &Path,
    snippet: &str,
    threshold: Option<f64>,
    strategy: Strategy,
) -> Result<()> {
    let threshold = threshold.unwrap_or(config::config()?.threshold);
    let document = Document::load(contract).await?;
    let text = document.full_text();

    let result: MatchResult = match strategy {
        Strategy::Auto => evidence::locate(snippet, text, threshold),
        Strategy::Exact => evidence::exact_search(snippet, text),
        Strategy::Gate => evidence::document_gate(snippet, text, threshold),
        Strategy::Window => evidence::best_window_search(snippet, text, threshold),
        Strategy::Distance => evidence::bounded_distance_search(
            snippet,
            text,
            evidence::default_max_distance(snippet),
        ),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Show the resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Resolved configuration:");
    println!("  home:       {}", cfg.home.display());
    println!("  cache:      {}", cfg.cache.display());
    println!("  deliveries: {}", cfg.deliveries.display());
    println!("  items:      {}", cfg.items.display());
    println!("  model:      {}", cfg.model);
    println!("  threshold:  {}", cfg.threshold);
    match &cfg.config_file {
        Some(path) => println!("  config:     {}", path.display()),
        None => println!("  config:     (none found)"),
    }
    Ok(())
}

/// Delete every cached query result
async fn clear_cache() -> Result<()> {
    let cache = CacheStore::open(config::cache_dir()?).await?;
    let removed = cache.clear().await?;
    println!("Removed {removed} cache entries");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_contracts_plain_path() {
        let paths = expand_contracts(&["contracts/copper.txt".to_string()]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("contracts/copper.txt")]);
    }

    #[test]
    fn test_expand_contracts_empty_is_error() {
        assert!(expand_contracts(&[]).is_err());
    }

    #[test]
    fn test_expand_contracts_glob() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "x").unwrap();
        std::fs::write(temp.path().join("b.txt"), "x").unwrap();

        let pattern = format!("{}/*.txt", temp.path().display());
        let paths = expand_contracts(&[pattern]).unwrap();
        assert_eq!(paths.len(), 2);
    }
}
