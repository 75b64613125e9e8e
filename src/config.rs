//! Configuration for covenant paths and service settings.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (COVENANT_HOME, COVENANT_CACHE)
//! 2. Config file (.covenant/config.yaml)
//! 3. Defaults (~/.covenant)
//!
//! Config file discovery:
//! - Searches current directory and parents for .covenant/config.yaml
//! - Paths in the config file are relative to the config file's parent
//!   directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<std::result::Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub service: Option<ServiceConfig>,
    #[serde(default)]
    pub matching: Option<MatchingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to config file)
    pub home: Option<String>,
    /// Query cache directory (relative to config file)
    pub cache: Option<String>,
    /// Deliveries export (relative to config file)
    pub deliveries: Option<String>,
    /// Items export (relative to config file)
    pub items: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub threshold: Option<f64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to covenant home (state)
    pub home: PathBuf,
    /// Absolute path to the query cache directory
    pub cache: PathBuf,
    /// Deliveries export path
    pub deliveries: PathBuf,
    /// Items export path
    pub items: PathBuf,
    /// Chat model identifier
    pub model: String,
    /// Override for the service endpoint
    pub base_url: Option<String>,
    /// Acceptance threshold for similarity matching
    pub threshold: f64,
    /// Path to the config file (if found)
    pub config_file: Option<PathBuf>,
}

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_THRESHOLD: f64 = 80.0;

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".covenant").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".covenant");

    let config_file = find_config_file();

    let (home, cache, deliveries, items, model, base_url, threshold) =
        if let Some(ref config_path) = config_file {
            let config = load_config_file(config_path)?;

            // Base directory is the parent of .covenant/
            let base_dir = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."));

            let home = if let Ok(env_home) = std::env::var("COVENANT_HOME") {
                PathBuf::from(env_home)
            } else if let Some(ref home_path) = config.paths.home {
                resolve_path(base_dir, home_path)
            } else {
                default_home.clone()
            };

            let cache = if let Ok(env_cache) = std::env::var("COVENANT_CACHE") {
                PathBuf::from(env_cache)
            } else if let Some(ref cache_path) = config.paths.cache {
                resolve_path(base_dir, cache_path)
            } else {
                home.join("cache")
            };

            let deliveries = config
                .paths
                .deliveries
                .as_ref()
                .map(|p| resolve_path(base_dir, p))
                .unwrap_or_else(|| home.join("db").join("deliveries.json"));

            let items = config
                .paths
                .items
                .as_ref()
                .map(|p| resolve_path(base_dir, p))
                .unwrap_or_else(|| home.join("db").join("items.json"));

            let model = config
                .service
                .as_ref()
                .and_then(|s| s.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string());

            let base_url = config.service.as_ref().and_then(|s| s.base_url.clone());

            let threshold = config
                .matching
                .as_ref()
                .and_then(|m| m.threshold)
                .unwrap_or(DEFAULT_THRESHOLD);

            (home, cache, deliveries, items, model, base_url, threshold)
        } else {
            let home = std::env::var("COVENANT_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_home.clone());

            let cache = std::env::var("COVENANT_CACHE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join("cache"));

            let deliveries = home.join("db").join("deliveries.json");
            let items = home.join("db").join("items.json");

            (
                home,
                cache,
                deliveries,
                items,
                DEFAULT_MODEL.to_string(),
                None,
                DEFAULT_THRESHOLD,
            )
        };

    Ok(ResolvedConfig {
        home,
        cache,
        deliveries,
        items,
        model,
        base_url,
        threshold,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the query cache directory
pub fn cache_dir() -> Result<PathBuf> {
    Ok(config()?.cache.clone())
}
