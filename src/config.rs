/// Configuration module for bugscope.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedder::hash::{DEFAULT_DIMENSIONS, MIN_DIMENSIONS};
use crate::indexer::scoring::ScoringMode;
use crate::patch::EngineKind;

// ── Default value functions ──────────────────────────────────────────

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

fn default_search_top_k() -> usize {
    5
}

fn default_exclude_dirs() -> Vec<String> {
    vec![".git".to_string(), "__pycache__".to_string()]
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Bucket count of the hashing embedder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default)]
    pub scoring: ScoringMode,

    /// SQLite file for the index; in-memory only when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,

    /// Directory names pruned from repository walks.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    #[serde(default)]
    pub patch: PatchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PatchConfig {
    #[serde(default)]
    pub engine: EngineKind,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            search_top_k: default_search_top_k(),
            scoring: ScoringMode::default(),
            db_path: None,
            exclude_dirs: default_exclude_dirs(),
            patch: PatchConfig::default(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file or invalid JSON yields the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {}: {e}", path.display());
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.dimensions >= MIN_DIMENSIONS,
            "dimensions must be at least {MIN_DIMENSIONS}"
        );
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
