//! Explicit instance bundle for one repository.
//!
//! Orchestrators own a `CodeIntel` and hand its parts to whatever needs them;
//! several contexts can coexist in one process.
use crate::config::Config;
use crate::db::Db;
use crate::embedder::hash::HashEmbedder;
use crate::graph::DependencyGraph;
use crate::indexer::core::SemanticIndex;
use crate::indexer::scoring::{LexicalScorer, ScoringMode, ScoringStrategy, VectorScorer};
use crate::patch::PatchEngine;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct CodeIntel {
    pub config: Arc<Config>,
    pub index: Arc<SemanticIndex>,
    pub graph: Arc<DependencyGraph>,
    pub patcher: Arc<PatchEngine>,
}

impl CodeIntel {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let scorer: Box<dyn ScoringStrategy> = match config.scoring {
            ScoringMode::Vector => {
                let embedder = HashEmbedder::new(config.dimensions)?;
                Box::new(VectorScorer::new(Arc::new(embedder)))
            }
            ScoringMode::Lexical => Box::new(LexicalScorer),
        };

        let index = match &config.db_path {
            Some(path) => {
                let db = Db::open(path).context("Failed to open index database")?;
                SemanticIndex::with_db(scorer, db)?
            }
            None => SemanticIndex::new(scorer),
        }
        .with_excludes(config.exclude_dirs.clone());

        let graph = DependencyGraph::new().with_excludes(config.exclude_dirs.clone());
        let patcher = PatchEngine::from_kind(config.patch.engine)?;

        info!(
            "Code intelligence ready (scoring: {}, patch engine: {})",
            index.mode(),
            patcher.engine()
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            index: Arc::new(index),
            graph: Arc::new(graph),
            patcher: Arc::new(patcher),
        })
    }
}
