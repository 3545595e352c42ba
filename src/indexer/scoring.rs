//! Ranking strategies for the semantic index.
//!
//! A strategy is chosen when the index is constructed and used for every
//! build and query of that index. Vector and lexical scores are never mixed.
use crate::db::models::IndexedEntry;
use crate::embedder::{Embedder, EmbedderError, dot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Similarity of embeddings, `1 / (1 + cosine_distance)`, in (0, 1].
    #[default]
    Vector,
    /// Number of query-token occurrences, a non-negative count.
    Lexical,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Vector => "vector",
            ScoringMode::Lexical => "lexical",
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ScoringStrategy: Send + Sync {
    fn mode(&self) -> ScoringMode;

    /// Identifies the stored payload format; entries persisted under another
    /// fingerprint are not comparable with this strategy.
    fn fingerprint(&self) -> String {
        self.mode().to_string()
    }

    /// Per-document payload stored alongside each entry.
    fn encode(&self, documents: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Score every entry against `query`, in entry order.
    ///
    /// `None` means the entry must not appear in results at all.
    fn score(&self, query: &str, entries: &[IndexedEntry])
    -> Result<Vec<Option<f64>>, EmbedderError>;
}

pub struct VectorScorer {
    embedder: Arc<dyn Embedder>,
}

impl VectorScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

impl ScoringStrategy for VectorScorer {
    fn mode(&self) -> ScoringMode {
        ScoringMode::Vector
    }

    fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}",
            self.mode(),
            self.embedder.name(),
            self.embedder.dimensions()
        )
    }

    fn encode(&self, documents: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        self.embedder.embed_batch(documents)
    }

    fn score(
        &self,
        query: &str,
        entries: &[IndexedEntry],
    ) -> Result<Vec<Option<f64>>, EmbedderError> {
        let query_vec = self.embedder.embed(query)?;
        Ok(entries
            .iter()
            .map(|entry| {
                let distance = 1.0 - dot(&query_vec, &entry.embedding);
                Some(1.0 / (1.0 + distance))
            })
            .collect())
    }
}

/// Plain token counting, for environments without an embedder.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalScorer;

impl ScoringStrategy for LexicalScorer {
    fn mode(&self) -> ScoringMode {
        ScoringMode::Lexical
    }

    fn encode(&self, documents: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(vec![Vec::new(); documents.len()])
    }

    fn score(
        &self,
        query: &str,
        entries: &[IndexedEntry],
    ) -> Result<Vec<Option<f64>>, EmbedderError> {
        let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        Ok(entries
            .iter()
            .map(|entry| {
                let haystack = entry.document.to_lowercase();
                let count: usize = tokens.iter().map(|t| haystack.matches(t.as_str()).count()).sum();
                (count > 0).then_some(count as f64)
            })
            .collect())
    }
}
