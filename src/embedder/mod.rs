/// Embedder trait and shared types for text embedding.
///
/// Embedders must be deterministic and local: the same text always maps to
/// the same fixed-dimension vector, with no network access.
pub mod hash;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("invalid dimensions: {0} (minimum 128)")]
    InvalidDimensions(usize),
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Short identifier reported alongside search results.
    fn name(&self) -> &'static str;
}

/// Dot product of two equal-length vectors.
///
/// For L2-normalised inputs this is the cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}
