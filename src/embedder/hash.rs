/// Token-hashing embedder.
///
/// Each whitespace token is lower-cased, hashed with SHA-256, and counted in
/// one of `dimensions` buckets. The histogram is L2-normalised.
use sha2::{Digest, Sha256};

use super::{Embedder, EmbedderError};

/// Smallest bucket count accepted by [`HashEmbedder::new`].
pub const MIN_DIMENSIONS: usize = 128;

/// Default bucket count.
pub const DEFAULT_DIMENSIONS: usize = 256;

/// A deterministic bag-of-tokens embedder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a new `HashEmbedder` with the given number of buckets.
    pub fn new(dimensions: usize) -> Result<Self, EmbedderError> {
        if dimensions < MIN_DIMENSIONS {
            return Err(EmbedderError::InvalidDimensions(dimensions));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let prefix = u16::from_be_bytes([digest[0], digest[1]]);
        usize::from(prefix) % self.dimensions
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            embedding[self.bucket(&token)] += 1.0;
        }

        // L2 normalize; a zero vector stays zero
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "deterministic-hash"
    }
}
