/// Offline embedder producing deterministic vectors from a text hash.
///
/// Selected with `embedding.model = "hash"`. It carries no semantics beyond
/// exact-text identity, which is enough for offline runs and tests.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbedderError, l2_normalize};

/// A hash-seeded embedder. Identical texts map to identical unit vectors.
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl HashEmbedder {
    /// Create a new `HashEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

/// SplitMix64 step, used to expand one seed into a full vector.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        // Map the top 24 bits of each draw into [-1, 1)
        let embedding: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                let bits = (splitmix64(&mut state) >> 40) as f32;
                bits / (1u32 << 23) as f32 - 1.0
            })
            .collect();

        Ok(l2_normalize(&embedding))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embed_dimensions() {
        let embedder = HashEmbedder::new(384);
        let result = embedder.embed("hello world").unwrap();
        assert_eq!(result.len(), 384);
    }

    #[test]
    fn test_hash_embed_deterministic() {
        let embedder = HashEmbedder::new(384);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("hello").unwrap();
        assert_eq!(a, b, "same input should produce same output");
    }

    #[test]
    fn test_hash_embed_different_inputs() {
        let embedder = HashEmbedder::new(384);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("world").unwrap();
        assert_ne!(a, b, "different inputs should produce different outputs");
        let dot: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert!(dot < 0.5, "unrelated texts should not be near-parallel, dot={dot}");
    }

    #[test]
    fn test_hash_embed_normalized() {
        let embedder = HashEmbedder::new(384);
        let vec = embedder.embed("test normalization").unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit length, got {norm}");
    }

    #[test]
    fn test_hash_embed_batch() {
        let embedder = HashEmbedder::new(128);
        let results = embedder.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(results.len(), 3);
        for vec in &results {
            assert_eq!(vec.len(), 128);
        }
    }

    #[test]
    fn test_hash_default_dimensions() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.dimensions(), 384);
    }
}
