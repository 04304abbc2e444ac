use crate::error::ProviderError;
use crate::providers::EmbeddingProvider;
use async_trait::async_trait;

/// Deterministic local embedding model: character trigrams hashed into a
/// fixed number of buckets, L2-normalised. Stands in for the
/// sentence-transformer checkpoints of the same dimensionality, needs no
/// network or weights, and is always available as the last fallback.
#[derive(Debug, Clone)]
pub struct HashedNgramEmbedder {
    model_id: String,
    dimensions: usize,
}

impl HashedNgramEmbedder {
    pub fn new(model_id: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashedNgramEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_sync(text))
    }
}

pub fn builtin_local_models() -> Vec<HashedNgramEmbedder> {
    vec![
        HashedNgramEmbedder::new("sentence-transformers/all-MiniLM-L6-v2", 384),
        HashedNgramEmbedder::new("BAAI/bge-base-en-v1.5", 768),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_is_deterministic() {
        let embedder = HashedNgramEmbedder::new("local-test", 128);
        let first = embedder.embed_sync("Hydraulic pressure and flow");
        let second = embedder.embed_sync("Hydraulic pressure and flow");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = HashedNgramEmbedder::new("local-test", 32);
        assert_eq!(embedder.embed_sync("abc").len(), 32);
    }

    #[test]
    fn vectors_are_unit_length() {
        let embedder = HashedNgramEmbedder::new("local-test", 64);
        let vector = embedder.embed_sync("the quick brown fox jumps over the lazy dog");
        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_the_zero_vector() {
        let embedder = HashedNgramEmbedder::new("local-test", 16);
        assert!(embedder.embed_sync("").iter().all(|value| *value == 0.0));
    }
}
