use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;

/// Deterministic offline embedder.
///
/// Each lower-cased word is hashed into a fixed slot and the vector is L2-normalized, so texts
/// sharing vocabulary score high under cosine similarity. Useful for tests and air-gapped runs;
/// it carries no semantics beyond word overlap.
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct an embedder producing vectors of `dimension` floats.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for word in text.split_whitespace() {
            let token: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if token.is_empty() {
                continue;
            }
            let slot = (fnv1a(token.as_bytes()) % self.dimension as u64) as usize;
            embedding[slot] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::Model(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(EmbeddingClientError::EmptyInput);
        }
        Ok(self.encode(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ranking::cosine_similarity;

    #[tokio::test]
    async fn identical_text_produces_identical_vectors() {
        let client = HashingEmbeddingClient::new(64);
        let a = client.embed("Grace period").await.unwrap();
        let b = client.embed("grace   PERIOD").await.unwrap();
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let client = HashingEmbeddingClient::new(256);
        let query = client.embed("What is the grace period?").await.unwrap();
        let related = client
            .embed("The grace period is thirty days.")
            .await
            .unwrap();
        let unrelated = client
            .embed("Claims must be filed within ninety days of the event.")
            .await
            .unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let client = HashingEmbeddingClient::new(8);
        assert!(matches!(
            client.embed(" ").await,
            Err(EmbeddingClientError::EmptyInput)
        ));
    }
}
