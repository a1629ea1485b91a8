//! Embedding client abstraction and adapters.
//!
//! One strategy is selected per deployment through `EMBEDDING_PROVIDER`; chunk and question
//! vectors therefore always come from the same vector space.

mod gemini;
mod hashing;
#[cfg(feature = "local-model")]
mod local;
mod ollama;
pub mod pooling;

use crate::config::{Config, EmbeddingProvider};
use crate::upstream::RetryPolicy;
use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiEmbeddingClient;
pub use hashing::HashingEmbeddingClient;
#[cfg(feature = "local-model")]
pub use local::LocalModelClient;
pub use ollama::OllamaEmbeddingClient;

/// Dimension used by the hashing embedder when no model dictates one.
pub const HASHING_DIMENSION: usize = 384;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Input text was empty after trimming.
    #[error("cannot embed empty text")]
    EmptyInput,
    /// Transport failed or timed out before a response arrived.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// Provider answered with a non-success status.
    #[error("embedding provider returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status reported by the provider.
        status: u16,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// Provider response lacked the expected vector field.
    #[error("malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Local model failed to load or run.
    #[error("local embedding model failed: {0}")]
    Model(String),
}

impl From<reqwest::Error> for EmbeddingClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error.to_string())
    }
}

/// Interface implemented by embedding backends.
///
/// Every call is independent and stateless so callers can fan out freely.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce a single embedding vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

#[async_trait]
impl<T: EmbeddingClient + ?Sized> EmbeddingClient for std::sync::Arc<T> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        (**self).embed(text).await
    }
}

/// Build an embedding client suitable for the supplied configuration.
pub fn get_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    let retry = RetryPolicy::new(config.upstream_max_retries);
    let client: Box<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                EmbeddingClientError::Request("GEMINI_API_KEY is not configured".into())
            })?;
            Box::new(GeminiEmbeddingClient::new(
                &config.gemini_api_url,
                api_key,
                &config.embedding_model,
                config.embedding_timeout(),
                retry,
            )?)
        }
        EmbeddingProvider::Ollama => Box::new(OllamaEmbeddingClient::new(
            &config.ollama_url,
            &config.embedding_model,
            config.embedding_timeout(),
        )?),
        EmbeddingProvider::Local => local_client(config)?,
        EmbeddingProvider::Hash => Box::new(HashingEmbeddingClient::new(HASHING_DIMENSION)),
    };
    tracing::info!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        "Embedding client initialized"
    );
    Ok(client)
}

#[cfg(feature = "local-model")]
fn local_client(config: &Config) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    let dir = config
        .local_model_dir
        .as_deref()
        .ok_or_else(|| EmbeddingClientError::Model("LOCAL_MODEL_DIR is not configured".into()))?;
    Ok(Box::new(LocalModelClient::load(dir)?))
}

#[cfg(not(feature = "local-model"))]
fn local_client(_config: &Config) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    Err(EmbeddingClientError::Model(
        "built without the `local-model` feature".into(),
    ))
}
