use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use reqwest::{Client, Url};
use std::time::Duration;

/// Embedding client backed by a local Ollama runtime.
///
/// Tokenization, the forward pass and pooling all happen inside Ollama; this adapter only
/// forwards the text and unwraps the single returned vector.
pub struct OllamaEmbeddingClient {
    ollama: Ollama,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Construct a client for `model` served at `base_url` (e.g. `http://127.0.0.1:11434`).
    ///
    /// Every embedding call is bounded by `timeout`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, EmbeddingClientError> {
        let (host, port) = split_host_port(base_url)?;
        let http = Client::builder()
            .user_agent("docqa/embed")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            ollama: Ollama::new_with_client(host, port, http),
            model: model.to_string(),
        })
    }
}

/// Split a base URL into the `scheme://host` and port pair `ollama-rs` expects.
pub(crate) fn split_host_port(base_url: &str) -> Result<(String, u16), EmbeddingClientError> {
    let url = Url::parse(base_url.trim())
        .map_err(|error| EmbeddingClientError::Request(format!("invalid Ollama URL: {error}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| EmbeddingClientError::Request("Ollama URL has no host".into()))?;
    let port = url.port_or_known_default().unwrap_or(11434);
    Ok((format!("{}://{}", url.scheme(), host), port))
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if text.trim().is_empty() {
            return Err(EmbeddingClientError::EmptyInput);
        }

        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let response = self
            .ollama
            .generate_embeddings(request)
            .await
            .map_err(|error| EmbeddingClientError::Request(error.to_string()))?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|values| !values.is_empty())
            .ok_or_else(|| EmbeddingClientError::InvalidResponse("Ollama returned no vectors".into()))
    }
}
