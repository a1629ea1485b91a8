use super::{EmbeddingClient, EmbeddingClientError};
use crate::upstream::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Hosted embedding client speaking the Gemini `embedContent` API.
pub struct GeminiEmbeddingClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
}

impl GeminiEmbeddingClient {
    /// Construct a client for `model` rooted at `base_url` (e.g. `.../v1beta`).
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("docqa/embed")
            .timeout(timeout)
            .build()?;
        let model = model.trim_start_matches("models/").to_string();
        let endpoint = format!(
            "{}/models/{}:embedContent",
            base_url.trim_end_matches('/'),
            model
        );
        Ok(Self {
            http,
            endpoint,
            model,
            api_key,
            retry,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Option<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if text.trim().is_empty() {
            return Err(EmbeddingClientError::EmptyInput);
        }

        let payload = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });

        let response = send_with_retry(self.retry, "gemini-embed", || {
            self.http
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&payload)
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let body: EmbedContentResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!("failed to decode body: {error}"))
        })?;

        body.embedding
            .and_then(|embedding| embedding.values)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| EmbeddingClientError::InvalidResponse("missing embedding.values".into()))
    }
}
