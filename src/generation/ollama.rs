//! Ollama-backed generation client.
//!
//! Issues non-streaming requests directly to the runtime's `/api/generate` endpoint.

use super::{GenerationClient, GenerationClientError};
use crate::upstream::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Generation client for a local Ollama runtime.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OllamaGenerationClient {
    /// Construct a client for `model` served at `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationClientError> {
        let http = Client::builder()
            .user_agent("docqa/generate")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            model: model.to_string(),
            retry,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                // Low temperature keeps answers close to the context.
                "temperature": 0.1,
            }
        });

        let endpoint = self.endpoint();
        let response = send_with_retry(self.retry, "ollama-generate", || {
            self.http.post(&endpoint).json(&payload)
        })
        .await
        .map_err(|error| {
            GenerationClientError::ProviderUnavailable(format!(
                "failed to reach Ollama at {}: {error}",
                self.base_url
            ))
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        let text = body.response.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OllamaGenerationClient {
        OllamaGenerationClient::new(
            &server.base_url(),
            "llama3",
            Duration::from_secs(5),
            RetryPolicy::none(),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{ "model": "llama3", "stream": false }"#);
                then.status(200).json_body(json!({
                    "response": " 30 days ",
                    "done": true
                }));
            })
            .await;

        let answer = client_for(&server).generate("prompt").await.expect("answer");

        mock.assert_async().await;
        assert_eq!(answer.as_deref(), Some("30 days"));
    }

    #[tokio::test]
    async fn ollama_client_maps_blank_response_to_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "response": "  ", "done": true }));
            })
            .await;

        assert!(client_for(&server).generate("p").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client_for(&server)
            .generate("prompt")
            .await
            .expect_err("error response");

        assert!(
            matches!(error, GenerationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn ollama_client_retries_server_errors() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(503).body("loading model");
            })
            .await;
        let retry = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };
        let client =
            OllamaGenerationClient::new(&server.base_url(), "llama3", Duration::from_secs(5), retry)
                .expect("client");

        let error = client.generate("prompt").await.expect_err("still failing");

        mock.assert_hits_async(3).await;
        assert!(
            matches!(error, GenerationClientError::GenerationFailed(ref message) if message.contains("503"))
        );
    }
}
