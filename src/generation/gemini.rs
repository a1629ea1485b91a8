use super::{GenerationClient, GenerationClientError};
use crate::upstream::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Hosted generation client speaking the Gemini `generateContent` API.
pub struct GeminiGenerationClient {
    http: Client,
    endpoint: String,
    api_key: String,
    max_output_tokens: Option<u32>,
    retry: RetryPolicy,
}

impl GeminiGenerationClient {
    /// Construct a client for `model` rooted at `base_url` (e.g. `.../v1beta`).
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        max_output_tokens: Option<u32>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationClientError> {
        let http = Client::builder()
            .user_agent("docqa/generate")
            .timeout(timeout)
            .build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model.trim_start_matches("models/")
        );
        Ok(Self {
            http,
            endpoint,
            api_key,
            max_output_tokens,
            retry,
        })
    }

    fn payload(&self, prompt: &str) -> Value {
        let contents = json!([{ "role": "user", "parts": [{ "text": prompt }] }]);
        match self.max_output_tokens {
            Some(tokens) => json!({
                "contents": contents,
                "generationConfig": { "maxOutputTokens": tokens },
            }),
            None => json!({ "contents": contents }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.text)
    }
}

#[async_trait]
impl GenerationClient for GeminiGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationClientError> {
        let payload = self.payload(prompt);
        let response = send_with_retry(self.retry, "gemini-generate", || {
            self.http
                .post(&self.endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&payload)
        })
        .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GenerationClientError::ProviderUnavailable(format!(
                "Gemini endpoint {} returned 404",
                self.endpoint
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Gemini generation failed");
            return Err(GenerationClientError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Gemini response: {error}"
            ))
        })?;

        Ok(body.first_text())
    }
}
