//! Text-generation clients and grounded answer generation.
//!
//! Providers implement [`GenerationClient`]; [`AnswerGenerator`] layers the prompt template and
//! the empty-candidate policy on top so the orchestrator never deals with wire formats.

mod gemini;
mod ollama;
pub mod prompt;

use crate::config::{Config, GenerationProvider};
use crate::upstream::RetryPolicy;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use gemini::GeminiGenerationClient;
pub use ollama::OllamaGenerationClient;
pub use prompt::PromptTemplate;

/// Fixed fallback answer used whenever no grounded answer can be produced.
pub const SENTINEL_ANSWER: &str = "Not found in document.";

/// Errors surfaced while calling a text-generation provider.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was misconfigured or unreachable.
    #[error("generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GenerationClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::ProviderUnavailable(error.to_string())
    }
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send one prompt and return the first candidate's text.
    ///
    /// `Ok(None)` means the provider answered successfully but produced no candidate.
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationClientError>;
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationClientError> {
        (**self).generate(prompt).await
    }
}

/// Build the generation client selected by configuration.
pub fn get_generation_client(
    config: &Config,
) -> Result<Box<dyn GenerationClient>, GenerationClientError> {
    let retry = RetryPolicy::new(config.upstream_max_retries);
    let client: Box<dyn GenerationClient> = match config.generation_provider {
        GenerationProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                GenerationClientError::ProviderUnavailable("GEMINI_API_KEY is not configured".into())
            })?;
            Box::new(GeminiGenerationClient::new(
                &config.gemini_api_url,
                api_key,
                &config.generation_model,
                config.generation_max_output_tokens,
                config.generation_timeout(),
                retry,
            )?)
        }
        GenerationProvider::Ollama => Box::new(OllamaGenerationClient::new(
            &config.ollama_url,
            &config.generation_model,
            config.generation_timeout(),
            retry,
        )?),
    };
    tracing::info!(
        provider = ?config.generation_provider,
        model = %config.generation_model,
        "Generation client initialized"
    );
    Ok(client)
}

/// Grounded answer generation: render the prompt, call the provider, pick the first candidate.
pub struct AnswerGenerator {
    client: Arc<dyn GenerationClient>,
    template: PromptTemplate,
}

impl AnswerGenerator {
    /// Wrap `client` with the default grounded prompt template.
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self::with_template(client, PromptTemplate::default())
    }

    /// Wrap `client` with a custom template.
    pub fn with_template(client: Arc<dyn GenerationClient>, template: PromptTemplate) -> Self {
        Self { client, template }
    }

    /// Answer `question` strictly from `context`.
    ///
    /// A response without any candidate is treated as a valid empty result and mapped to
    /// [`SENTINEL_ANSWER`]; transport and status failures are returned as errors.
    pub async fn generate(
        &self,
        question: &str,
        context: &str,
    ) -> Result<String, GenerationClientError> {
        let prompt = self.template.render_answer(question, context);
        self.complete(&prompt).await
    }

    /// Summarize one passage of document text.
    pub async fn summarize(&self, passage: &str) -> Result<String, GenerationClientError> {
        let prompt = self.template.render_summary(passage);
        self.complete(&prompt).await
    }

    /// Answer a summary-style request from an already condensed document summary.
    pub async fn answer_from_summary(
        &self,
        request: &str,
        summary: &str,
    ) -> Result<String, GenerationClientError> {
        let prompt = self.template.render_summary_answer(request, summary);
        self.complete(&prompt).await
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationClientError> {
        match self.client.generate(prompt).await? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => {
                tracing::debug!("Generation returned no candidate; using sentinel answer");
                Ok(SENTINEL_ANSWER.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
    }

    #[async_trait]
    impl GenerationClient for RecordingClient {
        async fn generate(&self, prompt: &str) -> Result<Option<String>, GenerationClientError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn prompt_carries_context_and_question() {
        let client = Arc::new(RecordingClient {
            prompts: Mutex::new(Vec::new()),
            reply: Some("30 days".into()),
        });
        let generator = AnswerGenerator::new(client.clone());

        let answer = generator
            .generate("What is the grace period?", "The grace period is thirty days.")
            .await
            .unwrap();

        assert_eq!(answer, "30 days");
        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("The grace period is thirty days."));
        assert!(prompts[0].contains("Question: What is the grace period?"));
    }

    #[tokio::test]
    async fn missing_candidate_maps_to_sentinel() {
        let client = Arc::new(RecordingClient {
            prompts: Mutex::new(Vec::new()),
            reply: None,
        });
        let generator = AnswerGenerator::new(client);
        let answer = generator.generate("q", "ctx").await.unwrap();
        assert_eq!(answer, SENTINEL_ANSWER);
    }
}
