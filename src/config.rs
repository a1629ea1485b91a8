use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::processing::PipelineSettings;

const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-flash";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the DocQA server and CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Embedding backend used for both chunks and questions.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Text-generation backend used to answer questions.
    pub generation_provider: GenerationProvider,
    /// Generation model identifier passed to the provider.
    pub generation_model: String,
    /// API key for the Gemini endpoints; required when either provider is Gemini.
    pub gemini_api_key: Option<String>,
    /// Base URL of the Gemini REST API.
    pub gemini_api_url: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Directory holding `tokenizer.json`, `config.json` and `model.safetensors` for the
    /// in-process model.
    pub local_model_dir: Option<String>,
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words carried over between adjacent chunks.
    pub chunk_overlap: usize,
    /// Number of ranked chunks used as answer context.
    pub retrieval_top_k: usize,
    /// Character budget for the assembled context.
    pub max_context_chars: usize,
    /// Per-call timeout for embedding requests, in seconds.
    pub embedding_timeout_secs: u64,
    /// Per-call timeout for generation requests, in seconds.
    pub generation_timeout_secs: u64,
    /// Timeout for fetching the source document, in seconds.
    pub document_timeout_secs: u64,
    /// Retries allowed on transient upstream failures.
    pub upstream_max_retries: u32,
    /// Optional cap on generated tokens per answer.
    pub generation_max_output_tokens: Option<u32>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hosted Gemini `embedContent` endpoint.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
    /// In-process BERT model (requires the `local-model` feature).
    Local,
    /// Deterministic hashing embedder for offline runs and tests.
    Hash,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Hosted Gemini `generateContent` endpoint.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider = load_env_optional("EMBEDDING_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(EmbeddingProvider::Gemini);
        let generation_provider = load_env_optional("GENERATION_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(GenerationProvider::Gemini);

        let gemini_api_key = load_env_optional("GEMINI_API_KEY");
        let needs_gemini = embedding_provider == EmbeddingProvider::Gemini
            || generation_provider == GenerationProvider::Gemini;
        if needs_gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".into()));
        }

        let defaults = PipelineSettings::default();
        Ok(Self {
            embedding_provider,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            generation_provider,
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            gemini_api_key,
            gemini_api_url: load_env_optional("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            local_model_dir: load_env_optional("LOCAL_MODEL_DIR"),
            chunk_size: parse_or("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            retrieval_top_k: parse_or("RETRIEVAL_TOP_K", defaults.top_k)?,
            max_context_chars: parse_or("MAX_CONTEXT_CHARS", defaults.max_context_chars)?,
            embedding_timeout_secs: parse_or("EMBEDDING_TIMEOUT_SECS", 10)?,
            generation_timeout_secs: parse_or("GENERATION_TIMEOUT_SECS", 30)?,
            document_timeout_secs: parse_or("DOCUMENT_TIMEOUT_SECS", 90)?,
            upstream_max_retries: parse_or("UPSTREAM_MAX_RETRIES", 2)?,
            generation_max_output_tokens: parse_optional("GENERATION_MAX_OUTPUT_TOKENS")?,
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Retrieval tunables derived from this configuration.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.retrieval_top_k,
            max_context_chars: self.max_context_chars,
        }
    }

    /// Timeout applied to each embedding call.
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    /// Timeout applied to each generation call.
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Timeout applied to the document download.
    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.document_timeout_secs)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional(key)?.unwrap_or(default))
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "local" => Ok(Self::Local),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        generation_provider = ?config.generation_provider,
        generation_model = %config.generation_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        top_k = config.retrieval_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!("Gemini".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Gemini));
        assert_eq!(" ollama ".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Ollama));
        assert_eq!("HASH".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Hash));
        assert_eq!("local".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Local));
        assert!("openai".parse::<EmbeddingProvider>().is_err());
        assert_eq!("OLLAMA".parse::<GenerationProvider>(), Ok(GenerationProvider::Ollama));
        assert!("hash".parse::<GenerationProvider>().is_err());
    }

    #[test]
    fn pipeline_settings_mirror_config_fields() {
        let config = Config {
            embedding_provider: EmbeddingProvider::Hash,
            embedding_model: "m".into(),
            generation_provider: GenerationProvider::Ollama,
            generation_model: "g".into(),
            gemini_api_key: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.into(),
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            local_model_dir: None,
            chunk_size: 42,
            chunk_overlap: 7,
            retrieval_top_k: 3,
            max_context_chars: 900,
            embedding_timeout_secs: 10,
            generation_timeout_secs: 30,
            document_timeout_secs: 90,
            upstream_max_retries: 0,
            generation_max_output_tokens: None,
            server_port: None,
        };
        let settings = config.pipeline_settings();
        assert_eq!(settings.chunk_size, 42);
        assert_eq!(settings.chunk_overlap, 7);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.max_context_chars, 900);
        assert_eq!(config.embedding_timeout(), Duration::from_secs(10));
    }
}
