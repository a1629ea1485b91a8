//! In-process BERT-family encoder (feature `local-model`).
//!
//! Expects a model directory containing `tokenizer.json`, `config.json` and
//! `model.safetensors` (sentence-transformers layout, e.g. `all-MiniLM-L6-v2`). Inference runs
//! on a blocking thread so the async executor stays responsive.

use super::pooling::masked_mean_pool;
use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

const MAX_TOKENS: usize = 256;

struct Encoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Embedding client running a local encoder with mean pooling.
pub struct LocalModelClient {
    encoder: Arc<Encoder>,
}

impl LocalModelClient {
    /// Load tokenizer, config and weights from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EmbeddingClientError> {
        let dir = dir.as_ref();
        let device = Device::Cpu;

        let tokenizer = Tokenizer::from_file(dir.join("tokenizer.json"))
            .map_err(|error| model_error("failed to load tokenizer", error))?;
        let raw_config = std::fs::read_to_string(dir.join("config.json"))
            .map_err(|error| model_error("failed to read config.json", error))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .map_err(|error| model_error("failed to parse config.json", error))?;
        // SAFETY: the weights file is mapped read-only and not modified while the model lives.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                &[dir.join("model.safetensors")],
                DType::F32,
                &device,
            )
        }
        .map_err(|error| model_error("failed to map weights", error))?;
        let model =
            BertModel::load(vb, &config).map_err(|error| model_error("failed to build model", error))?;

        tracing::info!(dir = %dir.display(), "Local embedding model loaded");
        Ok(Self {
            encoder: Arc::new(Encoder {
                model,
                tokenizer,
                device,
            }),
        })
    }
}

impl Encoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|error| model_error("tokenization failed", error))?;
        let mut ids = encoding.get_ids().to_vec();
        let mut mask = encoding.get_attention_mask().to_vec();
        ids.truncate(MAX_TOKENS);
        mask.truncate(MAX_TOKENS);
        let len = ids.len();

        let input_ids = Tensor::new(ids.as_slice(), &self.device)
            .and_then(|t| t.reshape((1, len)))
            .map_err(|error| model_error("failed to build input tensor", error))?;
        let token_type_ids = input_ids
            .zeros_like()
            .map_err(|error| model_error("failed to build token types", error))?;
        let attention = Tensor::new(mask.as_slice(), &self.device)
            .and_then(|t| t.reshape((1, len)))
            .map_err(|error| model_error("failed to build attention mask", error))?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention))
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|error| model_error("forward pass failed", error))?;

        Ok(masked_mean_pool(&hidden, &mask))
    }
}

fn model_error(context: &str, error: impl std::fmt::Display) -> EmbeddingClientError {
    EmbeddingClientError::Model(format!("{context}: {error}"))
}

#[async_trait]
impl EmbeddingClient for LocalModelClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if text.trim().is_empty() {
            return Err(EmbeddingClientError::EmptyInput);
        }
        let encoder = Arc::clone(&self.encoder);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || encoder.embed(&text))
            .await
            .map_err(|error| model_error("inference task panicked", error))?
    }
}
