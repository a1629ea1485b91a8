//! Core data types and error definitions for the answering pipeline.

use crate::document::DocumentError;
use crate::embedding::EmbeddingClientError;
use crate::generation::GenerationClientError;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Chunk size of zero words can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for at least one new word per chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested overlap in words.
        overlap: usize,
        /// Requested chunk size in words.
        chunk_size: usize,
    },
}

/// Rejected retrieval tunables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Chunk geometry is unusable.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),
    /// Retrieval width of zero selects nothing.
    #[error("top_k must be greater than zero")]
    InvalidTopK,
    /// Context budget of zero characters.
    #[error("max_context_chars must be greater than zero")]
    InvalidContextBudget,
}

/// Errors surfaced to callers of the pipeline.
///
/// Only request-level failures appear here; per-chunk and per-question upstream failures are
/// absorbed by the orchestrator and turned into dropped chunks or sentinel answers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing input; nothing was processed.
    #[error("invalid input: {0}")]
    Input(String),
    /// Tunables supplied with the request were rejected.
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    /// Document could not be fetched or decoded.
    #[error("document fetch failed: {0}")]
    DocumentFetch(#[source] DocumentError),
    /// Chunker rejected its arguments.
    #[error("failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Questions were asked before any document was indexed.
    #[error("no document has been indexed yet")]
    NoIndex,
}

impl From<DocumentError> for PipelineError {
    /// A reference that is not a usable URL is the caller's fault, not the upstream's.
    fn from(error: DocumentError) -> Self {
        match error {
            DocumentError::InvalidReference(reason) => PipelineError::Input(format!(
                "malformed document reference: {reason}"
            )),
            other => PipelineError::DocumentFetch(other),
        }
    }
}

/// Failures while assembling a [`ProcessingService`](super::ProcessingService) from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Embedding provider could not be constructed.
    #[error("embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Generation provider could not be constructed.
    #[error("generation client: {0}")]
    Generation(#[from] GenerationClientError),
    /// Document fetcher could not be constructed.
    #[error("document source: {0}")]
    Document(#[from] DocumentError),
    /// Configured tunables are invalid.
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
}

/// Tunable retrieval parameters accepted at the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineSettings {
    /// Words per chunk.
    pub chunk_size: usize,
    /// Words repeated at the start of the next chunk.
    pub chunk_overlap: usize,
    /// Number of ranked chunks used as context.
    pub top_k: usize,
    /// Character budget for the assembled context.
    pub max_context_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 5,
            max_context_chars: 30_000,
        }
    }
}

impl PipelineSettings {
    /// Reject geometry that would stall or duplicate chunking, and empty retrieval windows.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize.into());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                chunk_size: self.chunk_size,
            }
            .into());
        }
        if self.top_k == 0 {
            return Err(SettingsError::InvalidTopK);
        }
        if self.max_context_chars == 0 {
            return Err(SettingsError::InvalidContextBudget);
        }
        Ok(())
    }
}

/// Per-request overrides; unset fields fall back to the service defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsOverrides {
    /// Words per chunk.
    pub chunk_size: Option<usize>,
    /// Words of overlap.
    pub chunk_overlap: Option<usize>,
    /// Retrieval width.
    pub top_k: Option<usize>,
    /// Context budget in characters.
    pub max_context_chars: Option<usize>,
}

impl SettingsOverrides {
    /// Merge onto `base` and validate the result.
    pub fn apply(self, base: PipelineSettings) -> Result<PipelineSettings, SettingsError> {
        let merged = PipelineSettings {
            chunk_size: self.chunk_size.unwrap_or(base.chunk_size),
            chunk_overlap: self.chunk_overlap.unwrap_or(base.chunk_overlap),
            top_k: self.top_k.unwrap_or(base.top_k),
            max_context_chars: self.max_context_chars.unwrap_or(base.max_context_chars),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// A chunk whose embedding was produced successfully.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Position of the chunk in chunker output; used to break score ties.
    pub position: usize,
    /// Chunk text.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

/// Immutable, fully built retrieval index for one document.
#[derive(Debug)]
pub struct DocumentIndex {
    /// Reference the document was loaded from.
    pub source: String,
    /// SHA-256 of the decoded document text, hex encoded.
    pub fingerprint: String,
    /// RFC3339 timestamp of when the build finished.
    pub built_at: String,
    /// Chunks that were embedded successfully, in chunker order.
    pub chunks: Vec<IndexedChunk>,
    /// Chunks whose embedding failed and were left out.
    pub dropped: usize,
    pub(crate) summary: OnceCell<String>,
}

impl DocumentIndex {
    /// Assemble an index from already embedded chunks.
    pub fn new(
        source: impl Into<String>,
        fingerprint: impl Into<String>,
        built_at: impl Into<String>,
        chunks: Vec<IndexedChunk>,
        dropped: usize,
    ) -> Self {
        Self {
            source: source.into(),
            fingerprint: fingerprint.into(),
            built_at: built_at.into(),
            chunks,
            dropped,
            summary: OnceCell::new(),
        }
    }

    /// Whether no chunk survived embedding.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Lightweight description of this index for callers.
    pub fn report(&self) -> IndexReport {
        IndexReport {
            source: self.source.clone(),
            fingerprint: self.fingerprint.clone(),
            built_at: self.built_at.clone(),
            chunks_indexed: self.chunks.len(),
            chunks_dropped: self.dropped,
        }
    }
}

/// Summary of a completed index build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Reference the document was loaded from.
    pub source: String,
    /// SHA-256 of the decoded text.
    pub fingerprint: String,
    /// RFC3339 build timestamp.
    pub built_at: String,
    /// Number of chunks available for retrieval.
    pub chunks_indexed: usize,
    /// Number of chunks dropped after embedding failures.
    pub chunks_dropped: usize,
}

/// One scored chunk returned by the ranker.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    /// Chunk text.
    pub chunk_text: String,
    /// Cosine similarity against the query.
    pub score: f32,
}

/// Lifecycle of one pipeline request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Nothing started.
    Idle,
    /// Fetching, chunking and embedding the document.
    Ingesting,
    /// Index built, possibly empty.
    Indexed,
    /// Questions are being answered.
    Answering,
    /// Answers collected.
    Done,
    /// Request-level failure.
    Failed,
}

impl PipelineStage {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Idle, Ingesting)
                | (Idle, Answering)
                | (Ingesting, Indexed)
                | (Ingesting, Failed)
                | (Indexed, Answering)
                | (Answering, Done)
                | (Answering, Failed)
        )
    }
}

/// Tracks and logs the stage of a single request.
#[derive(Debug)]
pub(crate) struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    pub(crate) fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
        }
    }

    pub(crate) fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "illegal pipeline transition {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::debug!(from = ?self.stage, to = ?next, "Pipeline stage");
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert_eq!(PipelineSettings::default().validate(), Ok(()));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let settings = PipelineSettings {
            chunk_size: 10,
            chunk_overlap: 10,
            ..PipelineSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::Chunking(ChunkingError::OverlapTooLarge {
                overlap: 10,
                chunk_size: 10
            }))
        );
    }

    #[test]
    fn zero_values_are_rejected() {
        let base = PipelineSettings::default();
        let zero_top_k = SettingsOverrides {
            top_k: Some(0),
            ..SettingsOverrides::default()
        };
        assert_eq!(zero_top_k.apply(base), Err(SettingsError::InvalidTopK));
        let zero_budget = SettingsOverrides {
            max_context_chars: Some(0),
            ..SettingsOverrides::default()
        };
        assert_eq!(
            zero_budget.apply(base),
            Err(SettingsError::InvalidContextBudget)
        );
    }

    #[test]
    fn overrides_merge_onto_base() {
        let merged = SettingsOverrides {
            chunk_size: Some(10),
            chunk_overlap: Some(2),
            ..SettingsOverrides::default()
        }
        .apply(PipelineSettings::default())
        .unwrap();
        assert_eq!(merged.chunk_size, 10);
        assert_eq!(merged.chunk_overlap, 2);
        assert_eq!(merged.top_k, 5);
    }

    #[test]
    fn stage_transitions_follow_lifecycle() {
        use PipelineStage::*;
        assert!(Idle.can_transition_to(Ingesting));
        assert!(Ingesting.can_transition_to(Indexed));
        assert!(Indexed.can_transition_to(Answering));
        assert!(Answering.can_transition_to(Done));
        assert!(Ingesting.can_transition_to(Failed));
        assert!(!Indexed.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Answering));

        let mut tracker = StageTracker::new();
        tracker.advance(Ingesting);
        tracker.advance(Indexed);
        assert_eq!(tracker.stage(), Indexed);
    }

    #[test]
    fn malformed_references_are_input_errors() {
        let error = PipelineError::from(DocumentError::InvalidReference("not a url".into()));
        assert!(matches!(error, PipelineError::Input(ref message) if message.contains("not a url")));

        let error = PipelineError::from(DocumentError::Unavailable("timed out".into()));
        assert!(matches!(error, PipelineError::DocumentFetch(DocumentError::Unavailable(_))));
    }
}
