//! Question-answering pipeline: chunking, ranking, context assembly, normalization and the
//! orchestrating service.

pub mod chunking;
pub mod context;
mod index_store;
pub mod normalize;
pub mod ranking;
mod service;
pub mod summary;
pub mod types;

pub use index_store::IndexStore;
pub use service::{ProcessingApi, ProcessingService};
pub use types::{
    ChunkingError, DocumentIndex, IndexReport, IndexedChunk, PipelineError, PipelineSettings,
    PipelineStage, RankedResult, ServiceInitError, SettingsError, SettingsOverrides,
};
