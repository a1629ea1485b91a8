#![deny(missing_docs)]

//! Core library for the DocQA document question-answering service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document download and text extraction.
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text-generation clients and grounded answer generation.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Question-answering pipeline.
pub mod processing;
/// Markdown and CSV analysis reports.
pub mod report;
/// Shared retry policy for upstream HTTP calls.
pub mod upstream;
