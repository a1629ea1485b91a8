//! Document acquisition: download and text extraction.
//!
//! The pipeline only needs decoded text; [`DocumentSource`] hides where the bytes come from
//! and how they are decoded. Any failure here is fatal for the request.

use crate::upstream::{RetryPolicy, send_with_retry};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching or decoding a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Document reference was not a usable URL.
    #[error("invalid document reference: {0}")]
    InvalidReference(String),
    /// Download failed or timed out.
    #[error("document unavailable: {0}")]
    Unavailable(String),
    /// Bytes could not be turned into text.
    #[error("document unparsable: {0}")]
    Unparsable(String),
    /// Decoding succeeded but produced no text.
    #[error("document contains no extractable text")]
    Empty,
}

/// Capability to obtain decoded document text from a reference.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Download the raw bytes behind `reference`.
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, DocumentError>;

    /// Decode raw bytes into text.
    async fn decode(&self, bytes: Vec<u8>) -> Result<String, DocumentError> {
        decode_bytes(bytes, None).await
    }

    /// Fetch and decode in one step.
    async fn load(&self, reference: &str) -> Result<String, DocumentError> {
        let bytes = self.fetch(reference).await?;
        let size = bytes.len();
        let text = self.decode(bytes).await?;
        tracing::debug!(reference, bytes = size, chars = text.len(), "Document decoded");
        Ok(text)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF";

/// Decode PDF or UTF-8 bytes into text.
///
/// Bytes are treated as PDF when they start with the `%PDF` magic or when `content_type`
/// declares `application/pdf`. PDF extraction runs on the blocking pool. Text that is empty
/// after trimming is rejected as [`DocumentError::Empty`].
pub async fn decode_bytes(
    bytes: Vec<u8>,
    content_type: Option<&str>,
) -> Result<String, DocumentError> {
    let declared_pdf = content_type.is_some_and(|value| {
        value
            .trim()
            .to_ascii_lowercase()
            .starts_with("application/pdf")
    });

    let text = if declared_pdf || bytes.starts_with(PDF_MAGIC) {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|error| DocumentError::Unparsable(format!("PDF extraction aborted: {error}")))?
            .map_err(|error| DocumentError::Unparsable(format!("PDF extraction failed: {error}")))?
    } else {
        String::from_utf8(bytes)
            .map_err(|error| DocumentError::Unparsable(format!("not valid UTF-8: {error}")))?
    };

    if text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(text)
}

/// Downloads documents over HTTP(S).
pub struct HttpDocumentSource {
    http: Client,
    retry: RetryPolicy,
}

impl HttpDocumentSource {
    /// Construct a source whose downloads time out after `timeout`.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, DocumentError> {
        let http = Client::builder()
            .user_agent("docqa/fetch")
            .timeout(timeout)
            .build()
            .map_err(|error| DocumentError::Unavailable(error.to_string()))?;
        Ok(Self { http, retry })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, DocumentError> {
        let url = reqwest::Url::parse(reference.trim())
            .map_err(|error| DocumentError::InvalidReference(format!("{reference}: {error}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocumentError::InvalidReference(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let response = send_with_retry(self.retry, "document", || self.http.get(url.clone()))
            .await
            .map_err(|error| DocumentError::Unavailable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocumentError::Unavailable(format!(
                "{url} returned {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| DocumentError::Unavailable(error.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Resolves references as either HTTP(S) URLs or local file paths.
///
/// Used by the command-line client so documents on disk can be queried directly.
pub struct LocalOrHttpSource {
    http: HttpDocumentSource,
}

impl LocalOrHttpSource {
    /// Wrap an HTTP source with local-path fallback.
    pub fn new(http: HttpDocumentSource) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DocumentSource for LocalOrHttpSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, DocumentError> {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return self.http.fetch(trimmed).await;
        }
        let path = Path::new(trimmed);
        tokio::fs::read(path)
            .await
            .map_err(|error| DocumentError::Unavailable(format!("{}: {error}", path.display())))
    }
}
