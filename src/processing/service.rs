//! Processing service coordinating document loading, indexing and question answering.

use crate::{
    config::Config,
    document::{DocumentSource, HttpDocumentSource, decode_bytes},
    embedding::{EmbeddingClient, get_embedding_client},
    generation::{AnswerGenerator, SENTINEL_ANSWER, get_generation_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::chunk_text,
        context::assemble,
        index_store::IndexStore,
        normalize::normalize,
        ranking::rank,
        summary::{is_summary_request, merge_summaries},
        types::{
            DocumentIndex, IndexReport, IndexedChunk, PipelineError, PipelineSettings,
            PipelineStage, ServiceInitError, SettingsError, SettingsOverrides, StageTracker,
        },
    },
    upstream::RetryPolicy,
};
use async_trait::async_trait;
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::Instrument;
use uuid::Uuid;

/// Runs the whole question-answering pipeline: fetch, chunk, embed, rank, generate, normalize.
///
/// The service owns long-lived handles to the embedding and generation providers, the document
/// fetcher, the metrics registry and the shared pre-built index, so the HTTP surface and the
/// CLI reuse the same components. Construct it once near process start and share it through an
/// `Arc`.
pub struct ProcessingService {
    embedding_client: Arc<dyn EmbeddingClient>,
    generator: AnswerGenerator,
    documents: Arc<dyn DocumentSource>,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
    index_store: IndexStore,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Fetch `document_ref`, index it and answer every question against it.
    async fn answer_questions(
        &self,
        document_ref: &str,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError>;

    /// Build an index for `document_ref` and make it the shared index.
    async fn index_document(&self, document_ref: &str) -> Result<IndexReport, PipelineError>;

    /// Answer questions against the shared index.
    async fn answer_from_index(&self, questions: &[String]) -> Result<Vec<String>, PipelineError>;

    /// Answer a single `query` about an uploaded file.
    async fn analyze_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        query: &str,
    ) -> Result<String, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build the service from configuration, using HTTP(S) for document downloads.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!("Initializing embedding client");
        let embedding_client: Arc<dyn EmbeddingClient> = Arc::from(get_embedding_client(config)?);
        tracing::info!("Initializing generation client");
        let generation_client = Arc::from(get_generation_client(config)?);
        let documents = HttpDocumentSource::new(
            config.document_timeout(),
            RetryPolicy::new(config.upstream_max_retries),
        )?;

        let service = Self::with_components(
            embedding_client,
            AnswerGenerator::new(generation_client),
            Arc::new(documents),
            config.pipeline_settings(),
        )?;
        tracing::debug!(settings = ?service.settings, "Processing service ready");
        Ok(service)
    }

    /// Assemble the service from explicit components; `settings` are validated here.
    pub fn with_components(
        embedding_client: Arc<dyn EmbeddingClient>,
        generator: AnswerGenerator,
        documents: Arc<dyn DocumentSource>,
        settings: PipelineSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            embedding_client,
            generator,
            documents,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
            index_store: IndexStore::new(),
        })
    }

    /// Replace the document fetcher, e.g. to allow local paths from the command line.
    pub fn with_document_source(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = documents;
        self
    }

    /// Default tunables applied when a request carries no overrides.
    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Chunk `text` and embed every chunk concurrently.
    ///
    /// Chunks whose embedding fails are dropped and counted; the remaining chunks keep their
    /// original order. An index without chunks is valid.
    pub async fn build_index(
        &self,
        source: &str,
        text: &str,
        settings: &PipelineSettings,
    ) -> Result<DocumentIndex, PipelineError> {
        let chunks = chunk_text(text, settings.chunk_size, settings.chunk_overlap)?;
        let total = chunks.len();
        tracing::debug!(
            source,
            chunks = total,
            chunk_size = settings.chunk_size,
            overlap = settings.chunk_overlap,
            "Document chunked"
        );

        let embedded = join_all(
            chunks
                .into_iter()
                .enumerate()
                .map(|(position, text)| self.embed_chunk(position, text)),
        )
        .await;
        let indexed: Vec<IndexedChunk> = embedded.into_iter().flatten().collect();
        let dropped = total - indexed.len();

        self.metrics
            .record_index(indexed.len() as u64, dropped as u64);
        if indexed.is_empty() {
            tracing::warn!(source, chunks = total, "Index is empty; answers will rely on the sentinel");
        }
        tracing::info!(
            source,
            chunks_indexed = indexed.len(),
            chunks_dropped = dropped,
            "Document indexed"
        );

        Ok(DocumentIndex::new(
            source,
            fingerprint(text),
            current_timestamp_rfc3339(),
            indexed,
            dropped,
        ))
    }

    async fn embed_chunk(&self, position: usize, text: String) -> Option<IndexedChunk> {
        match self.embedding_client.embed(&text).await {
            Ok(embedding) => Some(IndexedChunk {
                position,
                text,
                embedding,
            }),
            Err(error) => {
                tracing::warn!(position, error = %error, "Chunk embedding failed; dropping chunk");
                None
            }
        }
    }

    /// Answer every question against `index` concurrently; answers keep the question order.
    ///
    /// Never fails: an upstream failure for one question yields the sentinel answer for that
    /// question only.
    pub async fn answer_with_index(
        &self,
        index: &DocumentIndex,
        questions: &[String],
        settings: &PipelineSettings,
    ) -> Vec<String> {
        join_all(
            questions
                .iter()
                .map(|question| self.answer_one(index, question, settings)),
        )
        .await
    }

    async fn answer_one(
        &self,
        index: &DocumentIndex,
        question: &str,
        settings: &PipelineSettings,
    ) -> String {
        let (answer, degraded) = if is_summary_request(question) {
            self.answer_summary(index, question).await
        } else {
            self.answer_retrieval(index, question, settings).await
        };
        self.metrics.record_answer(degraded);
        answer
    }

    async fn answer_retrieval(
        &self,
        index: &DocumentIndex,
        question: &str,
        settings: &PipelineSettings,
    ) -> (String, bool) {
        let query = match self.embedding_client.embed(question).await {
            Ok(vector) => vector,
            Err(error) => {
                tracing::warn!(error = %error, "Question embedding failed; using sentinel answer");
                return (SENTINEL_ANSWER.to_string(), true);
            }
        };

        let ranked = rank(&query, &index.chunks);
        let context = assemble(&ranked, settings.top_k, settings.max_context_chars);
        tracing::debug!(
            candidates = ranked.len(),
            top_score = ?ranked.first().map(|hit| hit.score),
            context_chars = context.chars().count(),
            "Context assembled"
        );

        match self.generator.generate(question, &context).await {
            Ok(raw) => (normalize(&raw), false),
            Err(error) => {
                tracing::warn!(error = %error, "Answer generation failed; using sentinel answer");
                (SENTINEL_ANSWER.to_string(), true)
            }
        }
    }

    async fn answer_summary(&self, index: &DocumentIndex, request: &str) -> (String, bool) {
        let summary = match index
            .summary
            .get_or_try_init(|| self.summarize_index(index))
            .await
        {
            Ok(summary) => summary,
            Err(()) => return (SENTINEL_ANSWER.to_string(), !index.is_empty()),
        };

        match self.generator.answer_from_summary(request, summary).await {
            Ok(raw) => (normalize(&raw), false),
            Err(error) => {
                tracing::warn!(error = %error, "Summary answer failed; using sentinel answer");
                (SENTINEL_ANSWER.to_string(), true)
            }
        }
    }

    /// Condense every chunk concurrently; `Err` when nothing usable came back so a later
    /// request retries instead of reusing an empty summary.
    async fn summarize_index(&self, index: &DocumentIndex) -> Result<String, ()> {
        let parts = join_all(index.chunks.iter().map(|chunk| async move {
            match self.generator.summarize(&chunk.text).await {
                Ok(summary) => Some(summary),
                Err(error) => {
                    tracing::warn!(position = chunk.position, error = %error, "Chunk summary failed");
                    None
                }
            }
        }))
        .await;

        let summary = merge_summaries(parts.into_iter().flatten(), SENTINEL_ANSWER);
        if summary.is_empty() {
            return Err(());
        }
        tracing::debug!(source = %index.source, chars = summary.len(), "Document summary cached");
        Ok(summary)
    }

    async fn ingest(
        &self,
        document_ref: &str,
        settings: &PipelineSettings,
    ) -> Result<DocumentIndex, PipelineError> {
        let text = self.documents.load(document_ref).await?;
        self.build_index(document_ref, &text, settings).await
    }

    /// Answer `questions` about `document_ref` using the service defaults.
    pub async fn answer_questions(
        &self,
        document_ref: &str,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        self.answer_questions_with(document_ref, questions, SettingsOverrides::default())
            .await
    }

    /// Answer `questions` about `document_ref`, applying per-request `overrides`.
    ///
    /// Input validation and document fetch failures abort the request; everything downstream
    /// degrades per question.
    pub async fn answer_questions_with(
        &self,
        document_ref: &str,
        questions: &[String],
        overrides: SettingsOverrides,
    ) -> Result<Vec<String>, PipelineError> {
        validate_reference(document_ref)?;
        validate_questions(questions)?;
        let settings = overrides.apply(self.settings)?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("answer_questions", %request_id, questions = questions.len());
        async {
            let mut tracker = StageTracker::new();
            tracker.advance(PipelineStage::Ingesting);
            let index = match self.ingest(document_ref, &settings).await {
                Ok(index) => index,
                Err(error) => {
                    tracker.advance(PipelineStage::Failed);
                    tracing::warn!(document = document_ref, error = %error, "Ingestion failed");
                    return Err(error);
                }
            };
            tracker.advance(PipelineStage::Indexed);

            tracker.advance(PipelineStage::Answering);
            let answers = self.answer_with_index(&index, questions, &settings).await;
            tracker.advance(PipelineStage::Done);
            tracing::info!(stage = ?tracker.stage(), answers = answers.len(), "Request completed");
            Ok(answers)
        }
        .instrument(span)
        .await
    }

    /// Build an index for `document_ref` and publish it as the shared index.
    ///
    /// Concurrent calls are serialized. Readers keep the previous index until the new one is
    /// complete; on failure the previous index stays in place.
    pub async fn index_document(&self, document_ref: &str) -> Result<IndexReport, PipelineError> {
        validate_reference(document_ref)?;
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("index_document", %request_id, document = document_ref);
        async {
            let mut tracker = StageTracker::new();
            tracker.advance(PipelineStage::Ingesting);
            match self
                .index_store
                .rebuild(|| self.ingest(document_ref, &self.settings))
                .await
            {
                Ok(index) => {
                    tracker.advance(PipelineStage::Indexed);
                    Ok(index.report())
                }
                Err(error) => {
                    tracker.advance(PipelineStage::Failed);
                    tracing::warn!(error = %error, "Shared index rebuild failed");
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Answer `questions` against the shared index built by [`index_document`](Self::index_document).
    pub async fn answer_from_index(
        &self,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        validate_questions(questions)?;
        let index = self.index_store.current().ok_or(PipelineError::NoIndex)?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "answer_from_index",
            %request_id,
            source = %index.source,
            questions = questions.len()
        );
        async {
            let mut tracker = StageTracker::new();
            tracker.advance(PipelineStage::Answering);
            let answers = self
                .answer_with_index(&index, questions, &self.settings)
                .await;
            tracker.advance(PipelineStage::Done);
            tracing::info!(stage = ?tracker.stage(), answers = answers.len(), "Request completed");
            Ok(answers)
        }
        .instrument(span)
        .await
    }

    /// Answer one `query` about an uploaded file.
    ///
    /// The upload is indexed for this request only; the shared index is left untouched.
    /// `content_type` is the declared MIME type of the upload, used alongside byte sniffing to
    /// pick PDF extraction. Undecodable or empty uploads are input errors.
    pub async fn analyze_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        query: &str,
    ) -> Result<String, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::Input("query must not be blank".into()));
        }
        let source = if file_name.trim().is_empty() {
            "upload"
        } else {
            file_name
        };

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze_upload", %request_id, source, bytes = bytes.len());
        async {
            let mut tracker = StageTracker::new();
            tracker.advance(PipelineStage::Ingesting);
            let text = match decode_bytes(bytes, content_type).await {
                Ok(text) => text,
                Err(error) => {
                    tracker.advance(PipelineStage::Failed);
                    tracing::warn!(error = %error, "Upload could not be decoded");
                    return Err(PipelineError::Input(format!("uploaded file {source}: {error}")));
                }
            };
            let index = self.build_index(source, &text, &self.settings).await?;
            tracker.advance(PipelineStage::Indexed);

            tracker.advance(PipelineStage::Answering);
            let insights = self
                .answer_with_index(&index, &[query.to_string()], &self.settings)
                .await
                .into_iter()
                .next()
                .unwrap_or_else(|| SENTINEL_ANSWER.to_string());
            tracker.advance(PipelineStage::Done);
            tracing::info!(stage = ?tracker.stage(), "Analysis completed");
            Ok(insights)
        }
        .instrument(span)
        .await
    }

    /// Report of the shared index, if one has been built.
    pub fn current_index(&self) -> Option<IndexReport> {
        self.index_store.current().map(|index| index.report())
    }

    /// Return the current pipeline metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl ProcessingApi for ProcessingService {
    async fn answer_questions(
        &self,
        document_ref: &str,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        ProcessingService::answer_questions(self, document_ref, questions).await
    }

    async fn index_document(&self, document_ref: &str) -> Result<IndexReport, PipelineError> {
        ProcessingService::index_document(self, document_ref).await
    }

    async fn answer_from_index(&self, questions: &[String]) -> Result<Vec<String>, PipelineError> {
        ProcessingService::answer_from_index(self, questions).await
    }

    async fn analyze_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        query: &str,
    ) -> Result<String, PipelineError> {
        ProcessingService::analyze_upload(self, file_name, bytes, content_type, query).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}

fn validate_reference(document_ref: &str) -> Result<(), PipelineError> {
    if document_ref.trim().is_empty() {
        return Err(PipelineError::Input(
            "document reference must not be blank".into(),
        ));
    }
    Ok(())
}

fn validate_questions(questions: &[String]) -> Result<(), PipelineError> {
    if questions.is_empty() {
        return Err(PipelineError::Input("at least one question is required".into()));
    }
    Ok(())
}

/// SHA-256 of the decoded document text, hex encoded.
fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
