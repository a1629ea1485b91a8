//! One-shot command-line client: answer questions about a URL or a local file.
//!
//! Shares configuration with the HTTP server (`.env` plus environment variables). Answers are
//! printed to stdout, one per question and in the order given; logs go to stderr.
use anyhow::{Context, Result};
use clap::Parser;
use docqa::{
    config, logging,
    document::{HttpDocumentSource, LocalOrHttpSource},
    processing::{ProcessingService, SettingsOverrides},
    upstream::RetryPolicy,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "docqa-ask",
    about = "Answer questions about a document using retrieval-augmented generation"
)]
struct Cli {
    /// Document URL (http/https) or local file path.
    #[arg(long)]
    document: String,
    /// Question to answer; repeat for several questions.
    #[arg(long = "question", short = 'q', required = true)]
    questions: Vec<String>,
    /// Number of ranked chunks used as context.
    #[arg(long)]
    top_k: Option<usize>,
    /// Words per chunk.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Words shared between adjacent chunks.
    #[arg(long)]
    chunk_overlap: Option<usize>,
    /// Character budget for the assembled context.
    #[arg(long)]
    max_context_chars: Option<usize>,
    /// Print answers as a JSON array instead of numbered lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing("warn");

    let http = HttpDocumentSource::new(
        config.document_timeout(),
        RetryPolicy::new(config.upstream_max_retries),
    )
    .context("failed to build document fetcher")?;
    let service = ProcessingService::from_config(config)
        .context("failed to initialize processing service")?
        .with_document_source(Arc::new(LocalOrHttpSource::new(http)));

    let overrides = SettingsOverrides {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        top_k: cli.top_k,
        max_context_chars: cli.max_context_chars,
    };
    let answers = service
        .answer_questions_with(&cli.document, &cli.questions, overrides)
        .await
        .with_context(|| format!("failed to answer questions about {}", cli.document))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&answers)?);
    } else {
        for (idx, (question, answer)) in cli.questions.iter().zip(&answers).enumerate() {
            println!("{}. {question}\n   {answer}", idx + 1);
        }
    }
    Ok(())
}
