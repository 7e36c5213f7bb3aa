use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_diff_core::{
    load_document, normalize_whitespace, split_into_chunks, ChangeDetector,
    CharacterNgramEmbedder, ComparisonReport, DiffOptions, Document, Embedder,
    EmbeddingEndpointConfig, HttpEmbedder, DEFAULT_EMBEDDING_MODEL,
};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-diff", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Paragraphs with this many characters or fewer are ignored.
    #[arg(long, env = "PDF_DIFF_MIN_CHUNK_CHARS", default_value = "30")]
    min_chunk_chars: usize,

    /// A paragraph is reported when its best match scores below this value (0 to 1).
    #[arg(long, env = "PDF_DIFF_THRESHOLD", default_value = "0.85")]
    threshold: f64,

    /// Upper bound for one embedding batch, in seconds.
    #[arg(long, env = "PDF_DIFF_EMBED_TIMEOUT_SECS", default_value = "120")]
    embed_timeout_secs: u64,

    /// OpenAI-compatible embeddings URL. Falls back to offline trigram vectors when unset.
    #[arg(long, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    /// Bearer token for the embeddings endpoint.
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Model name sent to the embeddings endpoint.
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// List paragraphs of the new revision with no close counterpart in the old one.
    Compare {
        /// Previous revision (.pdf or plain text).
        #[arg(long)]
        old: String,
        /// Current revision (.pdf or plain text).
        #[arg(long)]
        new: String,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the paragraphs a document splits into.
    Chunks {
        /// Document to split (.pdf or plain text).
        #[arg(long)]
        path: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-diff boot"
    );

    let options = DiffOptions {
        min_chunk_chars: cli.min_chunk_chars,
        similarity_threshold: cli.threshold,
        embed_timeout_secs: cli.embed_timeout_secs,
    };
    options.validate()?;

    match cli.command {
        Command::Chunks { path } => {
            let document = load_document(Path::new(&path))?;
            print_chunks(&document, options.min_chunk_chars);
        }
        Command::Compare { old, new, format } => {
            let old = load_document(Path::new(&old))?;
            let new = load_document(Path::new(&new))?;

            let report = match cli.embedding_endpoint {
                Some(endpoint) => {
                    let config = EmbeddingEndpointConfig {
                        endpoint,
                        api_key: cli.embedding_api_key,
                        model: cli.embedding_model,
                        request_timeout: Duration::from_secs(options.embed_timeout_secs),
                    };
                    let embedder =
                        tokio::task::spawn_blocking(move || HttpEmbedder::connect(config))
                            .await??;
                    info!(
                        model = embedder.model(),
                        dimensions = embedder.dimensions(),
                        "using embedding endpoint"
                    );
                    compare(embedder, &old, &new, &options).await?
                }
                None => {
                    warn!(
                        "EMBEDDING_ENDPOINT not set; offline trigram vectors track spelling, \
                         so small edits such as a changed number may score above the threshold"
                    );
                    compare(CharacterNgramEmbedder::default(), &old, &new, &options).await?
                }
            };

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print_report(&report, &old, &new),
            }
        }
    }

    Ok(())
}

async fn compare<E>(
    embedder: E,
    old: &Document,
    new: &Document,
    options: &DiffOptions,
) -> anyhow::Result<ComparisonReport>
where
    E: Embedder + Send + Sync + 'static,
{
    let detector = ChangeDetector::new(embedder);
    let report = detector.compare_documents(old, new, options).await?;
    info!(
        old_chunks = report.old_chunk_count,
        new_chunks = report.new_chunk_count,
        changes = report.changes.len(),
        "comparison complete"
    );
    Ok(report)
}

fn describe(document: &Document) -> String {
    let short_id = &document.document_id[..document.document_id.len().min(12)];
    match &document.source_path {
        Some(path) => format!("{path} ({short_id})"),
        None => short_id.to_string(),
    }
}

fn print_report(report: &ComparisonReport, old: &Document, new: &Document) {
    println!("old: {} chunks={}", describe(old), report.old_chunk_count);
    println!("new: {} chunks={}", describe(new), report.new_chunk_count);
    println!(
        "changes: {} (threshold {:.2})",
        report.changes.len(),
        report.similarity_threshold
    );

    for change in &report.changes {
        let nearest = change
            .nearest_old_position
            .map(|position| format!("#{position}"))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "[#{}] similarity={:.4} nearest_old={}",
            change.position, change.similarity, nearest
        );
        println!("  {}", normalize_whitespace(&change.text));
    }
}

fn print_chunks(document: &Document, min_chunk_chars: usize) {
    let chunks = split_into_chunks(&document.document_id, &document.text(), min_chunk_chars);
    println!("{}: {} chunks", describe(document), chunks.len());
    for chunk in chunks {
        println!(
            "[#{}] bytes={}..{} {}",
            chunk.position,
            chunk.start,
            chunk.end,
            normalize_whitespace(&chunk.text)
        );
    }
}
