mod mcp;

use chrono::Utc;
use clap::{Parser, Subcommand};
use docstore_core::{
    ingest_folder, ingest_pdf, ChromaStore, HashedNgramEmbedder, IngestOutcome, IngestionOptions,
    IngestionReport, LopdfExtractor, PdfWatcher, ToolHandlers, WatchEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docstore", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// ChromaDB base URL
    #[arg(long, env = "DOCSTORE_CHROMA_URL", default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Collection holding the PDF chunks
    #[arg(long, env = "DOCSTORE_COLLECTION", default_value = "pdf_docs")]
    collection: String,

    /// Max tokens per chunk
    #[arg(long, default_value = "1000")]
    chunk_tokens: usize,

    /// Tokens shared between consecutive chunks
    #[arg(long, default_value = "50")]
    chunk_overlap: usize,

    /// Chunks per store write
    #[arg(long, default_value = "10")]
    batch_size: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every PDF under a folder.
    Ingest {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
    },
    /// Ingest existing PDFs, then watch the folder for new ones.
    Watch {
        #[arg(long, env = "DOCSTORE_WATCH_FOLDER")]
        folder: PathBuf,
        /// Seconds to wait for a file write to settle.
        #[arg(long, default_value = "1")]
        debounce_secs: u64,
    },
    /// Serve the search tools over MCP stdio transport.
    Serve,
    /// Query the store from the terminal.
    Search {
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "5")]
        n_results: usize,
        /// Restrict matches to one ingested document.
        #[arg(long)]
        document: Option<String>,
    },
    /// List ingested documents.
    Documents,
    /// Chunk count and embedding status for one document.
    Info {
        #[arg(long)]
        document: String,
    },
}

fn print_report(report: &IngestionReport) {
    for ingested in &report.ingested {
        println!(
            "ingested {} ({} chunks)",
            ingested.source, ingested.chunk_count
        );
    }
    for skipped in &report.skipped {
        println!("skipped already ingested {skipped}");
    }
    for failed in &report.failed {
        warn!(path = %failed.path.display(), reason = %failed.reason, "skipped pdf");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let options = IngestionOptions {
        chunk_max_tokens: cli.chunk_tokens,
        chunk_overlap_tokens: cli.chunk_overlap,
        batch_size: cli.batch_size,
    };

    let store = Arc::new(ChromaStore::connect(&cli.chroma_url, &cli.collection).await?);
    let embedder = Arc::new(HashedNgramEmbedder::default());
    let extractor = LopdfExtractor;

    info!(
        version = app_version,
        collection = %store.collection_name(),
        started_at = %Utc::now().to_rfc3339(),
        "docstore boot"
    );

    match cli.command {
        Command::Ingest { folder } => {
            let report = ingest_folder(
                store.as_ref(),
                embedder.as_ref(),
                &extractor,
                &folder,
                &options,
            )
            .await;

            print_report(&report);
            println!(
                "{} ingested, {} skipped, {} failed",
                report.ingested.len(),
                report.skipped.len(),
                report.failed.len()
            );
        }
        Command::Watch {
            folder,
            debounce_secs,
        } => {
            std::fs::create_dir_all(&folder)?;

            let report = ingest_folder(
                store.as_ref(),
                embedder.as_ref(),
                &extractor,
                &folder,
                &options,
            )
            .await;
            print_report(&report);

            let watcher = PdfWatcher::new(&folder, Duration::from_secs(debounce_secs.max(1)))?;
            info!(folder = %folder.display(), "watching for pdfs");

            loop {
                let Some(events) = tokio::task::block_in_place(|| watcher.next_events()) else {
                    break;
                };

                for event in events {
                    match event {
                        WatchEvent::PdfDetected { path } => {
                            match ingest_pdf(
                                store.as_ref(),
                                embedder.as_ref(),
                                &extractor,
                                &path,
                                &options,
                            )
                            .await
                            {
                                Ok(IngestOutcome::Ingested {
                                    source,
                                    chunk_count,
                                }) => {
                                    println!("ingested {source} ({chunk_count} chunks)");
                                }
                                Ok(IngestOutcome::Skipped { source }) => {
                                    println!("skipped already ingested {source}");
                                }
                                Err(ingest_error) => {
                                    error!(
                                        path = %path.display(),
                                        error = %ingest_error,
                                        "ingestion failed"
                                    );
                                }
                            }
                        }
                        WatchEvent::Error(message) => {
                            error!(error = %message, "watch error");
                        }
                    }
                }
            }
        }
        Command::Serve => {
            let tools = Arc::new(ToolHandlers::new(store, embedder));
            mcp::serve_stdio(tools).await?;
        }
        Command::Search {
            query,
            n_results,
            document,
        } => {
            let tools = ToolHandlers::new(store, embedder);
            let payload = tools.search(&query, n_results, document.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Documents => {
            let tools = ToolHandlers::new(store, embedder);
            let payload = tools.list_documents().await;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Info { document } => {
            let tools = ToolHandlers::new(store, embedder);
            let payload = tools.get_document_info(&document).await;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}
