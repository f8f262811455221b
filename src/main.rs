//! # MultiSummarizer CLI (`msum`)
//!
//! Serves the HTTP API, or works on a single local file from the command
//! line: inspect its chunks, run hybrid retrieval, or ask a question.
//!
//! ## Usage
//!
//! ```bash
//! msum [--config ./msum.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `msum serve` | Start the HTTP API |
//! | `msum chunk <file>` | Print the chunks a file is split into |
//! | `msum search <file> "<query>"` | Rank chunks of a file against a query |
//! | `msum ask <file> "<question>"` | Gated answer from a file via the generator |
//!
//! Logs go to stderr; set `RUST_LOG` or pass `--verbose` for more detail.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use multisummarizer::config::{load_config, Config};
use multisummarizer::extract::{extract_text, Transcriber};
use multisummarizer::server::run_server;
use multisummarizer::summarize::Summarizer;
use multisummarizer_core::chunk::chunk_text;

/// MultiSummarizer: ask questions of a document with hybrid retrieval and
/// a confidence-gated local LLM.
#[derive(Parser)]
#[command(name = "msum", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Extract a file and print its chunks.
    Chunk {
        /// PDF, plain-text, or (with transcription configured) media file.
        file: PathBuf,
    },

    /// Index a file and print the chunks ranked for a query.
    Search {
        file: PathBuf,
        query: String,
        /// Number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Index a file and answer a question from it.
    ///
    /// Prints the not-found message without calling the generator when no
    /// chunk clears the confidence threshold.
    Ask {
        file: PathBuf,
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => run_server(&config).await?,
        Commands::Chunk { file } => {
            let text = read_document(&config, &file).await?;
            let chunks = chunk_text(&text, &config.chunking.params())?;
            for chunk in &chunks {
                println!("[{}] {}", chunk.index, chunk.text);
            }
            println!("{} chunks", chunks.len());
        }
        Commands::Search { file, query, top_k } => {
            let summarizer = indexed_summarizer(&config, &file).await?;
            let results = summarizer.search(&query, top_k).await?;
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in results.iter().enumerate() {
                println!(
                    "{}. [chunk {}] score {:.4} (dense {:.4}, sparse {:.4})",
                    rank + 1,
                    hit.index,
                    hit.score,
                    hit.dense_score,
                    hit.sparse_score
                );
                println!("   {}", hit.text);
            }
        }
        Commands::Ask { file, query, top_k } => {
            let summarizer = indexed_summarizer(&config, &file).await?;
            let summary = summarizer.summarize(&query, top_k).await?;
            println!("{}", summary);
        }
    }

    Ok(())
}

async fn read_document(config: &Config, path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let transcriber = Transcriber::from_config(&config.transcription)?;

    extract_text(&bytes, "", filename, transcriber.as_ref())
        .await
        .with_context(|| format!("Failed to extract text from {}", path.display()))
}

async fn indexed_summarizer(config: &Config, path: &Path) -> Result<Summarizer> {
    let text = read_document(config, path).await?;
    let summarizer = Summarizer::from_config(config)?;
    let chunks = summarizer.index_text(&text).await?;
    tracing::info!(file = %path.display(), chunks, "indexed");
    Ok(summarizer)
}
