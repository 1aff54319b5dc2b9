use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mdrag::config::{EmbedderArgs, StorageArgs};
use mdrag::ingest::{ingest_directory, IngestOptions, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

#[derive(Parser, Debug)]
#[command(
    name = "mdrag-ingest",
    about = "Chunk, embed, and index a directory of markdown documents"
)]
struct IngestCli {
    /// Directory containing the *.md documents to index
    #[arg(long, env = "MDRAG_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Characters per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    overlap: usize,

    /// Number of concurrent embedding workers
    #[arg(long, env = "MDRAG_EMBED_WORKERS", default_value_t = 1)]
    workers: usize,

    #[command(flatten)]
    storage: StorageArgs,

    #[command(flatten)]
    embedder: EmbedderArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    mdrag::logging::init_tracing();
    let cli = IngestCli::parse();

    let embedder = cli.embedder.build()?;
    let options = IngestOptions {
        chunk_size: cli.chunk_size,
        overlap: cli.overlap,
        workers: cli.workers.max(1),
    };
    let snapshot = ingest_directory(
        &embedder,
        &cli.data_dir,
        &cli.storage.index_dir,
        &options,
    )?;
    println!(
        "Ingest complete: {} chunks (dim {}) saved to {}",
        snapshot.len(),
        snapshot.dim(),
        cli.storage.index_dir.display()
    );
    Ok(())
}
