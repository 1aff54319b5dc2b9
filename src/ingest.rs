//! Batch ingestion: markdown directory → chunks → embeddings → persisted index.

use std::fs;
use std::path::Path;

use crate::chunker::{chunk_text, validate_params};
use crate::chunks::Chunk;
use crate::embedder::{embed_all, Embedder};
use crate::error::{RagError, Result};
use crate::storage;
use crate::store::IndexSnapshot;
use crate::vector_index::FlatIndex;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_OVERLAP: usize = 200;

const DOCUMENT_EXTENSION: &str = "md";

/// Knobs for one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters.
    pub overlap: usize,
    /// Concurrent embedding workers.
    pub workers: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            workers: 1,
        }
    }
}

/// A markdown file read from the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File stem.
    pub doc_id: String,
    /// File name.
    pub title: String,
    /// Full UTF-8 contents.
    pub text: String,
}

/// Reads every `*.md` file directly inside `dir`, sorted by file name.
pub fn load_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        return Err(RagError::SourceNotFound(dir.to_path_buf()));
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_markdown = path
            .extension()
            .is_some_and(|ext| ext == DOCUMENT_EXTENSION);
        if is_markdown && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path)?;
        let doc_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        documents.push(SourceDocument {
            doc_id,
            title,
            text,
        });
    }
    Ok(documents)
}

/// Chunks every document in order; ids restart at 0 for each document.
pub fn chunk_documents(
    documents: &[SourceDocument],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for document in documents {
        let parts = chunk_text(&document.text, chunk_size, overlap)?;
        tracing::debug!(doc = %document.title, chunks = parts.len(), "chunked document");
        chunks.extend(
            parts
                .into_iter()
                .enumerate()
                .map(|(i, part)| Chunk::new(&document.doc_id, &document.title, i, part)),
        );
    }
    Ok(chunks)
}

/// Builds a snapshot from `source` without touching disk.
///
/// Parameters are validated before anything is read or embedded; any
/// embedding failure aborts the whole build.
pub fn build_snapshot(
    embedder: &dyn Embedder,
    source: &Path,
    options: &IngestOptions,
) -> Result<IndexSnapshot> {
    validate_params(options.chunk_size, options.overlap)?;
    let documents = load_documents(source)?;
    let chunks = chunk_documents(&documents, options.chunk_size, options.overlap)?;
    if chunks.is_empty() {
        return Err(RagError::NoContent(source.to_path_buf()));
    }
    tracing::info!(
        dir = %source.display(),
        documents = documents.len(),
        chunks = chunks.len(),
        "chunked source documents"
    );

    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    let vectors = embed_all(embedder, &texts, options.workers).map_err(RagError::embedding)?;
    if vectors.len() != chunks.len() {
        return Err(RagError::EmbeddingFailed(format!(
            "received {} embeddings for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }
    let index = FlatIndex::build(vectors)?;
    IndexSnapshot::new(index, chunks)
}

/// Builds a snapshot from `source` and persists it under `index_dir`.
///
/// Nothing is written unless the build succeeds, so a failed run leaves the
/// previous artifacts in place.
pub fn ingest_directory(
    embedder: &dyn Embedder,
    source: &Path,
    index_dir: &Path,
    options: &IngestOptions,
) -> Result<IndexSnapshot> {
    let snapshot = build_snapshot(embedder, source, options)?;
    storage::save(index_dir, Some(snapshot.index()), snapshot.chunks())?;
    Ok(snapshot)
}
