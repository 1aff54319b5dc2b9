//! Shared chunk records passed between ingestion, retrieval, and presentation.

use serde::{Deserialize, Serialize};

/// Number of characters kept in a citation preview.
pub const PREVIEW_CHARS: usize = 240;

/// Atomic retrieval unit cut from a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier, `"{doc_id}_{sequence}"`.
    pub id: String,
    /// Source document identifier (file stem).
    pub doc_id: String,
    /// Source document title (file name).
    pub title: String,
    /// Raw chunk text.
    pub text: String,
}

impl Chunk {
    /// Builds the chunk at position `sequence` within document `doc_id`.
    pub fn new(doc_id: &str, title: &str, sequence: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("{doc_id}_{sequence}"),
            doc_id: doc_id.to_string(),
            title: title.to_string(),
            text: text.into(),
        }
    }
}

/// A chunk returned by nearest-neighbor retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    /// Matched chunk.
    pub chunk: Chunk,
    /// Squared Euclidean distance to the query vector; smaller is closer.
    pub distance: f32,
}

/// Presentation record describing one supporting chunk of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Source document identifier.
    pub doc_id: String,
    /// Source document title.
    pub title: String,
    /// Distance reported by retrieval.
    pub distance: f32,
    /// First [`PREVIEW_CHARS`] characters of the chunk text.
    pub preview: String,
}

impl From<&RetrievedChunk> for Citation {
    fn from(retrieved: &RetrievedChunk) -> Self {
        let chunk = &retrieved.chunk;
        Self {
            chunk_id: chunk.id.clone(),
            doc_id: chunk.doc_id.clone(),
            title: chunk.title.clone(),
            distance: retrieved.distance,
            preview: chunk.text.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Generated answer plus the citations it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Model output, verbatim.
    pub answer: String,
    /// Retrieved chunks in ascending-distance order.
    pub citations: Vec<Citation>,
}
