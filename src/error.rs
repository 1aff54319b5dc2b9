//! Error taxonomy shared by every stage of the retrieval pipeline.

use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

/// Failures surfaced by chunking, indexing, persistence, retrieval, and generation.
#[derive(Error, Debug)]
pub enum RagError {
    /// Bad chunking or search parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The document source directory does not exist.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// One or both persisted index artifacts are missing.
    #[error("index not found in {}; run ingest first", .0.display())]
    IndexNotFound(PathBuf),

    /// Ingestion produced zero chunks.
    #[error("no content: no chunks produced from {}", .0.display())]
    NoContent(PathBuf),

    /// An index was built from zero vectors.
    #[error("cannot build an index from zero vectors")]
    EmptyInput,

    /// The question was blank after trimming.
    #[error("question is required")]
    EmptyQuestion,

    /// A vector did not match the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed by the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Persisted state failed an integrity check.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// The embedding collaborator failed.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The chat collaborator failed.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// No index is loaded in memory.
    #[error("index not loaded; run ingest or load first")]
    IndexNotLoaded,

    /// `save` was called without an index or without chunks.
    #[error("no index or chunks to save")]
    NothingToSave,

    /// Filesystem failure while reading documents or artifacts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding an artifact failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Fieldless discriminant of [`RagError`], one variant per error variant.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    SourceNotFound,
    IndexNotFound,
    NoContent,
    EmptyInput,
    EmptyQuestion,
    DimensionMismatch,
    CorruptIndex,
    EmbeddingFailed,
    GenerationFailed,
    IndexNotLoaded,
    NothingToSave,
    Io,
    Serialization,
}

impl RagError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RagError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RagError::SourceNotFound(_) => ErrorKind::SourceNotFound,
            RagError::IndexNotFound(_) => ErrorKind::IndexNotFound,
            RagError::NoContent(_) => ErrorKind::NoContent,
            RagError::EmptyInput => ErrorKind::EmptyInput,
            RagError::EmptyQuestion => ErrorKind::EmptyQuestion,
            RagError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            RagError::CorruptIndex(_) => ErrorKind::CorruptIndex,
            RagError::EmbeddingFailed(_) => ErrorKind::EmbeddingFailed,
            RagError::GenerationFailed(_) => ErrorKind::GenerationFailed,
            RagError::IndexNotLoaded => ErrorKind::IndexNotLoaded,
            RagError::NothingToSave => ErrorKind::NothingToSave,
            RagError::Io(_) => ErrorKind::Io,
            RagError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// HTTP status used when the error crosses the service boundary.
    ///
    /// Caller input problems are 4xx; missing state and failing upstream
    /// collaborators are 503; integrity violations are 500.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidArgument
            | ErrorKind::EmptyQuestion
            | ErrorKind::EmptyInput
            | ErrorKind::NoContent => StatusCode::BAD_REQUEST,
            ErrorKind::IndexNotLoaded
            | ErrorKind::IndexNotFound
            | ErrorKind::EmbeddingFailed
            | ErrorKind::GenerationFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::SourceNotFound
            | ErrorKind::NothingToSave
            | ErrorKind::DimensionMismatch
            | ErrorKind::CorruptIndex
            | ErrorKind::Io
            | ErrorKind::Serialization => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn embedding(err: anyhow::Error) -> Self {
        RagError::EmbeddingFailed(format!("{err:#}"))
    }

    pub(crate) fn generation(err: anyhow::Error) -> Self {
        RagError::GenerationFailed(format!("{err:#}"))
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, RagError>;
