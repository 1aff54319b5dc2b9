#![warn(missing_docs)]
//! Markdown retrieval-augmented generation: chunk documents, embed them,
//! search them by exact nearest neighbor, and answer grounded questions.

pub mod chat;
pub mod chunker;
pub mod chunks;
pub mod config;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod prompt;
pub mod retriever;
pub mod server;
pub mod storage;
pub mod store;
pub mod vector_index;

pub use chat::{ChatClient, ChatMessage, ChatRole};
pub use chunker::chunk_text;
pub use chunks::{Answer, Chunk, Citation, RetrievedChunk};
pub use embedder::{Embedder, OpenAiEmbedder};
pub use engine::{RagEngine, DEFAULT_TOP_K};
pub use error::{ErrorKind, RagError, Result};
pub use ingest::IngestOptions;
pub use store::{IndexSnapshot, IndexStore, StoreState};
pub use vector_index::{FlatIndex, SearchHit};
