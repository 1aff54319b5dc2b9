//! Orchestrator wiring ingestion, loading, retrieval, and generation together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::chat::{ChatClient, ChatMessage};
use crate::chunks::{Answer, RetrievedChunk};
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::ingest::{self, IngestOptions};
use crate::prompt::{build_prompt, format_citations};
use crate::retriever;
use crate::storage;
use crate::store::{IndexSnapshot, IndexStore};

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieval-augmented question answering over one persisted index.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatClient>,
    chat_model: String,
    store: Arc<IndexStore>,
    index_dir: PathBuf,
    /// Held by `load` and `ingest` so disk reads and publishes never interleave.
    reload_lock: Mutex<()>,
}

impl RagEngine {
    /// Creates an engine that persists under `index_dir` and publishes into `store`.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatClient>,
        chat_model: impl Into<String>,
        store: Arc<IndexStore>,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            chat,
            chat_model: chat_model.into(),
            store,
            index_dir: index_dir.into(),
            reload_lock: Mutex::new(()),
        }
    }

    /// Shared index store.
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Directory holding the persisted artifacts.
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Loads the persisted index and publishes it.
    ///
    /// Waits for any running ingest, so the published snapshot always matches
    /// what is on disk when this returns.
    pub fn load(&self) -> Result<Arc<IndexSnapshot>> {
        let _guard = self.reload_lock.lock();
        self.store.begin_loading();
        let loaded = storage::load(&self.index_dir)
            .and_then(|(index, chunks)| IndexSnapshot::new(index, chunks));
        match loaded {
            Ok(snapshot) => Ok(self.store.publish(snapshot)),
            Err(err) => {
                self.store.fail_loading();
                Err(err)
            }
        }
    }

    /// Rebuilds the index from `source`, persists it, then swaps it in.
    ///
    /// Queries keep running against the previous snapshot until the swap.
    /// Concurrent ingests and loads are serialized.
    pub fn ingest(&self, source: &Path, options: &IngestOptions) -> Result<Arc<IndexSnapshot>> {
        let _guard = self.reload_lock.lock();
        let snapshot =
            ingest::ingest_directory(self.embedder.as_ref(), source, &self.index_dir, options)?;
        tracing::info!(
            chunks = snapshot.len(),
            dim = snapshot.dim(),
            "ingest complete; publishing new index"
        );
        Ok(self.store.publish(snapshot))
    }

    /// Retrieves the `k` chunks nearest to `query`.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let snapshot = self.store.snapshot().ok_or(RagError::IndexNotLoaded)?;
        retriever::retrieve(self.embedder.as_ref(), &snapshot, query, k)
    }

    /// Answers `question` from the `k` nearest chunks and cites them.
    pub fn answer(&self, question: &str, k: usize) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }
        let retrieved = self.retrieve(question, k)?;
        let prompt = build_prompt(&retrieved, question);
        let messages = [ChatMessage::user(prompt)];
        let answer = self
            .chat
            .complete(&self.chat_model, &messages)
            .map_err(RagError::generation)?;
        tracing::debug!(citations = retrieved.len(), "answered question");
        Ok(Answer {
            answer,
            citations: format_citations(&retrieved),
        })
    }
}
