//! Process-wide holder of the active index snapshot and its lifecycle state.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::chunks::Chunk;
use crate::error::{RagError, Result};
use crate::vector_index::FlatIndex;

/// Immutable pairing of a vector index with its parallel chunk list.
#[derive(Debug)]
pub struct IndexSnapshot {
    index: FlatIndex,
    chunks: Vec<Chunk>,
}

impl IndexSnapshot {
    /// Pairs `index` with `chunks`; their lengths must agree.
    pub fn new(index: FlatIndex, chunks: Vec<Chunk>) -> Result<Self> {
        if index.len() != chunks.len() {
            return Err(RagError::CorruptIndex(format!(
                "index holds {} vectors but {} chunks were supplied",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { index, chunks })
    }

    /// Vector index.
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Chunks ordered by index position.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True when no chunks are indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension.
    pub fn dim(&self) -> usize {
        self.index.dim()
    }
}

/// Lifecycle of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    /// Nothing attempted yet.
    Uninitialized,
    /// A load is in progress.
    Loading,
    /// A snapshot is published and queries may run.
    Ready,
    /// A load was attempted and failed.
    Unavailable,
}

/// Point-in-time view of the store for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// Current lifecycle state.
    pub state: StoreState,
    /// Chunks in the published snapshot, 0 when none.
    pub chunks: usize,
    /// Embedding dimension of the published snapshot.
    pub dimension: Option<usize>,
}

enum Slot {
    Uninitialized,
    Loading,
    Ready(Arc<IndexSnapshot>),
    Unavailable,
}

/// Shared owner of the active snapshot.
///
/// Readers clone the `Arc` and release the lock immediately, so a snapshot
/// stays valid for an in-flight query even if a newer one is published.
pub struct IndexStore {
    slot: RwLock<Slot>,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    /// Creates an uninitialized store.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot::Uninitialized),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StoreState {
        match &*self.slot.read() {
            Slot::Uninitialized => StoreState::Uninitialized,
            Slot::Loading => StoreState::Loading,
            Slot::Ready(_) => StoreState::Ready,
            Slot::Unavailable => StoreState::Unavailable,
        }
    }

    /// The published snapshot, if the store is ready.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        match &*self.slot.read() {
            Slot::Ready(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    /// Health view of the store.
    pub fn status(&self) -> StoreStatus {
        match &*self.slot.read() {
            Slot::Ready(snapshot) => StoreStatus {
                state: StoreState::Ready,
                chunks: snapshot.len(),
                dimension: Some(snapshot.dim()),
            },
            Slot::Loading => StoreStatus::empty(StoreState::Loading),
            Slot::Uninitialized => StoreStatus::empty(StoreState::Uninitialized),
            Slot::Unavailable => StoreStatus::empty(StoreState::Unavailable),
        }
    }

    /// Marks a load as started. A ready store keeps serving its snapshot.
    pub fn begin_loading(&self) {
        let mut slot = self.slot.write();
        if !matches!(*slot, Slot::Ready(_)) {
            *slot = Slot::Loading;
        }
    }

    /// Marks a load as failed. A ready store keeps serving its snapshot.
    pub fn fail_loading(&self) {
        let mut slot = self.slot.write();
        if !matches!(*slot, Slot::Ready(_)) {
            *slot = Slot::Unavailable;
        }
    }

    /// Atomically replaces the active snapshot.
    pub fn publish(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.slot.write() = Slot::Ready(Arc::clone(&snapshot));
        snapshot
    }
}

impl StoreStatus {
    fn empty(state: StoreState) -> Self {
        Self {
            state,
            chunks: 0,
            dimension: None,
        }
    }
}
