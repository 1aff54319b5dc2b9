//! Query embedding plus nearest-neighbor lookup against a loaded snapshot.

use crate::chunks::{Chunk, RetrievedChunk};
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::store::IndexSnapshot;
use crate::vector_index::SearchHit;

/// Embeds `query` and returns up to `k` chunks in ascending-distance order.
pub fn retrieve(
    embedder: &dyn Embedder,
    snapshot: &IndexSnapshot,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    if k == 0 {
        return Err(RagError::InvalidArgument("k must be > 0".to_string()));
    }
    let vector = embedder.embed(query).map_err(RagError::embedding)?;
    let hits = snapshot.index().search(&vector, k)?;
    Ok(join_hits(snapshot.chunks(), &hits))
}

/// Maps search hits back to chunks, skipping positions outside `chunks`.
pub fn join_hits(chunks: &[Chunk], hits: &[SearchHit]) -> Vec<RetrievedChunk> {
    hits.iter()
        .filter_map(|hit| match chunks.get(hit.position) {
            Some(chunk) => Some(RetrievedChunk {
                chunk: chunk.clone(),
                distance: hit.distance,
            }),
            None => {
                tracing::warn!(
                    position = hit.position,
                    chunks = chunks.len(),
                    "search hit has no matching chunk; skipping"
                );
                None
            }
        })
        .collect()
}
