//! Exact k-nearest-neighbor search over a flat, row-major vector buffer.

use std::cmp::Ordering;

use crate::error::{RagError, Result};

/// One search result: insertion offset of the stored vector plus its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Insertion-order offset; joins back to the parallel chunk list.
    pub position: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Brute-force L2 index. Every stored vector shares `dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Builds an index from vectors in insertion order.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dim = vectors.first().map(Vec::len).ok_or(RagError::EmptyInput)?;
        if dim == 0 {
            return Err(RagError::InvalidArgument(
                "embedding vectors must have at least one dimension".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(dim * vectors.len());
        for vector in vectors {
            check_dim(dim, vector.len())?;
            data.extend(vector);
        }
        Ok(Self { dim, data })
    }

    /// Rebuilds an index from a persisted row-major buffer.
    pub fn from_raw(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 || data.is_empty() || data.len() % dim != 0 {
            return Err(RagError::CorruptIndex(format!(
                "{} floats cannot be split into vectors of dimension {}",
                data.len(),
                dim
            )));
        }
        Ok(Self { dim, data })
    }

    /// Dimension shared by every stored vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// Always false for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major backing buffer.
    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    /// Stored vector at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dim).nth(position)
    }

    /// Returns the `min(k, len)` nearest vectors ordered by ascending distance.
    ///
    /// Equal distances are ordered by ascending insertion position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be > 0".to_string()));
        }
        check_dim(self.dim, query.len())?;

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, stored)| SearchHit {
                position,
                distance: squared_l2(query, stored),
            })
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, compare_hits);
            hits.truncate(k);
        }
        hits.sort_unstable_by(compare_hits);
        Ok(hits)
    }
}

fn check_dim(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RagError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.position.cmp(&b.position))
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}
