//! Embedding capability and its implementations.

use anyhow::Result;

pub mod openai;
pub mod pool;

pub use openai::OpenAiEmbedder;
pub use pool::embed_all;

/// Maps text to a fixed-dimension vector.
///
/// Implementations must be shareable across the ingest worker pool and the
/// request handlers, hence `Send + Sync`.
pub trait Embedder: Send + Sync {
    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds several texts, returning vectors in input order.
    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        inputs.iter().map(|text| self.embed(text)).collect()
    }

    /// Largest slice accepted by [`Embedder::embed_batch`].
    fn max_batch_size(&self) -> usize {
        1
    }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(inputs)
    }

    fn max_batch_size(&self) -> usize {
        (**self).max_batch_size()
    }
}
