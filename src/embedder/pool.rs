//! Bounded worker pool that embeds many texts concurrently while preserving input order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use super::Embedder;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

struct EmbeddingTask<'a> {
    id: usize,
    inputs: &'a [&'a str],
}

struct EmbeddingBatchResult {
    id: usize,
    vectors: Vec<Vec<f32>>,
}

type EmbeddingResult = Result<EmbeddingBatchResult>;

/// Embeds `texts` across `workers` threads in batches of `embedder.max_batch_size()`.
///
/// The returned vectors line up with `texts` regardless of completion order.
/// The first failing batch aborts the run; batches not yet started are skipped.
pub fn embed_all(embedder: &dyn Embedder, texts: &[&str], workers: usize) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.max(1);
    let batch_size = embedder.max_batch_size().max(1);
    let batches: Vec<&[&str]> = texts.chunks(batch_size).collect();
    let batch_count = batches.len();
    tracing::info!(
        chunks = texts.len(),
        batches = batch_count,
        batch_size,
        workers,
        "embedding chunks"
    );

    let cancelled = AtomicBool::new(false);
    thread::scope(|scope| {
        let (task_tx, task_rx) = bounded::<EmbeddingTask>(workers * 2);
        let (result_tx, result_rx) = bounded::<EmbeddingResult>(workers * 2);

        for worker_id in 0..workers {
            let worker_rx = task_rx.clone();
            let worker_tx = result_tx.clone();
            let cancelled = &cancelled;
            scope.spawn(move || worker_loop(worker_id, worker_rx, worker_tx, embedder, cancelled));
        }
        drop(task_rx);
        drop(result_tx);

        scope.spawn(move || {
            for (id, inputs) in batches.into_iter().enumerate() {
                if task_tx.send(EmbeddingTask { id, inputs }).is_err() {
                    break;
                }
            }
        });

        let collected = collect_in_order(result_rx, batch_count, texts.len());
        if collected.is_err() {
            cancelled.store(true, Ordering::Relaxed);
        }
        collected
    })
}

fn collect_in_order(
    results: Receiver<EmbeddingResult>,
    batch_count: usize,
    total: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut ordered: Vec<Vec<f32>> = Vec::with_capacity(total);
    let mut pending: BTreeMap<usize, Vec<Vec<f32>>> = BTreeMap::new();
    let mut next_id = 0usize;
    while next_id < batch_count {
        let batch = match results.recv_timeout(PROGRESS_INTERVAL) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                tracing::info!(
                    embedded = ordered.len(),
                    total,
                    waiting_on_batch = next_id,
                    "still waiting on embedding workers"
                );
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("embedding worker channel closed unexpectedly")
            }
        };
        pending.insert(batch.id, batch.vectors);
        while let Some(vectors) = pending.remove(&next_id) {
            ordered.extend(vectors);
            next_id += 1;
        }
        tracing::debug!(embedded = ordered.len(), total, "embedding progress");
    }
    Ok(ordered)
}

fn worker_loop(
    worker_id: usize,
    receiver: Receiver<EmbeddingTask<'_>>,
    sender: Sender<EmbeddingResult>,
    embedder: &dyn Embedder,
    cancelled: &AtomicBool,
) {
    for EmbeddingTask { id, inputs } in receiver.iter() {
        if cancelled.load(Ordering::Relaxed) {
            continue;
        }
        tracing::debug!(worker_id, batch = id, chunks = inputs.len(), "embedding batch");
        let result = embed_checked(embedder, inputs)
            .map(|vectors| EmbeddingBatchResult { id, vectors })
            .with_context(|| {
                format!(
                    "worker {} failed batch {} ({} chunks)",
                    worker_id,
                    id,
                    inputs.len()
                )
            });
        if sender.send(result).is_err() {
            break;
        }
    }
}

fn embed_checked(embedder: &dyn Embedder, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
    let vectors = embedder.embed_batch(inputs)?;
    anyhow::ensure!(
        vectors.len() == inputs.len(),
        "embedding count {} mismatched pending {}",
        vectors.len(),
        inputs.len()
    );
    Ok(vectors)
}
