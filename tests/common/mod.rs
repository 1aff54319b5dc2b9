#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use mdrag::{ChatClient, ChatMessage, Embedder, IndexStore, RagEngine};
use parking_lot::Mutex;

pub const FAKE_DIM: usize = 8;
pub const FAKE_ANSWER: &str = "The documents say hello.";

/// Byte-histogram embedder: identical texts map to identical vectors.
#[derive(Default)]
pub struct FakeEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("embedding backend offline");
        }
        let mut vector = vec![0.0f32; FAKE_DIM];
        for byte in text.bytes() {
            vector[byte as usize % FAKE_DIM] += 1.0;
        }
        Ok(vector)
    }
}

/// Chat client that records prompts and returns a canned answer.
#[derive(Default)]
pub struct FakeChat {
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeChat {
    pub fn failing() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl ChatClient for FakeChat {
    fn complete(&self, _model: &str, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let prompt = messages
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().push(prompt);
        if self.fail {
            bail!("chat backend offline");
        }
        Ok(FAKE_ANSWER.to_string())
    }
}

pub struct Fixture {
    pub engine: Arc<RagEngine>,
    pub embedder: Arc<FakeEmbedder>,
    pub chat: Arc<FakeChat>,
}

pub fn engine_with(embedder: FakeEmbedder, chat: FakeChat, index_dir: &Path) -> Fixture {
    let embedder = Arc::new(embedder);
    let chat = Arc::new(chat);
    let engine = Arc::new(RagEngine::new(
        embedder.clone(),
        chat.clone(),
        "fake-model",
        Arc::new(IndexStore::new()),
        index_dir,
    ));
    Fixture {
        engine,
        embedder,
        chat,
    }
}

pub fn engine(index_dir: &Path) -> Fixture {
    engine_with(FakeEmbedder::default(), FakeChat::default(), index_dir)
}

/// Writes the two-document corpus used across the pipeline tests.
pub fn write_corpus(dir: &Path) {
    fs::write(dir.join("a.md"), "Hello world. ".repeat(200)).unwrap();
    fs::write(dir.join("b.md"), "Short doc").unwrap();
}
