use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mdrag::config::{ChatArgs, EmbedderArgs, StorageArgs};
use mdrag::server::{self, AppState};
use mdrag::{ErrorKind, IndexStore, RagEngine, DEFAULT_TOP_K};

#[derive(Parser, Debug)]
#[command(
    name = "mdrag-api",
    about = "HTTP API answering questions from a persisted markdown index"
)]
struct ApiCli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "MDRAG_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    /// Default top-k when the client does not override it.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    default_top_k: usize,

    /// Maximum top-k allowed per request.
    #[arg(long, default_value_t = 20)]
    max_top_k: usize,

    #[command(flatten)]
    storage: StorageArgs,

    #[command(flatten)]
    embedder: EmbedderArgs,

    #[command(flatten)]
    chat: ChatArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    mdrag::logging::init_tracing();
    let cli = ApiCli::parse();

    let embedder = Arc::new(cli.embedder.build()?);
    let chat = cli.chat.build()?;
    let engine = Arc::new(RagEngine::new(
        embedder,
        chat,
        cli.chat.chat_model.clone(),
        Arc::new(IndexStore::new()),
        cli.storage.index_dir.clone(),
    ));

    match engine.load() {
        Ok(snapshot) => tracing::info!(
            chunks = snapshot.len(),
            dim = snapshot.dim(),
            "index ready"
        ),
        Err(err) if err.kind() == ErrorKind::IndexNotFound => tracing::warn!(
            dir = %engine.index_dir().display(),
            "index not loaded; run mdrag-ingest first"
        ),
        Err(err) => tracing::warn!(error = %err, "index failed to load; serving as unavailable"),
    }

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let state = AppState::new(engine, cli.default_top_k, cli.max_top_k);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        server::serve(listener, state).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        ApiCli::command().debug_assert();
    }

    #[test]
    fn parses_with_defaults_and_both_model_flags() {
        let cli = ApiCli::try_parse_from(["mdrag-api"]).unwrap();
        assert_eq!(cli.bind, "127.0.0.1:8000");
        assert_eq!(cli.default_top_k, DEFAULT_TOP_K);
        assert_eq!(cli.embedder.embedding_model, "mistral-embed");
        assert_eq!(cli.chat.chat_model, "mistral-large-latest");

        let cli = ApiCli::try_parse_from([
            "mdrag-api",
            "--embedding-model",
            "embed-x",
            "--chat-model",
            "chat-y",
            "--index-dir",
            "/srv/index",
        ])
        .unwrap();
        assert_eq!(cli.embedder.embedding_model, "embed-x");
        assert_eq!(cli.chat.chat_model, "chat-y");
        assert_eq!(cli.storage.index_dir, std::path::PathBuf::from("/srv/index"));
    }
}
