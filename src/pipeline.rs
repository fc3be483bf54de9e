//! Assembly of the index and retriever from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ragchat_core::embedding::Embedder;
use ragchat_core::index::VectorIndex;
use ragchat_core::retriever::Retriever;
use ragchat_core::storage::IndexStorage;
use ragchat_core::summarize::Summarizer;
use tracing::{info, warn};

use crate::completion::ChatCompleter;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::guard::Guarded;
use crate::index_store::DirStorage;
use crate::ingest::load_corpus;
use crate::web_search::TavilySearch;

/// Ingest the corpus and build (and persist) a fresh index.
pub async fn rebuild_index(config: &Config, embedder: Arc<dyn Embedder>) -> Result<VectorIndex> {
    let storage = Arc::new(DirStorage::new(&config.index.persist_dir));
    let corpus = load_corpus(&config.ingest)?;
    let mut index = VectorIndex::new(embedder, storage);
    index
        .build(corpus.chunks)
        .await
        .with_context(|| format!("building index from {}", config.ingest.root.display()))?;
    Ok(index)
}

/// Load the persisted index if present, otherwise build one.
///
/// A lone `index.bin` or `metadata.json` is a load error, not a reason to
/// rebuild. An empty corpus yields an empty index (every query falls back
/// to web search) instead of an error.
pub async fn open_index(config: &Config, embedder: Arc<dyn Embedder>) -> Result<VectorIndex> {
    let storage = Arc::new(DirStorage::new(&config.index.persist_dir));
    if storage.exists() || storage.vectors_path().exists() || storage.metadata_path().exists() {
        let mut index = VectorIndex::new(embedder, storage);
        index
            .load()
            .with_context(|| format!("loading index from {}", config.index.persist_dir.display()))?;
        return Ok(index);
    }

    info!(dir = %config.index.persist_dir.display(), "no persisted index, building");
    let corpus = load_corpus(&config.ingest)?;
    if corpus.chunks.is_empty() {
        warn!(
            root = %config.ingest.root.display(),
            "corpus is empty; every question will use web search"
        );
        return Ok(VectorIndex::new_empty(embedder, storage));
    }
    let mut index = VectorIndex::new(embedder, storage);
    index.build(corpus.chunks).await?;
    Ok(index)
}

/// Wire the retriever: index, guarded web search, guarded completion.
pub async fn build_retriever(config: &Config) -> Result<Retriever> {
    let embedder = create_embedder(&config.embedding)?;
    let index = open_index(config, embedder).await?;

    let web = Guarded::new(
        TavilySearch::new(&config.web_search)?,
        Duration::from_secs(config.web_search.timeout_secs),
    );
    let completer = Guarded::new(
        ChatCompleter::new(&config.completion)?,
        Duration::from_secs(config.completion.timeout_secs),
    );

    Ok(Retriever::new(
        Arc::new(index),
        Arc::new(web),
        Summarizer::new(Arc::new(completer)),
    ))
}
