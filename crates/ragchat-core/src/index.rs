//! Exact nearest-neighbor vector index over chunks.
//!
//! [`VectorIndex`] pairs an [`Embedder`] with a flat store of
//! `(vector, chunk)` entries and an [`IndexStorage`] backend. Lifecycle:
//!
//! 1. construct with [`VectorIndex::new`] (not loaded; `query` fails with
//!    [`RagError::NotLoaded`]);
//! 2. populate once with [`build`](VectorIndex::build), which embeds the
//!    corpus and persists it, or restore with [`load`](VectorIndex::load);
//! 3. query any number of times.
//!
//! `build` and `load` take `&mut self`, so once an index is shared behind an
//! `Arc` it can only be read. Similarity is cosine; results come back
//! nearest-first with ties broken by insertion order.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{RagError, Result};
use crate::models::{Chunk, ScoredChunk};
use crate::storage::{
    checksum, decode_vectors, encode_vectors, IndexMetadata, IndexSnapshot, IndexStorage,
    FORMAT_VERSION,
};

fn load_err<T>(msg: String) -> Result<T> {
    Err(RagError::IndexLoad(msg))
}

struct Entries {
    dims: usize,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

impl Entries {
    fn snapshot(&self, model: &str) -> IndexSnapshot {
        let vectors = encode_vectors(self.dims, &self.vectors);
        let metadata = IndexMetadata {
            version: FORMAT_VERSION,
            dims: self.dims,
            count: self.chunks.len(),
            embedding_model: model.to_string(),
            vectors_sha256: checksum(&vectors),
            built_at: Utc::now(),
            chunks: self.chunks.clone(),
        };
        IndexSnapshot { vectors, metadata }
    }

    fn from_snapshot(snapshot: IndexSnapshot, embedder: &dyn Embedder) -> Result<Self> {
        let IndexSnapshot { vectors, metadata } = snapshot;
        if metadata.version != FORMAT_VERSION {
            return load_err(format!(
                "unsupported metadata version {} (expected {})",
                metadata.version, FORMAT_VERSION
            ));
        }
        let digest = checksum(&vectors);
        if digest != metadata.vectors_sha256 {
            return load_err("vector file does not match its metadata checksum".to_string());
        }
        let (dims, decoded) = decode_vectors(&vectors)?;
        if decoded.len() != metadata.count || metadata.chunks.len() != metadata.count {
            return load_err(format!(
                "entry count mismatch: vectors={}, metadata count={}, chunks={}",
                decoded.len(),
                metadata.count,
                metadata.chunks.len()
            ));
        }
        if dims != metadata.dims {
            return load_err(format!(
                "dimension mismatch: vector file {} vs metadata {}",
                dims, metadata.dims
            ));
        }
        if !decoded.is_empty() && dims != embedder.dims() {
            return load_err(format!(
                "index has {} dims but embedder '{}' produces {}",
                dims,
                embedder.model_name(),
                embedder.dims()
            ));
        }
        if metadata.embedding_model != embedder.model_name() {
            return load_err(format!(
                "index was built with embedding model '{}', configured model is '{}'",
                metadata.embedding_model,
                embedder.model_name()
            ));
        }

        Ok(Self {
            dims: embedder.dims(),
            vectors: decoded,
            chunks: metadata.chunks,
        })
    }
}

/// Embedding-backed nearest-neighbor index. See the module docs.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    storage: Arc<dyn IndexStorage>,
    entries: Option<Entries>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("model", &self.embedder.model_name())
            .field("dims", &self.dims())
            .field("loaded", &self.is_loaded())
            .field("entries", &self.len())
            .finish()
    }
}

impl VectorIndex {
    /// Create an index that is neither built nor loaded.
    pub fn new(embedder: Arc<dyn Embedder>, storage: Arc<dyn IndexStorage>) -> Self {
        Self {
            embedder,
            storage,
            entries: None,
        }
    }

    /// Create a loaded index holding zero entries. Every query returns an
    /// empty result.
    pub fn new_empty(embedder: Arc<dyn Embedder>, storage: Arc<dyn IndexStorage>) -> Self {
        let dims = embedder.dims();
        Self {
            embedder,
            storage,
            entries: Some(Entries {
                dims,
                vectors: Vec::new(),
                chunks: Vec::new(),
            }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    /// Number of entries; `0` when not loaded.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dims(&self) -> usize {
        self.embedder.dims()
    }

    pub fn storage(&self) -> &Arc<dyn IndexStorage> {
        &self.storage
    }

    /// Embed every chunk, replace the index contents, and persist.
    ///
    /// All-or-nothing: on any failure the previous contents (if any) are kept
    /// and nothing new is visible to `query`.
    pub async fn build(&mut self, corpus: Vec<Chunk>) -> Result<()> {
        if corpus.is_empty() {
            return Err(RagError::IndexBuild("corpus is empty".to_string()));
        }

        let dims = self.embedder.dims();
        let texts: Vec<String> = corpus.iter().map(|c| c.context_text().to_string()).collect();
        debug!(
            chunks = texts.len(),
            model = self.embedder.model_name(),
            "embedding corpus"
        );
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| RagError::IndexBuild(e.to_string()))?;

        if vectors.len() != corpus.len() {
            return Err(RagError::IndexBuild(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                corpus.len()
            )));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dims) {
            return Err(RagError::IndexBuild(format!(
                "vector {} has {} dims, index expects {}",
                i,
                v.len(),
                dims
            )));
        }

        let entries = Entries {
            dims,
            vectors,
            chunks: corpus,
        };
        self.storage
            .write(&entries.snapshot(self.embedder.model_name()))?;
        info!(entries = entries.chunks.len(), dims, "index built and persisted");
        self.entries = Some(entries);
        Ok(())
    }

    /// Restore the index from storage, replacing any current contents.
    pub fn load(&mut self) -> Result<()> {
        let snapshot = self.storage.read()?;
        let entries = Entries::from_snapshot(snapshot, self.embedder.as_ref())?;
        info!(entries = entries.chunks.len(), dims = entries.dims, "index loaded");
        self.entries = Some(entries);
        Ok(())
    }

    /// Write the current contents to storage.
    pub fn persist(&self) -> Result<()> {
        let entries = self.entries.as_ref().ok_or(RagError::NotLoaded)?;
        self.storage
            .write(&entries.snapshot(self.embedder.model_name()))
    }

    /// Return up to `top_k` chunks nearest to `text`, nearest first.
    ///
    /// No similarity cutoff is applied: the nearest entries are returned
    /// however distant they are.
    pub async fn query(&self, text: &str, top_k: NonZeroUsize) -> Result<Vec<ScoredChunk>> {
        let entries = self.entries.as_ref().ok_or(RagError::NotLoaded)?;
        if entries.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))?;
        if query_vec.len() != entries.dims {
            return Err(RagError::Embedding(format!(
                "query vector has {} dims, index expects {}",
                query_vec.len(),
                entries.dims
            )));
        }

        let mut scored: Vec<(usize, f32)> = entries
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query_vec, v)))
            .collect();
        // NaN scores rank below every real score.
        let key = |s: f32| if s.is_nan() { f32::NEG_INFINITY } else { s };
        scored.sort_by(|a, b| key(b.1).total_cmp(&key(a.1)).then(a.0.cmp(&b.0)));
        scored.truncate(top_k.get());

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: entries.chunks[i].clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    fn k(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn index() -> VectorIndex {
        VectorIndex::new(
            Arc::new(HashEmbedder::new(128)),
            Arc::new(MemoryStorage::new()),
        )
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            Chunk::new("Replication copies data across nodes."),
            Chunk::new("Sharding splits a collection by shard key."),
            Chunk::new("Indexes speed up queries on large collections."),
            Chunk::new("Transactions provide atomic multi-document writes."),
        ]
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(RagError::Embedding("backend down".to_string()))
        }
    }

    struct WrongDimsEmbedder;

    #[async_trait]
    impl Embedder for WrongDimsEmbedder {
        fn model_name(&self) -> &str {
            "wrong-dims"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 3]).collect())
        }
    }

    /// Embeds any text containing "nan" as a NaN vector, everything else on
    /// one of two axes.
    struct NanEmbedder;

    #[async_trait]
    impl Embedder for NanEmbedder {
        fn model_name(&self) -> &str {
            "nan"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("nan") {
                        vec![f32::NAN, 0.0]
                    } else if t.contains("north") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_nan_scores_rank_last() {
        let mut idx = VectorIndex::new(Arc::new(NanEmbedder), Arc::new(MemoryStorage::new()));
        idx.build(vec![
            Chunk::new("nan overflow"),
            Chunk::new("east"),
            Chunk::new("north"),
        ])
        .await
        .unwrap();

        let results = idx.query("north", k(3)).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, ["north", "east", "nan overflow"]);
        assert!(results[2].score.is_nan());
    }

    #[tokio::test]
    async fn test_debug_summarises_state() {
        let mut idx = index();
        assert!(format!("{:?}", idx).contains("loaded: false"));
        idx.build(corpus()).await.unwrap();
        let shown = format!("{:?}", idx);
        assert!(shown.contains("entries: 4"));
        assert!(shown.contains("\"hash\""));
    }

    #[tokio::test]
    async fn test_query_before_build_is_not_loaded() {
        let idx = index();
        let err = idx.query("anything", k(3)).await.unwrap_err();
        assert!(matches!(err, RagError::NotLoaded));
    }

    #[tokio::test]
    async fn test_build_rejects_empty_corpus() {
        let mut idx = index();
        let err = idx.build(Vec::new()).await.unwrap_err();
        assert!(matches!(err, RagError::IndexBuild(_)));
        assert!(!idx.is_loaded());
        assert!(!idx.storage().exists());
    }

    #[tokio::test]
    async fn test_build_persists() {
        let mut idx = index();
        idx.build(corpus()).await.unwrap();
        assert_eq!(idx.len(), 4);
        assert!(idx.storage().exists());
        let snap = idx.storage().read().unwrap();
        assert_eq!(snap.metadata.count, 4);
        assert_eq!(snap.metadata.embedding_model, "hash");
    }

    #[tokio::test]
    async fn test_build_embedding_failure_is_build_error() {
        let mut idx = VectorIndex::new(Arc::new(FailingEmbedder), Arc::new(MemoryStorage::new()));
        let err = idx.build(corpus()).await.unwrap_err();
        assert!(matches!(err, RagError::IndexBuild(_)));
        assert!(!idx.is_loaded());
    }

    #[tokio::test]
    async fn test_build_rejects_wrong_dimension() {
        let mut idx = VectorIndex::new(Arc::new(WrongDimsEmbedder), Arc::new(MemoryStorage::new()));
        let err = idx.build(corpus()).await.unwrap_err();
        assert!(err.to_string().contains("dims"));
        assert!(!idx.storage().exists());
    }

    #[tokio::test]
    async fn test_query_nearest_first() {
        let mut idx = index();
        idx.build(corpus()).await.unwrap();
        let results = idx.query("What is Replication?", k(3)).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.text, "Replication copies data across nodes.");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_query_top_k_bounds() {
        let mut idx = index();
        idx.build(corpus()).await.unwrap();
        for n in 1..=4 {
            assert_eq!(idx.query("collections", k(n)).await.unwrap().len(), n);
        }
        assert_eq!(idx.query("collections", k(10)).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let idx = VectorIndex::new_empty(
            Arc::new(HashEmbedder::new(16)),
            Arc::new(MemoryStorage::new()),
        );
        assert!(idx.is_loaded());
        assert!(idx.query("anything", k(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_contents() {
        let mut idx = index();
        idx.build(corpus()).await.unwrap();
        assert!(idx.build(Vec::new()).await.is_err());
        assert_eq!(idx.len(), 4);
    }

    #[tokio::test]
    async fn test_load_round_trip_identical_results() {
        let embedder = Arc::new(HashEmbedder::new(64));
        let storage: Arc<dyn IndexStorage> = Arc::new(MemoryStorage::new());
        let mut built = VectorIndex::new(embedder.clone(), storage.clone());
        built.build(corpus()).await.unwrap();

        let mut loaded = VectorIndex::new(embedder, storage);
        loaded.load().unwrap();

        for q in ["replication", "shard key", "atomic writes", ""] {
            for n in 1..=5 {
                let a = built.query(q, k(n)).await.unwrap();
                let b = loaded.query(q, k(n)).await.unwrap();
                assert_eq!(a, b, "query {:?} k={}", q, n);
            }
        }
    }

    #[tokio::test]
    async fn test_load_rejects_checksum_mismatch() {
        let storage = Arc::new(MemoryStorage::new());
        let embedder = Arc::new(HashEmbedder::new(8));
        let mut idx = VectorIndex::new(embedder.clone(), storage.clone());
        idx.build(corpus()).await.unwrap();

        let mut snap = storage.read().unwrap();
        let last = snap.vectors.len() - 1;
        snap.vectors[last] ^= 0xff;
        storage.write(&snap).unwrap();

        let mut fresh = VectorIndex::new(embedder, storage);
        assert!(matches!(fresh.load(), Err(RagError::IndexLoad(_))));
        assert!(!fresh.is_loaded());
    }

    #[tokio::test]
    async fn test_load_rejects_count_mismatch() {
        let storage = Arc::new(MemoryStorage::new());
        let embedder = Arc::new(HashEmbedder::new(8));
        let mut idx = VectorIndex::new(embedder.clone(), storage.clone());
        idx.build(corpus()).await.unwrap();

        let mut snap = storage.read().unwrap();
        snap.metadata.chunks.pop();
        storage.write(&snap).unwrap();

        let mut fresh = VectorIndex::new(embedder, storage);
        let err = fresh.load().unwrap_err();
        assert!(err.to_string().contains("count mismatch"));
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedder() {
        let storage = Arc::new(MemoryStorage::new());
        let mut idx = VectorIndex::new(Arc::new(HashEmbedder::new(8)), storage.clone());
        idx.build(corpus()).await.unwrap();

        let mut fresh = VectorIndex::new(Arc::new(HashEmbedder::new(16)), storage);
        assert!(matches!(fresh.load(), Err(RagError::IndexLoad(_))));
    }

    #[tokio::test]
    async fn test_persist_requires_loaded() {
        assert!(matches!(index().persist(), Err(RagError::NotLoaded)));
    }
}
