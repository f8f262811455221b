//! Hybrid retrieval engine.
//!
//! A [`DocumentIndex`] is an immutable snapshot of one document: its chunks,
//! the dense index, and the BM25 index, all aligned by chunk ordinal.
//! [`RagEngine`] holds the current snapshot behind an `Arc` and replaces it
//! wholesale on every indexing call, so a retrieval always sees a dense and
//! a sparse index built from the same document.
//!
//! # Retrieval Algorithm
//!
//! 1. Embed the query and score it against every chunk (dense).
//! 2. Score the whitespace-tokenized query against every chunk (BM25).
//! 3. Min-max normalize each score vector independently.
//! 4. Fuse: `0.75 × dense + 0.25 × sparse` (configurable).
//! 5. Sort descending, ties by chunk ordinal, truncate to `top_k`.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::chunk::{chunk_text, ChunkParams};
use crate::dense::DenseIndex;
use crate::embedding::Embedder;
use crate::error::{CoreError, Result};
use crate::fusion::{fuse, min_max_normalize, rank, FusionWeights};
use crate::models::{Chunk, RetrievedChunk};
use crate::sparse::{tokenize, Bm25Index};

/// Indexes over a single document.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    chunks: Vec<Chunk>,
    dense: DenseIndex,
    sparse: Bm25Index,
}

impl DocumentIndex {
    /// An index with no chunks. Every retrieval against it is empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Chunk `text` and build both indexes over the chunks.
    pub async fn build(
        text: &str,
        params: &ChunkParams,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        let chunks = chunk_text(text, params)?;
        if chunks.is_empty() {
            info!("indexed empty document, 0 chunks");
            return Ok(Self::empty());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .map_err(|e| CoreError::Embedding(e.to_string()))?;
        if vectors.len() != chunks.len() {
            return Err(CoreError::Embedding(format!(
                "{} returned {} vectors for {} chunks",
                embedder.model_name(),
                vectors.len(),
                chunks.len()
            )));
        }
        let dense = DenseIndex::build(vectors)?;

        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
        let sparse = Bm25Index::build(&tokenized);

        info!(
            chunks = chunks.len(),
            dims = dense.dims(),
            model = embedder.model_name(),
            "indexed document"
        );

        Ok(Self {
            chunks,
            dense,
            sparse,
        })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Hybrid retrieval over every chunk, returning at most `top_k` results.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        weights: &FusionWeights,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedChunk>> {
        if self.is_empty() || top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embedder
            .embed(&[query.to_string()])
            .await
            .map_err(|e| CoreError::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Embedding("empty embedding response".to_string()))?;

        // Request every chunk so each one carries its computed similarity.
        let mut dense_scores = vec![0.0f32; self.len()];
        for (i, score) in self.dense.search(&query_vec, self.len())? {
            dense_scores[i] = score;
        }
        let sparse_scores = self.sparse.scores(&tokenize(query));

        let norm_dense = min_max_normalize(&dense_scores);
        let norm_sparse = min_max_normalize(&sparse_scores);
        let hybrid = fuse(&norm_dense, &norm_sparse, weights);

        let ranked = rank(&hybrid, top_k);
        debug!(
            query,
            candidates = self.len(),
            returned = ranked.len(),
            "hybrid retrieval"
        );

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(pos, (i, score))| {
                debug!(
                    rank = pos + 1,
                    chunk = i,
                    hybrid = score,
                    dense = norm_dense[i],
                    sparse = norm_sparse[i],
                    "ranked chunk"
                );
                RetrievedChunk {
                    index: i,
                    text: self.chunks[i].text.clone(),
                    score,
                    dense_score: norm_dense[i],
                    sparse_score: norm_sparse[i],
                }
            })
            .collect())
    }
}

/// Holder of the current [`DocumentIndex`].
///
/// Indexing builds a new snapshot without holding the lock and then swaps
/// it in; a failed build leaves the previous snapshot untouched. Readers
/// clone the `Arc` and release the lock before doing any work.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    params: ChunkParams,
    weights: FusionWeights,
    current: RwLock<Arc<DocumentIndex>>,
}

impl RagEngine {
    pub fn new(embedder: Arc<dyn Embedder>, params: ChunkParams, weights: FusionWeights) -> Self {
        Self {
            embedder,
            params,
            weights,
            current: RwLock::new(Arc::new(DocumentIndex::empty())),
        }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn chunk_params(&self) -> &ChunkParams {
        &self.params
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    /// Replace the current index with one built from `text`.
    ///
    /// Returns the number of chunks indexed.
    pub async fn index_document(&self, text: &str) -> Result<usize> {
        let index = DocumentIndex::build(text, &self.params, self.embedder.as_ref()).await?;
        let count = index.len();
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(index);
        Ok(count)
    }

    /// The snapshot a retrieval started now would use.
    pub fn snapshot(&self) -> Arc<DocumentIndex> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn chunk_count(&self) -> usize {
        self.snapshot().len()
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let index = self.snapshot();
        index
            .retrieve(query, top_k, &self.weights, self.embedder.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use std::sync::atomic::{AtomicBool, Ordering};

    use anyhow::bail;
    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashedEmbedder;

    const ANIMALS: &str = "cats are mammals. dogs are mammals too. birds can fly.";

    fn engine(size: usize, overlap: usize) -> RagEngine {
        RagEngine::new(
            Arc::new(HashedEmbedder::default()),
            ChunkParams::new(size, overlap).unwrap(),
            FusionWeights::default(),
        )
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
        async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            bail!("embedding service unavailable")
        }
    }

    /// Hashed embeddings, except while `down` is set.
    struct ToggleEmbedder {
        inner: HashedEmbedder,
        down: AtomicBool,
    }

    #[async_trait]
    impl Embedder for ToggleEmbedder {
        fn model_name(&self) -> &str {
            "toggle"
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            if self.down.load(Ordering::SeqCst) {
                bail!("embedding service unavailable");
            }
            self.inner.embed(texts).await
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[tokio::test]
    async fn test_retrieve_before_indexing_is_empty() {
        let engine = engine(6, 2);
        assert_eq!(engine.chunk_count(), 0);
        assert!(engine.retrieve("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_document_yields_no_chunks() {
        let engine = engine(6, 2);
        assert_eq!(engine.index_document("").await.unwrap(), 0);
        assert!(engine.retrieve("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mammals_ranked_first() {
        let engine = engine(6, 2);
        assert_eq!(engine.index_document(ANIMALS).await.unwrap(), 2);
        let results = engine.retrieve("mammals", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].text.contains("mammals"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_mammals_above_birds_with_more_chunks() {
        let engine = engine(4, 1);
        engine.index_document(ANIMALS).await.unwrap();
        let results = engine.retrieve("mammals", 10).await.unwrap();
        let top = &results[0];
        assert!(top.text.contains("mammals"));
        let birds_rank = results
            .iter()
            .position(|r| r.text.contains("birds") && !r.text.contains("mammals"))
            .unwrap();
        assert!(birds_rank > 0);
        assert!(top.score > results[birds_rank].score);
    }

    #[tokio::test]
    async fn test_top_k_equal_to_chunk_count_returns_every_chunk_once() {
        let engine = engine(5, 2);
        let text = (0..40).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ");
        let count = engine.index_document(&text).await.unwrap();
        let results = engine.retrieve("word7 word8", count).await.unwrap();
        assert_eq!(results.len(), count);
        let seen: HashSet<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(seen.len(), count);
    }

    #[tokio::test]
    async fn test_results_descending_and_truncated() {
        let engine = engine(5, 2);
        let text = (0..40).map(|i| format!("word{}", i % 9)).collect::<Vec<_>>().join(" ");
        engine.index_document(&text).await.unwrap();
        let results = engine.retrieve("word3", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_identical_chunks_tie_break_by_ordinal() {
        let engine = engine(2, 0);
        engine.index_document("same text same text same text").await.unwrap();
        let results = engine.retrieve("same", 3).await.unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reindex_discards_previous_document() {
        let engine = engine(6, 2);
        engine.index_document(ANIMALS).await.unwrap();
        engine
            .index_document("rust compilers check ownership and borrowing rules at compile time")
            .await
            .unwrap();
        let results = engine.retrieve("mammals", 10).await.unwrap();
        assert!(!results.is_empty());
        for r in &results {
            assert!(!r.text.contains("mammals"));
            assert!(!r.text.contains("birds"));
        }
        let snapshot = engine.snapshot();
        assert!(snapshot.chunks().iter().all(|c| !c.text.contains("cats")));
    }

    #[tokio::test]
    async fn test_blank_query_and_zero_top_k() {
        let engine = engine(6, 2);
        engine.index_document(ANIMALS).await.unwrap();
        assert!(engine.retrieve("   ", 5).await.unwrap().is_empty());
        assert!(engine.retrieve("mammals", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_index() {
        let params = ChunkParams::new(6, 2).unwrap();
        let engine = engine(6, 2);
        engine.index_document(ANIMALS).await.unwrap();

        let err = DocumentIndex::build("new text entirely", &params, &FailingEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Embedding(_)));
        assert!(err.to_string().contains("unavailable"));

        let failing = RagEngine::new(Arc::new(FailingEmbedder), params, FusionWeights::default());
        assert!(failing.index_document("some text").await.is_err());
        assert_eq!(failing.chunk_count(), 0);

        assert_eq!(engine.chunk_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_reindex_on_same_engine_keeps_document() {
        let embedder = Arc::new(ToggleEmbedder {
            inner: HashedEmbedder::default(),
            down: AtomicBool::new(false),
        });
        let engine = RagEngine::new(
            embedder.clone(),
            ChunkParams::new(6, 2).unwrap(),
            FusionWeights::default(),
        );
        assert_eq!(engine.index_document(ANIMALS).await.unwrap(), 2);
        let before = engine.snapshot();

        embedder.down.store(true, Ordering::SeqCst);
        let err = engine
            .index_document("rust compilers check ownership rules")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Embedding(_)));
        embedder.down.store(false, Ordering::SeqCst);

        assert_eq!(engine.chunk_count(), 2);
        assert!(Arc::ptr_eq(&before, &engine.snapshot()));

        let results = engine.retrieve("mammals", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].text.contains("mammals"));
        assert!(results.iter().all(|r| !r.text.contains("rust")));
    }

    #[tokio::test]
    async fn test_embedder_vector_count_checked() {
        let params = ChunkParams::new(2, 0).unwrap();
        let err = DocumentIndex::build("a b c d", &params, &ShortEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_invalid_chunking_fails_fast() {
        let params = ChunkParams { size: 2, overlap: 2 };
        let err = DocumentIndex::build("a b c", &params, &HashedEmbedder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChunking { .. }));
    }

    #[tokio::test]
    async fn test_component_scores_reported() {
        let engine = engine(4, 1);
        engine.index_document(ANIMALS).await.unwrap();
        let results = engine.retrieve("mammals", 10).await.unwrap();
        for r in &results {
            let expected = 0.75 * r.dense_score + 0.25 * r.sparse_score;
            assert!((r.score - expected).abs() < 1e-6);
        }
    }
}
