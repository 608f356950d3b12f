//! Retrieval pipeline orchestrator.
//!
//! A [`RetrievalPipeline`] is scoped to one user. It builds that user's index
//! from extracted document text (chunk → embed → index → persist) and answers
//! retrieval queries (embed → nearest neighbours → rerank).
//!
//! Retrieval is best-effort context for the chat model: when there is no
//! index or no embedding model, [`retrieve`](RetrievalPipeline::retrieve)
//! returns an empty list instead of an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use clinic_rag::{RetrievalPipeline, RagConfig, FileIndexStore, HashingEmbeddingProvider};
//!
//! let pipeline = RetrievalPipeline::builder()
//!     .user_id("patient-7")
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .index_store(Arc::new(FileIndexStore::new("vector_store")))
//!     .open()
//!     .await?;
//!
//! pipeline.build_index(&extracted_text).await?;
//! let context = pipeline.retrieve("how long does whitening last?").await;
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, WordWindowChunker};
use crate::config::RagConfig;
use crate::document::{DocumentChunk, RetrievalCandidate};
use crate::embedding::{EmbeddingProvider, embed_checked};
use crate::error::{RagError, Result};
use crate::index::FlatIndex;
use crate::reranker::{MmrReranker, Reranker};
use crate::similarity::cosine_similarity;
use crate::store::{IndexStore, PersistedIndex};

/// Observable state of a pipeline's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    /// Nothing has been indexed for this user.
    Empty,
    /// An index is loaded and serving queries.
    Ready {
        /// Number of indexed chunks.
        chunks: usize,
    },
    /// A persisted index exists but could not be loaded.
    LoadFailed {
        /// Why loading failed.
        reason: String,
    },
}

/// Why a build produced no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDocumentsReason {
    /// The extracted text contained no words.
    EmptyText,
    /// No embedding model was available to embed the chunks.
    EmbeddingUnavailable,
}

/// Result of [`RetrievalPipeline::build_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A new index was built and persisted.
    Indexed {
        /// Number of indexed chunks.
        chunks: usize,
    },
    /// No documents were indexed; any previous index is left in place.
    NoDocuments(NoDocumentsReason),
}

#[derive(Debug)]
struct LoadedIndex {
    index: FlatIndex,
    chunks: Vec<DocumentChunk>,
}

#[derive(Debug)]
enum IndexState {
    Empty,
    Ready(Arc<LoadedIndex>),
    LoadFailed(String),
}

/// The per-user retrieval pipeline.
///
/// Construct one via [`RetrievalPipeline::builder()`].
pub struct RetrievalPipeline {
    user_id: String,
    config: RagConfig,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index_store: Arc<dyn IndexStore>,
    chunker: Arc<dyn Chunker>,
    reranker: Arc<dyn Reranker>,
    state: RwLock<IndexState>,
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("user_id", &self.user_id)
            .field("config", &self.config)
            .field("has_embedder", &self.embedding_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl RetrievalPipeline {
    /// Create a new [`RetrievalPipelineBuilder`].
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::default()
    }

    /// The user this pipeline belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Whether an embedding model is configured.
    pub fn has_embedder(&self) -> bool {
        self.embedding_provider.is_some()
    }

    /// Current state of the index.
    pub async fn status(&self) -> IndexStatus {
        match &*self.state.read().await {
            IndexState::Empty => IndexStatus::Empty,
            IndexState::Ready(loaded) => IndexStatus::Ready { chunks: loaded.chunks.len() },
            IndexState::LoadFailed(reason) => IndexStatus::LoadFailed { reason: reason.clone() },
        }
    }

    /// Load the persisted index for this user, replacing the in-memory one.
    ///
    /// Load failures are recorded as [`IndexStatus::LoadFailed`] and logged;
    /// they never propagate to the caller.
    pub async fn reload(&self) -> IndexStatus {
        let next = match self.index_store.load(&self.user_id).await {
            Ok(None) => IndexState::Empty,
            Ok(Some(persisted)) => match self.validate_persisted(persisted) {
                Ok(loaded) => IndexState::Ready(Arc::new(loaded)),
                Err(e) => {
                    warn!(user_id = %self.user_id, error = %e, "index load failed");
                    IndexState::LoadFailed(e.to_string())
                }
            },
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "index load failed");
                IndexState::LoadFailed(e.to_string())
            }
        };

        *self.state.write().await = next;
        let status = self.status().await;
        debug!(user_id = %self.user_id, ?status, "index reloaded");
        status
    }

    fn validate_persisted(&self, persisted: PersistedIndex) -> Result<LoadedIndex> {
        let (index, chunks) = persisted.into_parts()?;
        if let Some(provider) = &self.embedding_provider {
            if !index.is_empty() && index.dimensions() != provider.dimensions() {
                return Err(RagError::IndexLoadFailed {
                    user_id: self.user_id.clone(),
                    message: format!(
                        "index has {} dimensions but the embedder produces {}",
                        index.dimensions(),
                        provider.dimensions()
                    ),
                });
            }
        }
        Ok(LoadedIndex { index, chunks })
    }

    /// Build a fresh index from extracted document text and persist it.
    ///
    /// The new index replaces the previous one only after it has been saved,
    /// so concurrent [`retrieve`](Self::retrieve) calls observe either the
    /// old or the new index. When the text is empty or no embedding model is
    /// available, nothing is built and the previous index stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the embeddings cannot form an
    /// index or the index cannot be persisted.
    pub async fn build_index(&self, raw_text: &str) -> Result<BuildOutcome> {
        let _guard = self.build_lock.lock().await;

        let chunks = self.chunker.chunk(raw_text);
        if chunks.is_empty() {
            info!(user_id = %self.user_id, "no text to index");
            return Ok(BuildOutcome::NoDocuments(NoDocumentsReason::EmptyText));
        }

        let Some(provider) = &self.embedding_provider else {
            warn!(user_id = %self.user_id, "embedding model unavailable, index not built");
            return Ok(BuildOutcome::NoDocuments(NoDocumentsReason::EmbeddingUnavailable));
        };

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = match embed_checked(provider.as_ref(), &texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "embedding failed, index not built");
                return Ok(BuildOutcome::NoDocuments(NoDocumentsReason::EmbeddingUnavailable));
            }
        };

        let index = FlatIndex::build(embeddings).map_err(|e| {
            error!(user_id = %self.user_id, error = %e, "failed to build index");
            RagError::PipelineError(format!("failed to build index: {e}"))
        })?;

        let persisted = PersistedIndex::from_parts(&self.user_id, &index, &chunks);
        self.index_store.save(&persisted).await.map_err(|e| {
            error!(user_id = %self.user_id, error = %e, "failed to persist index");
            RagError::PipelineError(format!(
                "failed to persist index for user '{}': {e}",
                self.user_id
            ))
        })?;

        let chunk_count = chunks.len();
        *self.state.write().await = IndexState::Ready(Arc::new(LoadedIndex { index, chunks }));
        info!(user_id = %self.user_id, chunk_count, "index built");

        Ok(BuildOutcome::Indexed { chunks: chunk_count })
    }

    /// Retrieve the configured `top_k` chunk texts for `query`.
    pub async fn retrieve(&self, query: &str) -> Vec<String> {
        self.retrieve_k(query, self.config.top_k).await
    }

    /// Retrieve up to `k` chunk texts for `query`, in rerank order.
    ///
    /// Returns an empty list when no index is loaded, no embedding model is
    /// available, or the query cannot be embedded.
    pub async fn retrieve_k(&self, query: &str, k: usize) -> Vec<String> {
        self.retrieve_candidates(query, k).await.into_iter().map(|c| c.chunk.text).collect()
    }

    /// Retrieve up to `k` reranked candidates for `query`, with their
    /// embeddings and query similarity.
    pub async fn retrieve_candidates(&self, query: &str, k: usize) -> Vec<RetrievalCandidate> {
        if k == 0 {
            return Vec::new();
        }

        let loaded = match &*self.state.read().await {
            IndexState::Ready(loaded) => Arc::clone(loaded),
            IndexState::Empty | IndexState::LoadFailed(_) => return Vec::new(),
        };
        let Some(provider) = &self.embedding_provider else {
            return Vec::new();
        };

        let query_embedding = match provider.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "query embedding failed");
                return Vec::new();
            }
        };

        let neighbors = match loaded.index.search(&query_embedding, self.config.fetch_k(k)) {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "index search failed");
                return Vec::new();
            }
        };

        let candidates: Vec<RetrievalCandidate> = neighbors
            .into_iter()
            .filter_map(|n| {
                let chunk = loaded.chunks.get(n.position)?.clone();
                let embedding = loaded.index.vector(n.position)?.to_vec();
                let similarity = cosine_similarity(&query_embedding, &embedding);
                Some(RetrievalCandidate { chunk, embedding, similarity })
            })
            .collect();

        let candidate_count = candidates.len();
        let selected = self.reranker.rerank(&query_embedding, candidates, k);
        debug!(
            user_id = %self.user_id,
            candidate_count,
            result_count = selected.len(),
            "retrieval completed"
        );
        selected
    }
}

/// Builder for constructing a [`RetrievalPipeline`].
///
/// `user_id` and `index_store` are required. The embedding provider is
/// optional: without one the pipeline runs with retrieval disabled. The
/// chunker and reranker default to word windows and MMR derived from the
/// config.
#[derive(Default)]
pub struct RetrievalPipelineBuilder {
    user_id: Option<String>,
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index_store: Option<Arc<dyn IndexStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RetrievalPipelineBuilder {
    /// Set the owning user.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the embedding provider if one is available.
    pub fn maybe_embedding_provider(mut self, provider: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        self.embedding_provider = provider;
        self
    }

    /// Set the index store.
    pub fn index_store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.index_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the [`RetrievalPipeline`] with an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<RetrievalPipeline> {
        let user_id =
            self.user_id.ok_or_else(|| RagError::ConfigError("user_id is required".to_string()))?;
        let index_store = self
            .index_store
            .ok_or_else(|| RagError::ConfigError("index_store is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(WordWindowChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let reranker =
            self.reranker.unwrap_or_else(|| Arc::new(MmrReranker::new(config.mmr_lambda)));

        Ok(RetrievalPipeline {
            user_id,
            config,
            embedding_provider: self.embedding_provider,
            index_store,
            chunker,
            reranker,
            state: RwLock::new(IndexState::Empty),
            build_lock: Mutex::new(()),
        })
    }

    /// Build the pipeline and load any previously persisted index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing. A
    /// persisted index that fails to load is not an error; it is reported
    /// through [`RetrievalPipeline::status`].
    pub async fn open(self) -> Result<RetrievalPipeline> {
        let pipeline = self.build()?;
        pipeline.reload().await;
        Ok(pipeline)
    }
}
