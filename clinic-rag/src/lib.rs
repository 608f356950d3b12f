//! Retrieval for grounding clinic assistant answers in uploaded documents.
//!
//! This crate provides:
//! - Word-window chunking of extracted document text
//! - A pluggable [`EmbeddingProvider`] with a local hashing implementation
//! - A flat, exact Euclidean [`FlatIndex`] persisted per user
//! - Maximal Marginal Relevance reranking for diverse context
//! - The per-user [`RetrievalPipeline`] tying them together
//!
//! # Features
//!
//! - `openai`: [`openai::OpenAiCompatibleEmbeddingProvider`]

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod inmemory;
pub mod mmr;
pub mod pipeline;
pub mod reranker;
pub mod similarity;
pub mod store;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{
    Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, WordWindowChunker, WordWindows,
    word_windows,
};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{DocumentChunk, RetrievalCandidate};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::{DEFAULT_HASHING_DIMENSIONS, HashingEmbeddingProvider};
pub use index::{FlatIndex, Neighbor};
pub use inmemory::InMemoryIndexStore;
pub use mmr::{DEFAULT_MMR_LAMBDA, mmr_select};
pub use pipeline::{
    BuildOutcome, IndexStatus, NoDocumentsReason, RetrievalPipeline, RetrievalPipelineBuilder,
};
pub use reranker::{MmrReranker, Reranker, TopKReranker};
pub use similarity::cosine_similarity;
pub use store::{FileIndexStore, INDEX_FORMAT_VERSION, IndexStore, PersistedIndex};
