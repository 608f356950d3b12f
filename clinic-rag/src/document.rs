//! Data types for chunks and retrieval candidates.

use serde::{Deserialize, Serialize};

/// A word-window of a source document, the unit of retrieval.
///
/// Chunks are immutable once created. A rebuild replaces the whole set of
/// chunks held by a user's index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentChunk {
    /// The text of the window, tokens joined by single spaces.
    pub text: String,
    /// Position of the window in extraction order.
    pub source_order: usize,
}

impl DocumentChunk {
    /// Create a chunk at the given extraction position.
    pub fn new(text: impl Into<String>, source_order: usize) -> Self {
        Self { text: text.into(), source_order }
    }
}

/// A chunk pulled from the index for a single query, before reranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    /// The candidate chunk.
    pub chunk: DocumentChunk,
    /// The stored embedding of the chunk.
    pub embedding: Vec<f32>,
    /// Cosine similarity between the query and this chunk.
    pub similarity: f32,
}
