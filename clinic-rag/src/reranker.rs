//! Reranker trait for choosing the final chunks from index candidates.

use crate::document::RetrievalCandidate;
use crate::mmr::{DEFAULT_MMR_LAMBDA, mmr_select};

/// A reranker that picks the final `k` chunks from a candidate set.
///
/// Candidates arrive in nearest-neighbour order, each carrying its stored
/// embedding and its similarity to the query.
pub trait Reranker: Send + Sync {
    /// Return at most `k` candidates in presentation order.
    fn rerank(
        &self,
        query_embedding: &[f32],
        candidates: Vec<RetrievalCandidate>,
        k: usize,
    ) -> Vec<RetrievalCandidate>;
}

/// Diversity-aware reranking with Maximal Marginal Relevance.
///
/// # Example
///
/// ```rust,ignore
/// use clinic_rag::MmrReranker;
///
/// let reranker = MmrReranker::new(0.7);
/// let chosen = reranker.rerank(&query_embedding, candidates, 4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MmrReranker {
    lambda: f32,
}

impl MmrReranker {
    /// Create a reranker with the given relevance/diversity trade-off.
    pub fn new(lambda: f32) -> Self {
        Self { lambda }
    }

    /// The configured trade-off.
    pub fn lambda(&self) -> f32 {
        self.lambda
    }
}

impl Default for MmrReranker {
    fn default() -> Self {
        Self::new(DEFAULT_MMR_LAMBDA)
    }
}

impl Reranker for MmrReranker {
    fn rerank(
        &self,
        query_embedding: &[f32],
        candidates: Vec<RetrievalCandidate>,
        k: usize,
    ) -> Vec<RetrievalCandidate> {
        let embeddings: Vec<&[f32]> = candidates.iter().map(|c| c.embedding.as_slice()).collect();
        let order = mmr_select(query_embedding, &embeddings, k, self.lambda);

        let mut slots: Vec<Option<RetrievalCandidate>> = candidates.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}

/// Keeps the nearest-neighbour order and truncates to `k`.
///
/// Useful when diversity is not wanted, e.g. for very short documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopKReranker;

impl Reranker for TopKReranker {
    fn rerank(
        &self,
        _query_embedding: &[f32],
        mut candidates: Vec<RetrievalCandidate>,
        k: usize,
    ) -> Vec<RetrievalCandidate> {
        candidates.truncate(k);
        candidates
    }
}
