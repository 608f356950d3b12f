//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates fixed-dimension vector embeddings from text.
///
/// Implementations wrap a specific model behind a unified async interface.
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// A provider whose model cannot be reached returns
/// [`RagError::EmbeddingUnavailable`] (or an [`RagError::EmbeddingError`]),
/// which the pipeline treats as "retrieval disabled".
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Embed `texts` and check that the provider honoured the batch contract.
pub(crate) async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>> {
    let embeddings = provider.embed_batch(texts).await?;
    if embeddings.len() != texts.len() {
        return Err(RagError::EmbeddingError {
            provider: provider.name().to_string(),
            message: format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
        });
    }
    let expected = provider.dimensions();
    if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
        return Err(RagError::EmbeddingError {
            provider: provider.name().to_string(),
            message: format!("expected {expected} dimensions, got {}", bad.len()),
        });
    }
    Ok(embeddings)
}
