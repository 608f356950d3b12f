//! Configuration for the retrieval pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Chunk window size in words.
    pub chunk_size: usize,
    /// Number of words shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks returned by a retrieval.
    pub top_k: usize,
    /// Candidates fetched from the index per returned chunk, before MMR.
    pub fetch_multiplier: usize,
    /// MMR trade-off between relevance (1.0) and diversity (0.0).
    pub mmr_lambda: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 600, chunk_overlap: 150, top_k: 4, fetch_multiplier: 4, mmr_lambda: 0.5 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Number of nearest neighbours to pull from the index for `k` results.
    pub fn fetch_k(&self, k: usize) -> usize {
        k.saturating_mul(self.fetch_multiplier.max(1))
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk window size in words.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in words.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks returned by a retrieval.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set how many index candidates are fetched per returned chunk.
    pub fn fetch_multiplier(mut self, multiplier: usize) -> Self {
        self.config.fetch_multiplier = multiplier;
        self
    }

    /// Set the MMR relevance/diversity trade-off.
    pub fn mmr_lambda(mut self, lambda: f32) -> Self {
        self.config.mmr_lambda = lambda;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `fetch_multiplier == 0`
    /// - `mmr_lambda` is outside `[0, 1]`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.fetch_multiplier == 0 {
            return Err(RagError::ConfigError(
                "fetch_multiplier must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.config.mmr_lambda) {
            return Err(RagError::ConfigError(format!(
                "mmr_lambda ({}) must be within [0, 1]",
                self.config.mmr_lambda
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_word_window_settings() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 600);
        assert_eq!(config.chunk_overlap, 150);
        assert_eq!(config.fetch_k(config.top_k), 16);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let err = RagConfig::builder().chunk_size(10).chunk_overlap(10).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn lambda_out_of_range_is_rejected() {
        assert!(RagConfig::builder().mmr_lambda(1.5).build().is_err());
        assert!(RagConfig::builder().mmr_lambda(0.0).build().is_ok());
    }
}
