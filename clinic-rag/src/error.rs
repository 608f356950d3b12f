//! Error types for the `clinic-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// No embedding model is configured or the model could not be loaded.
    ///
    /// Callers treat this as "retrieval disabled" rather than a fatal error.
    #[error("Embedding model unavailable")]
    EmbeddingUnavailable,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vectors handed to the index are inconsistent.
    #[error("Index error: {0}")]
    IndexError(String),

    /// A persisted index exists but could not be read back.
    #[error("Index load failed for user '{user_id}': {message}")]
    IndexLoadFailed {
        /// The user whose index failed to load.
        user_id: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the index store backend.
    #[error("Index store error ({backend}): {message}")]
    IndexStoreError {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the retrieval pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
