use clinic_rag::RagError;
use thiserror::Error;

/// Errors raised while configuring or starting the assistant.
///
/// Conversation turns never fail: collaborator errors are turned into
/// replies by the router. These errors cover startup and ingestion.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval error: {0}")]
    Rag(#[from] RagError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
