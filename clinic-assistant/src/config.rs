//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clinic_rag::{DEFAULT_HASHING_DIMENSIONS, RagConfig};

use crate::error::{AssistantError, Result};

/// Default directory for persisted indexes and uploaded documents.
pub const DEFAULT_DATA_DIR: &str = "./vector_store";

/// Idle time after which a conversation is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_CHAT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Settings for the chat model used to answer questions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Settings for the embedding model.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    /// Key for a hosted OpenAI-compatible model. Without one the local
    /// hashing embedder is used.
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Output dimensions. Unset means the model's default.
    pub dimensions: Option<usize>,
}

impl EmbeddingSettings {
    /// Dimensions for the local hashing embedder.
    pub fn hashing_dimensions(&self) -> usize {
        self.dimensions.unwrap_or(DEFAULT_HASHING_DIMENSIONS)
    }
}

/// Outgoing mail settings for booking confirmations.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
}

impl EmailSettings {
    /// Whether enough is set to attempt SMTP delivery.
    pub fn is_configured(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub data_dir: PathBuf,
    pub rag: RagConfig,
    pub session_ttl: Duration,
    pub chat: ChatSettings,
    pub embedding: EmbeddingSettings,
    pub email: EmailSettings,
}

impl AssistantConfig {
    /// Reads configuration from the process environment, after loading a
    /// `.env` file when one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let mut rag = RagConfig::builder();
        if let Some(size) = parse_var(&get, "CLINIC_CHUNK_SIZE")? {
            rag = rag.chunk_size(size);
        }
        if let Some(overlap) = parse_var(&get, "CLINIC_CHUNK_OVERLAP")? {
            rag = rag.chunk_overlap(overlap);
        }
        if let Some(top_k) = parse_var(&get, "CLINIC_TOP_K")? {
            rag = rag.top_k(top_k);
        }
        if let Some(lambda) = parse_var(&get, "CLINIC_MMR_LAMBDA")? {
            rag = rag.mmr_lambda(lambda);
        }
        let rag = rag.build()?;

        let session_ttl =
            parse_var::<u64>(&get, "CLINIC_SESSION_TTL_SECS")?.map(Duration::from_secs).unwrap_or(DEFAULT_SESSION_TTL);
        if session_ttl.is_zero() {
            return Err(AssistantError::Config("CLINIC_SESSION_TTL_SECS must be greater than 0".to_string()));
        }

        let dimensions = parse_var(&get, "CLINIC_EMBEDDING_DIMENSIONS")?;
        if dimensions == Some(0) {
            return Err(AssistantError::Config("CLINIC_EMBEDDING_DIMENSIONS must be greater than 0".to_string()));
        }

        Ok(Self {
            data_dir: get("CLINIC_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            rag,
            session_ttl,
            chat: ChatSettings {
                api_key: get("GROQ_API_KEY"),
                model: get("CLINIC_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
                base_url: get("CLINIC_CHAT_BASE_URL").unwrap_or_else(|| DEFAULT_CHAT_BASE_URL.to_string()),
            },
            embedding: EmbeddingSettings {
                api_key: get("OPENAI_API_KEY"),
                model: get("CLINIC_EMBEDDING_MODEL"),
                base_url: get("CLINIC_EMBEDDING_BASE_URL"),
                dimensions,
            },
            email: EmailSettings {
                host: get("EMAIL_HOST").unwrap_or_else(|| "smtp.example.com".to_string()),
                port: parse_var(&get, "EMAIL_PORT")?.unwrap_or(587),
                user: get("EMAIL_USER"),
                password: get("EMAIL_PASSWORD"),
                from_name: get("EMAIL_FROM_NAME").unwrap_or_else(|| "Clinic Assistant".to_string()),
            },
        })
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| AssistantError::Config(format!("{key}={value:?} is invalid: {e}")))
        })
        .transpose()
}
