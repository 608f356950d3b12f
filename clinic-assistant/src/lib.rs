//! Patient-facing assistant for Smiles Dental Care.
//!
//! [`ClinicAssistant`] routes each message: emergencies get an immediate
//! safety response, booking requests run through the
//! [`clinic_booking`] dialogue, and other questions are answered by an
//! [`AnswerGenerator`] grounded in the patient's uploaded documents via
//! [`clinic_rag`].
//!
//! # Features
//!
//! - `groq`: [`groq::ChatCompletionsAnswerGenerator`]
//! - `openai`: hosted embeddings through `clinic-rag`
//! - `smtp`: emailed booking confirmations through `clinic-booking`
//! - `pdf`: PDF text extraction for uploaded documents

pub mod answer;
pub mod assistant;
pub mod config;
pub mod error;
pub mod ingest;
pub mod session;
pub mod telemetry;
pub mod triage;

#[cfg(feature = "groq")]
pub mod groq;

pub use answer::{AnswerGenerator, FallbackAnswerGenerator, UNCONFIGURED_REPLY};
pub use assistant::{ClinicAssistant, ClinicAssistantBuilder, Reply, ReplyKind};
pub use config::{AssistantConfig, ChatSettings, EmailSettings, EmbeddingSettings};
pub use error::{AssistantError, Result};
pub use ingest::{DocumentIngestor, DocumentTextExtractor, IngestReport, PlainTextExtractor, TextExtractor};
pub use session::{ChatMessage, ConversationSession, MAX_HISTORY, Role, SessionId, SessionStore};
pub use triage::{EMERGENCY_KEYWORDS, EMERGENCY_RESPONSE, Route, is_emergency, route};

#[cfg(feature = "pdf")]
pub use ingest::PdfTextExtractor;
