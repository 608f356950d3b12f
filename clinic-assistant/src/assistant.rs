//! The message router tying triage, booking and retrieval together.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use clinic_booking::{
    BookingFlow, BookingId, BookingNotifier, BookingState, BookingStore, InMemoryUploadStore, LogNotifier,
    PatientProfile, UploadStore,
};
use clinic_rag::{EmbeddingProvider, IndexStatus, IndexStore, RagConfig, RetrievalPipeline};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::answer::{AnswerGenerator, FallbackAnswerGenerator};
use crate::config::DEFAULT_SESSION_TTL;
use crate::error::{AssistantError, Result};
use crate::ingest::{DocumentIngestor, DocumentTextExtractor, IngestReport, TextExtractor};
use crate::session::{ChatMessage, SessionId, SessionStore};
use crate::triage::{EMERGENCY_RESPONSE, Route, route};

/// How a reply was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    Emergency,
    Booking {
        /// State reached by the booking turn.
        state: BookingState,
        booking_id: Option<BookingId>,
    },
    Answer {
        /// Number of retrieved chunks passed to the answer generator.
        context_chunks: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
}

/// The patient-facing assistant.
///
/// Every message is checked for emergencies first. Messages that belong to
/// a booking in progress, or that ask to book, go to the booking dialogue.
/// Everything else is answered from the patient's own documents.
pub struct ClinicAssistant {
    sessions: SessionStore,
    flow: BookingFlow,
    answers: Arc<dyn AnswerGenerator>,
    index_store: Arc<dyn IndexStore>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    rag_config: RagConfig,
    ingestor: Option<DocumentIngestor>,
    pipelines: RwLock<HashMap<String, Arc<RetrievalPipeline>>>,
}

impl ClinicAssistant {
    pub fn builder() -> ClinicAssistantBuilder {
        ClinicAssistantBuilder::default()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn start_session(&self) -> SessionId {
        self.sessions.create().await
    }

    /// Handles one patient message in the conversation `session_id`.
    ///
    /// Turns never fail: collaborator errors surface as reply text.
    pub async fn handle_message(&self, session_id: &str, profile: &PatientProfile, message: &str) -> Reply {
        let session = self.sessions.get_or_create(session_id).await;
        let mut session = session.lock().await;
        session.push(ChatMessage::user(message));

        let reply = match route(message, session.booking.is_active()) {
            Route::Emergency => {
                warn!(user_id = %profile.user_id, session_id, "Emergency keywords detected");
                Reply { text: EMERGENCY_RESPONSE.to_string(), kind: ReplyKind::Emergency }
            }
            Route::Booking => {
                let turn = self.flow.handle(&mut session.booking, profile, message).await;
                Reply { text: turn.reply, kind: ReplyKind::Booking { state: turn.state, booking_id: turn.booking_id } }
            }
            Route::Question => {
                let chunks = self.retrieve_context(&profile.user_id, message).await;
                let text = self.answers.generate_answer(message, session.history(), &chunks).await;
                Reply { text, kind: ReplyKind::Answer { context_chunks: chunks.len() } }
            }
        };

        debug!(session_id, kind = ?reply.kind, "Replied");
        session.push(ChatMessage::assistant(reply.text.clone()));
        reply
    }

    async fn retrieve_context(&self, user_id: &str, query: &str) -> Vec<String> {
        match self.pipeline_for(user_id).await {
            Ok(pipeline) => pipeline.retrieve(query).await,
            Err(e) => {
                warn!(user_id, error = %e, "Retrieval unavailable, answering without context");
                Vec::new()
            }
        }
    }

    /// The retrieval pipeline for `user_id`, opened on first use.
    pub async fn pipeline_for(&self, user_id: &str) -> Result<Arc<RetrievalPipeline>> {
        if let Some(pipeline) = self.pipelines.read().await.get(user_id) {
            return Ok(pipeline.clone());
        }

        let opened = RetrievalPipeline::builder()
            .user_id(user_id)
            .config(self.rag_config.clone())
            .maybe_embedding_provider(self.embedding_provider.clone())
            .index_store(self.index_store.clone())
            .open()
            .await?;

        let mut pipelines = self.pipelines.write().await;
        let pipeline = pipelines.entry(user_id.to_string()).or_insert_with(|| Arc::new(opened));
        Ok(pipeline.clone())
    }

    pub async fn index_status(&self, user_id: &str) -> Result<IndexStatus> {
        Ok(self.pipeline_for(user_id).await?.status().await)
    }

    /// Stores `paths` as the patient's documents and rebuilds their index
    /// from them, replacing whatever was indexed before.
    pub async fn ingest_documents(&self, user_id: &str, paths: &[PathBuf]) -> Result<IngestReport> {
        let ingestor = self
            .ingestor
            .as_ref()
            .ok_or_else(|| AssistantError::Config("no upload directory configured".to_string()))?;
        let pipeline = self.pipeline_for(user_id).await?;
        let report = ingestor.ingest(&pipeline, paths).await?;
        info!(user_id, stored = report.stored, readable = report.readable, "Documents ingested");
        Ok(report)
    }
}

/// Builder for [`ClinicAssistant`].
///
/// `booking_store` and `index_store` are required. Without an embedding
/// provider retrieval is disabled; without an upload directory ingestion
/// is disabled.
#[derive(Default)]
pub struct ClinicAssistantBuilder {
    booking_store: Option<Arc<dyn BookingStore>>,
    notifier: Option<Arc<dyn BookingNotifier>>,
    index_store: Option<Arc<dyn IndexStore>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    answer_generator: Option<Arc<dyn AnswerGenerator>>,
    rag_config: Option<RagConfig>,
    session_ttl: Option<Duration>,
    today: Option<NaiveDate>,
    upload_dir: Option<PathBuf>,
    text_extractor: Option<Arc<dyn TextExtractor>>,
    upload_store: Option<Arc<dyn UploadStore>>,
}

impl ClinicAssistantBuilder {
    pub fn booking_store(mut self, store: Arc<dyn BookingStore>) -> Self {
        self.booking_store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn BookingNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn index_store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.index_store = Some(store);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn answer_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.answer_generator = Some(generator);
        self
    }

    pub fn rag_config(mut self, config: RagConfig) -> Self {
        self.rag_config = Some(config);
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Pins the booking calendar's current date.
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn text_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.text_extractor = Some(extractor);
        self
    }

    pub fn upload_store(mut self, store: Arc<dyn UploadStore>) -> Self {
        self.upload_store = Some(store);
        self
    }

    pub fn build(self) -> Result<ClinicAssistant> {
        let booking_store =
            self.booking_store.ok_or_else(|| AssistantError::Config("booking_store is required".to_string()))?;
        let index_store =
            self.index_store.ok_or_else(|| AssistantError::Config("index_store is required".to_string()))?;
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier::new()));

        let mut flow = BookingFlow::new(booking_store, notifier);
        if let Some(today) = self.today {
            flow = flow.with_today(today);
        }

        let extractor = self.text_extractor.unwrap_or_else(|| Arc::new(DocumentTextExtractor));
        let uploads = self.upload_store.unwrap_or_else(|| Arc::new(InMemoryUploadStore::new()));
        let ingestor = self.upload_dir.map(|dir| DocumentIngestor::new(dir, extractor, uploads));

        Ok(ClinicAssistant {
            sessions: SessionStore::new(self.session_ttl.unwrap_or(DEFAULT_SESSION_TTL)),
            flow,
            answers: self.answer_generator.unwrap_or_else(|| Arc::new(FallbackAnswerGenerator)),
            index_store,
            embedding_provider: self.embedding_provider,
            rag_config: self.rag_config.unwrap_or_default(),
            ingestor,
            pipelines: RwLock::new(HashMap::new()),
        })
    }
}
