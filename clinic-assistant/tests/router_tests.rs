//! End-to-end routing tests for the assistant.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use clinic_assistant::{
    AnswerGenerator, AssistantError, ChatMessage, ClinicAssistant, EMERGENCY_RESPONSE, ReplyKind, Role,
    UNCONFIGURED_REPLY,
};
use clinic_booking::{BookingState, InMemoryBookingStore, InMemoryUploadStore, PatientProfile};
use clinic_rag::{BuildOutcome, HashingEmbeddingProvider, InMemoryIndexStore, IndexStatus, RagConfig};
use tokio::sync::Mutex;

const DOCUMENT: &str = "whitening gel brightens enamel over several short visits \
flossing daily removes plaque between teeth and gums \
braces straighten crooked smiles within twelve to eighteen";

/// Records what the router passed to the answer generator.
#[derive(Default)]
struct RecordingAnswers {
    calls: Mutex<Vec<(String, Vec<ChatMessage>, Vec<String>)>>,
}

#[async_trait]
impl AnswerGenerator for RecordingAnswers {
    async fn generate_answer(&self, query: &str, history: &[ChatMessage], chunks: &[String]) -> String {
        self.calls.lock().await.push((query.to_string(), history.to_vec(), chunks.to_vec()));
        format!("answer to {query}")
    }
}

struct Harness {
    assistant: ClinicAssistant,
    bookings: Arc<InMemoryBookingStore>,
    uploads: Arc<InMemoryUploadStore>,
    answers: Arc<RecordingAnswers>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let bookings = Arc::new(InMemoryBookingStore::new());
    let uploads = Arc::new(InMemoryUploadStore::new());
    let answers = Arc::new(RecordingAnswers::default());
    let assistant = ClinicAssistant::builder()
        .booking_store(bookings.clone())
        .index_store(Arc::new(InMemoryIndexStore::new()))
        .embedding_provider(Arc::new(HashingEmbeddingProvider::new(256)))
        .answer_generator(answers.clone())
        .rag_config(RagConfig::builder().chunk_size(8).chunk_overlap(0).top_k(2).build().unwrap())
        .today(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        .upload_dir(dir.path().join("uploads"))
        .upload_store(uploads.clone())
        .build()
        .unwrap();
    Harness { assistant, bookings, uploads, answers, _dir: dir }
}

fn patient() -> PatientProfile {
    PatientProfile::new("patient-1", "Dana Smith", "dana@example.com").with_phone("5551234567")
}

fn write_doc(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn questions_are_answered_with_retrieved_context() {
    let h = harness();
    let docs = tempfile::tempdir().unwrap();
    let path = write_doc(&docs, "care-guide.txt", DOCUMENT);

    let report = h.assistant.ingest_documents("patient-1", &[path]).await.unwrap();
    assert_eq!(report.stored, 1);
    assert_eq!(report.readable, 1);
    assert_eq!(report.outcome, Some(BuildOutcome::Indexed { chunks: 3 }));

    let session = h.assistant.start_session().await;
    let reply = h.assistant.handle_message(&session, &patient(), "does flossing remove plaque").await;
    assert_eq!(reply.text, "answer to does flossing remove plaque");
    assert_eq!(reply.kind, ReplyKind::Answer { context_chunks: 2 });

    let calls = h.answers.calls.lock().await;
    let (query, history, chunks) = &calls[0];
    assert_eq!(query, "does flossing remove plaque");
    assert_eq!(history.last().map(|m| m.role), Some(Role::User));
    assert!(chunks[0].starts_with("flossing daily removes plaque"));
}

#[tokio::test]
async fn questions_without_documents_get_no_context() {
    let h = harness();
    let session = h.assistant.start_session().await;

    let reply = h.assistant.handle_message(&session, &patient(), "how long does whitening last").await;
    assert_eq!(reply.kind, ReplyKind::Answer { context_chunks: 0 });
    assert!(h.answers.calls.lock().await[0].2.is_empty());
    assert_eq!(h.assistant.index_status("patient-1").await.unwrap(), IndexStatus::Empty);
}

#[tokio::test]
async fn booking_conversation_commits_through_router() {
    let h = harness();
    let session = h.assistant.start_session().await;
    let profile = patient();

    let first = h.assistant.handle_message(&session, &profile, "I'd like to book an appointment").await;
    assert_eq!(first.kind, ReplyKind::Booking { state: BookingState::CollectingType, booking_id: None });

    for message in ["Cleaning", "2025-07-01", "10:00"] {
        h.assistant.handle_message(&session, &profile, message).await;
    }
    let done = h.assistant.handle_message(&session, &profile, "yes").await;
    let ReplyKind::Booking { state: BookingState::Committed, booking_id: Some(id) } = done.kind else {
        panic!("expected a committed booking, got {:?}", done.kind);
    };
    assert_eq!(h.bookings.get(id).await.map(|b| b.user_id), Some("patient-1".to_string()));

    // Nothing about the booking reached the answer generator.
    assert!(h.answers.calls.lock().await.is_empty());

    let after = h.assistant.handle_message(&session, &profile, "thanks, what about whitening?").await;
    assert!(matches!(after.kind, ReplyKind::Answer { .. }));
}

#[tokio::test]
async fn emergency_interrupts_booking_without_losing_it() {
    let h = harness();
    let session = h.assistant.start_session().await;
    let profile = patient();

    h.assistant.handle_message(&session, &profile, "book appointment").await;
    h.assistant.handle_message(&session, &profile, "Extraction").await;

    let reply = h.assistant.handle_message(&session, &profile, "my gum is bleeding a lot").await;
    assert_eq!(reply.kind, ReplyKind::Emergency);
    assert_eq!(reply.text, EMERGENCY_RESPONSE);

    let resumed = h.assistant.handle_message(&session, &profile, "2025-07-02").await;
    assert_eq!(resumed.kind, ReplyKind::Booking { state: BookingState::CollectingTime, booking_id: None });
}

#[tokio::test]
async fn sessions_do_not_share_booking_state() {
    let h = harness();
    let first = h.assistant.start_session().await;
    let second = h.assistant.start_session().await;
    let profile = patient();

    h.assistant.handle_message(&first, &profile, "schedule a visit").await;
    let reply = h.assistant.handle_message(&second, &profile, "Cleaning").await;
    assert_eq!(reply.kind, ReplyKind::Answer { context_chunks: 0 });

    let history_len = {
        let session = h.assistant.sessions().get(&second).await.unwrap();
        let session = session.lock().await;
        session.history().len()
    };
    assert_eq!(history_len, 2);
}

#[tokio::test]
async fn unreadable_documents_are_recorded_but_not_indexed() {
    let h = harness();
    let docs = tempfile::tempdir().unwrap();
    let empty = write_doc(&docs, "scan.txt", "   \n  ");

    let report = h.assistant.ingest_documents("patient-1", &[empty]).await.unwrap();
    assert_eq!(report.stored, 1);
    assert_eq!(report.readable, 0);
    assert_eq!(report.outcome, None);

    let uploads = h.uploads.uploads_for("patient-1").await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].original_name, "scan.txt");
    assert!(uploads[0].path.exists());
    assert_eq!(h.assistant.index_status("patient-1").await.unwrap(), IndexStatus::Empty);
}

#[tokio::test]
async fn fallback_generator_is_the_default() {
    let assistant = ClinicAssistant::builder()
        .booking_store(Arc::new(InMemoryBookingStore::new()))
        .index_store(Arc::new(InMemoryIndexStore::new()))
        .build()
        .unwrap();
    let session = assistant.start_session().await;

    let reply = assistant.handle_message(&session, &patient(), "is whitening safe?").await;
    assert_eq!(reply.text, UNCONFIGURED_REPLY);

    let err = assistant.ingest_documents("patient-1", &[]).await.unwrap_err();
    assert!(matches!(err, AssistantError::Config(_)));
}

#[tokio::test]
async fn builder_requires_stores() {
    let err = ClinicAssistant::builder().build().err().unwrap();
    assert!(matches!(err, AssistantError::Config(message) if message.contains("booking_store")));
}

#[tokio::test]
async fn missing_file_is_skipped_without_losing_the_batch() {
    let h = harness();
    let docs = tempfile::tempdir().unwrap();
    let missing = docs.path().join("lost.txt");
    let guide = write_doc(&docs, "care-guide.txt", DOCUMENT);

    let report = h.assistant.ingest_documents("patient-1", &[missing.clone(), guide]).await.unwrap();
    assert_eq!(report.skipped, vec![missing]);
    assert_eq!(report.stored, 1);
    assert_eq!(report.readable, 1);
    assert_eq!(report.outcome, Some(BuildOutcome::Indexed { chunks: 3 }));
    assert_eq!(h.uploads.uploads_for("patient-1").await.len(), 1);
}

#[tokio::test]
async fn each_ingest_replaces_the_previous_documents() {
    let h = harness();
    let docs = tempfile::tempdir().unwrap();
    let guide = write_doc(&docs, "care-guide.txt", DOCUMENT);
    let implants = write_doc(&docs, "implants.txt", "implants replace missing teeth with titanium posts");

    h.assistant.ingest_documents("patient-1", &[guide]).await.unwrap();
    assert_eq!(h.assistant.index_status("patient-1").await.unwrap(), IndexStatus::Ready { chunks: 3 });

    h.assistant.ingest_documents("patient-1", &[implants]).await.unwrap();
    assert_eq!(h.assistant.index_status("patient-1").await.unwrap(), IndexStatus::Ready { chunks: 1 });
    assert_eq!(h.uploads.uploads_for("patient-1").await.len(), 2);
}
