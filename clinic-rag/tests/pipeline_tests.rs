//! Integration tests for the per-user retrieval pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use clinic_rag::{
    BuildOutcome, EmbeddingProvider, FileIndexStore, HashingEmbeddingProvider, InMemoryIndexStore,
    IndexStatus, IndexStore, NoDocumentsReason, PersistedIndex, RagConfig, RagError,
    RetrievalPipeline,
};

const DOCUMENT: &str = "\
Whitening treatments lighten stains on enamel and usually last one to three years. \
Avoid coffee and red wine for two days after whitening. \
Root canal therapy removes infected pulp from inside the tooth. \
After a root canal the tooth may feel tender for a few days. \
Flossing once a day removes plaque between teeth where brushes cannot reach. \
Children should see a dentist by their first birthday.";

fn small_config() -> RagConfig {
    RagConfig::builder().chunk_size(12).chunk_overlap(3).top_k(2).build().unwrap()
}

fn embedder() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashingEmbeddingProvider::new(128))
}

async fn pipeline_with(store: Arc<dyn IndexStore>) -> RetrievalPipeline {
    RetrievalPipeline::builder()
        .user_id("patient-1")
        .config(small_config())
        .embedding_provider(embedder())
        .index_store(store)
        .open()
        .await
        .unwrap()
}

/// An embedder whose model is never reachable.
struct OfflineEmbedder;

#[async_trait]
impl EmbeddingProvider for OfflineEmbedder {
    async fn embed(&self, _text: &str) -> clinic_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingUnavailable)
    }

    fn dimensions(&self) -> usize {
        128
    }
}

/// An index store that can be switched into a failing mode.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryIndexStore,
    failing: AtomicBool,
}

#[async_trait]
impl IndexStore for FlakyStore {
    async fn save(&self, index: &PersistedIndex) -> clinic_rag::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RagError::IndexStoreError {
                backend: "Flaky".to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.save(index).await
    }

    async fn load(&self, user_id: &str) -> clinic_rag::Result<Option<PersistedIndex>> {
        self.inner.load(user_id).await
    }
}

#[tokio::test]
async fn retrieve_without_index_is_empty() {
    let pipeline = pipeline_with(Arc::new(InMemoryIndexStore::new())).await;
    assert_eq!(pipeline.status().await, IndexStatus::Empty);
    assert!(pipeline.retrieve("whitening").await.is_empty());
}

#[tokio::test]
async fn build_then_retrieve_returns_relevant_chunks() {
    let pipeline = pipeline_with(Arc::new(InMemoryIndexStore::new())).await;

    let outcome = pipeline.build_index(DOCUMENT).await.unwrap();
    let BuildOutcome::Indexed { chunks } = outcome else {
        panic!("expected an index, got {outcome:?}");
    };
    assert!(chunks > 2);
    assert_eq!(pipeline.status().await, IndexStatus::Ready { chunks });

    let results = pipeline.retrieve("root canal tender").await;
    assert_eq!(results.len(), 2);
    assert!(results[0].contains("root canal") || results[0].contains("Root canal"));
}

#[tokio::test]
async fn retrieve_is_idempotent() {
    let pipeline = pipeline_with(Arc::new(InMemoryIndexStore::new())).await;
    pipeline.build_index(DOCUMENT).await.unwrap();

    let first = pipeline.retrieve_k("whitening coffee", 3).await;
    let second = pipeline.retrieve_k("whitening coffee", 3).await;
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[tokio::test]
async fn empty_text_indexes_nothing() {
    let pipeline = pipeline_with(Arc::new(InMemoryIndexStore::new())).await;
    let outcome = pipeline.build_index("  \n ").await.unwrap();
    assert_eq!(outcome, BuildOutcome::NoDocuments(NoDocumentsReason::EmptyText));
    assert_eq!(pipeline.status().await, IndexStatus::Empty);
}

#[tokio::test]
async fn missing_embedder_disables_retrieval() {
    let store = Arc::new(InMemoryIndexStore::new());
    let pipeline = RetrievalPipeline::builder()
        .user_id("patient-1")
        .config(small_config())
        .index_store(store.clone())
        .open()
        .await
        .unwrap();

    let outcome = pipeline.build_index(DOCUMENT).await.unwrap();
    assert_eq!(outcome, BuildOutcome::NoDocuments(NoDocumentsReason::EmbeddingUnavailable));
    assert!(store.is_empty().await);
    assert!(pipeline.retrieve("whitening").await.is_empty());
}

#[tokio::test]
async fn unavailable_embedder_keeps_previous_index() {
    let store = Arc::new(InMemoryIndexStore::new());
    let first = pipeline_with(store.clone()).await;
    first.build_index(DOCUMENT).await.unwrap();
    let before = store.load("patient-1").await.unwrap().unwrap();

    let offline = RetrievalPipeline::builder()
        .user_id("patient-1")
        .config(small_config())
        .embedding_provider(Arc::new(OfflineEmbedder))
        .index_store(store.clone())
        .open()
        .await
        .unwrap();
    assert!(matches!(offline.status().await, IndexStatus::Ready { .. }));

    let outcome = offline.build_index("completely different text").await.unwrap();
    assert_eq!(outcome, BuildOutcome::NoDocuments(NoDocumentsReason::EmbeddingUnavailable));
    assert_eq!(store.load("patient-1").await.unwrap().unwrap(), before);
    assert!(offline.retrieve("whitening").await.is_empty());
}

#[tokio::test]
async fn failed_save_keeps_serving_previous_index() {
    let store = Arc::new(FlakyStore::default());
    let pipeline = pipeline_with(store.clone()).await;
    pipeline.build_index(DOCUMENT).await.unwrap();
    let before = pipeline.retrieve("flossing plaque").await;

    store.failing.store(true, Ordering::SeqCst);
    let err = pipeline.build_index("a brand new document about braces").await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)));

    assert_eq!(pipeline.retrieve("flossing plaque").await, before);
}

#[tokio::test]
async fn file_store_round_trips_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileIndexStore::new(dir.path()));

    let pipeline = pipeline_with(store.clone()).await;
    pipeline.build_index(DOCUMENT).await.unwrap();
    let expected = pipeline.retrieve("first birthday dentist").await;
    assert!(store.index_path("patient-1").exists());

    let reopened = pipeline_with(Arc::new(FileIndexStore::new(dir.path()))).await;
    assert!(matches!(reopened.status().await, IndexStatus::Ready { .. }));
    assert_eq!(reopened.retrieve("first birthday dentist").await, expected);
}

#[tokio::test]
async fn users_with_similar_ids_keep_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn IndexStore> = Arc::new(FileIndexStore::new(dir.path()));
    let open = |user_id: &'static str| {
        RetrievalPipeline::builder()
            .user_id(user_id)
            .config(small_config())
            .embedding_provider(embedder())
            .index_store(store.clone())
            .open()
    };

    let dotted = open("a.b").await.unwrap();
    dotted.build_index(DOCUMENT).await.unwrap();
    let underscored = open("a_b").await.unwrap();
    assert_eq!(underscored.status().await, IndexStatus::Empty);
    underscored.build_index("implants replace missing teeth with titanium posts").await.unwrap();

    assert!(matches!(dotted.reload().await, IndexStatus::Ready { .. }));
    assert_eq!(underscored.reload().await, IndexStatus::Ready { chunks: 1 });
    assert!(dotted.retrieve("root canal tender").await[0].to_lowercase().contains("root canal"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn rebuild_replaces_file_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileIndexStore::new(dir.path()));
    let pipeline = pipeline_with(store.clone()).await;

    pipeline.build_index(DOCUMENT).await.unwrap();
    pipeline.build_index("implants replace missing teeth with titanium posts").await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let results = pipeline.retrieve("titanium implants").await;
    assert_eq!(results, vec!["implants replace missing teeth with titanium posts".to_string()]);
}

#[tokio::test]
async fn corrupt_file_reports_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileIndexStore::new(dir.path());
    std::fs::write(store.index_path("patient-1"), b"{ not json").unwrap();

    let pipeline = pipeline_with(Arc::new(store)).await;
    assert!(matches!(pipeline.status().await, IndexStatus::LoadFailed { .. }));
    assert!(pipeline.retrieve("whitening").await.is_empty());

    // A successful rebuild recovers from the failed load.
    pipeline.build_index(DOCUMENT).await.unwrap();
    assert!(matches!(pipeline.status().await, IndexStatus::Ready { .. }));
}

#[tokio::test]
async fn dimension_change_is_a_load_failure() {
    let store = Arc::new(InMemoryIndexStore::new());
    pipeline_with(store.clone()).await.build_index(DOCUMENT).await.unwrap();

    let other = RetrievalPipeline::builder()
        .user_id("patient-1")
        .embedding_provider(Arc::new(HashingEmbeddingProvider::new(64)))
        .index_store(store)
        .open()
        .await
        .unwrap();
    assert!(matches!(other.status().await, IndexStatus::LoadFailed { .. }));
}

#[tokio::test]
async fn builder_requires_user_and_store() {
    let err = RetrievalPipeline::builder().build().unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}
