//! Turning uploaded documents into a patient's retrieval index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clinic_booking::UploadStore;
use clinic_rag::{BuildOutcome, RetrievalPipeline};
use tracing::{error, info, warn};

use crate::error::Result;

/// Longest sanitized file name kept when storing an upload.
const MAX_STORED_NAME: usize = 50;

/// Pulls plain text out of a document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the document's text, or an empty string when it cannot be
    /// read.
    async fn extract_text(&self, path: &Path) -> String;
}

/// Reads UTF-8 text files, replacing invalid sequences.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        match tokio::fs::read(path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read document");
                String::new()
            }
        }
    }
}

/// Reads PDF documents with `pdf-extract`.
///
/// Extraction runs on the blocking pool. Malformed files, including ones
/// that make the parser panic, yield an empty string.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned)).await {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Could not extract PDF text");
                String::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "PDF extraction aborted");
                String::new()
            }
        }
    }
}

/// Chooses a reader by file extension: `.pdf` files go through the PDF
/// reader, everything else is read as plain text.
///
/// Without the `pdf` feature PDFs are reported as unreadable rather than
/// read as text.
#[derive(Debug, Clone, Default)]
pub struct DocumentTextExtractor;

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract_text(&self, path: &Path) -> String {
        if is_pdf(path) {
            return extract_pdf(path).await;
        }
        PlainTextExtractor.extract_text(path).await
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(feature = "pdf")]
async fn extract_pdf(path: &Path) -> String {
    PdfTextExtractor.extract_text(path).await
}

#[cfg(not(feature = "pdf"))]
async fn extract_pdf(path: &Path) -> String {
    warn!(path = %path.display(), "PDF support is not built in; enable the `pdf` feature");
    String::new()
}

/// What an ingestion run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents copied into the upload directory.
    pub stored: usize,
    /// Input paths that could not be copied and were left out.
    pub skipped: Vec<PathBuf>,
    /// Documents that yielded any text.
    pub readable: usize,
    /// Index build result, absent when no document had text.
    pub outcome: Option<BuildOutcome>,
}

/// Stores uploads, records them, and rebuilds the patient's index from
/// their combined text.
pub struct DocumentIngestor {
    upload_dir: PathBuf,
    extractor: Arc<dyn TextExtractor>,
    uploads: Arc<dyn UploadStore>,
}

impl DocumentIngestor {
    pub fn new(upload_dir: impl Into<PathBuf>, extractor: Arc<dyn TextExtractor>, uploads: Arc<dyn UploadStore>) -> Self {
        Self { upload_dir: upload_dir.into(), extractor, uploads }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Ingests `paths` for the pipeline's user.
    ///
    /// Every document is copied and recorded, whether or not it has text.
    /// A document that cannot be copied is skipped and listed in the report.
    /// The index is rebuilt from the readable documents of this call alone,
    /// replacing the previous one, and only when at least one is readable.
    ///
    /// # Errors
    ///
    /// Returns an error when the upload directory cannot be created or the
    /// index cannot be persisted.
    pub async fn ingest(&self, pipeline: &RetrievalPipeline, paths: &[PathBuf]) -> Result<IngestReport> {
        let user_id = pipeline.user_id();
        tokio::fs::create_dir_all(&self.upload_dir).await?;

        let mut texts = Vec::new();
        let mut stored = 0;
        let mut skipped = Vec::new();
        for path in paths {
            let original_name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
            let stored_path = self.upload_dir.join(stored_file_name(user_id, &original_name));
            if let Err(e) = tokio::fs::copy(path, &stored_path).await {
                warn!(user_id, path = %path.display(), error = %e, "Could not store document, skipping it");
                skipped.push(path.clone());
                continue;
            }
            stored += 1;

            if let Err(e) = self.uploads.save_upload(user_id, &stored_path, &original_name).await {
                error!(user_id, file = %original_name, error = %e, "Failed to record upload");
            }

            let text = self.extractor.extract_text(&stored_path).await;
            if text.trim().is_empty() {
                warn!(user_id, file = %original_name, "No readable text in document");
            } else {
                texts.push(text);
            }
        }

        if texts.is_empty() {
            return Ok(IngestReport { stored, skipped, readable: 0, outcome: None });
        }

        let outcome = pipeline.build_index(&texts.join("\n\n")).await?;
        info!(user_id, documents = texts.len(), outcome = ?outcome, "Ingested documents");
        Ok(IngestReport { stored, skipped, readable: texts.len(), outcome: Some(outcome) })
    }
}

/// `{user}_{timestamp}_{name}`, with the name reduced to alphanumerics and
/// `._- ` and cut to its last [`MAX_STORED_NAME`] characters.
fn stored_file_name(user_id: &str, original_name: &str) -> String {
    let safe: Vec<char> =
        original_name.chars().filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ')).collect();
    let start = safe.len().saturating_sub(MAX_STORED_NAME);
    let safe_name: String = safe[start..].iter().collect();
    let safe_user: String = user_id.chars().filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-')).collect();
    format!("{safe_user}_{}_{safe_name}", Utc::now().format("%Y%m%d%H%M%S%3f"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_are_sanitized_and_truncated() {
        let name = stored_file_name("u/1", "../../etc/passwd?.txt");
        assert!(name.starts_with("u1_"));
        assert!(name.ends_with("....etcpasswd.txt"));
        assert!(!name.contains('/'));

        let long = format!("{}.txt", "a".repeat(80));
        let name = stored_file_name("u1", &long);
        let suffix = name.rsplit_once('_').map(|(_, suffix)| suffix).unwrap();
        assert_eq!(suffix.chars().count(), MAX_STORED_NAME);
        assert!(suffix.ends_with(".txt"));
    }

    #[tokio::test]
    async fn unreadable_file_yields_empty_text() {
        let text = PlainTextExtractor.extract_text(Path::new("/definitely/not/here.txt")).await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn text_files_are_read_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.TXT");
        std::fs::write(&notes, "  brush twice a day \n").unwrap();
        assert_eq!(DocumentTextExtractor.extract_text(&notes).await, "brush twice a day");
    }

    #[tokio::test]
    async fn corrupt_pdf_yields_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let scan = dir.path().join("scan.PDF");
        std::fs::write(&scan, b"%PDF-1.4\nthis is not a real pdf body\n").unwrap();
        assert!(DocumentTextExtractor.extract_text(&scan).await.is_empty());
        assert!(DocumentTextExtractor.extract_text(&dir.path().join("missing.pdf")).await.is_empty());
    }

    #[cfg(feature = "pdf")]
    #[tokio::test]
    async fn pdf_reader_reports_corrupt_files_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scan = dir.path().join("scan.pdf");
        std::fs::write(&scan, [0u8, 159, 146, 150]).unwrap();
        assert!(PdfTextExtractor.extract_text(&scan).await.is_empty());
    }
}
