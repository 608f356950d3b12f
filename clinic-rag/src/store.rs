//! Durable storage for per-user indexes.
//!
//! An index and its chunk texts are persisted together as one
//! [`PersistedIndex`] document, so they can never drift apart on disk. The
//! [`IndexStore`] trait abstracts over where that document lives.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::DocumentChunk;
use crate::error::{RagError, Result};
use crate::index::FlatIndex;

/// Current version of the persisted index format.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// The serialized form of a user's index: vectors and the parallel chunk texts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedIndex {
    /// Format version; readers reject versions they do not know.
    pub format_version: u32,
    /// The user the index belongs to.
    pub user_id: String,
    /// Dimensionality of every vector.
    pub dimensions: usize,
    /// Chunk texts, in the same order as `vectors`.
    pub chunks: Vec<String>,
    /// Flat vector array, one entry per chunk.
    pub vectors: Vec<Vec<f32>>,
}

impl PersistedIndex {
    /// Capture an index and its chunks for persistence.
    pub fn from_parts(user_id: &str, index: &FlatIndex, chunks: &[DocumentChunk]) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            user_id: user_id.to_string(),
            dimensions: index.dimensions(),
            chunks: chunks.iter().map(|c| c.text.clone()).collect(),
            vectors: index.vectors().to_vec(),
        }
    }

    /// Rebuild the index and chunks, validating that they belong together.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoadFailed`] on an unknown format version, a
    /// chunk/vector count mismatch, or inconsistent vector dimensions.
    pub fn into_parts(self) -> Result<(FlatIndex, Vec<DocumentChunk>)> {
        let user_id = self.user_id;
        let fail = |message: String| RagError::IndexLoadFailed { user_id: user_id.clone(), message };

        if self.format_version != INDEX_FORMAT_VERSION {
            return Err(fail(format!("unsupported format version {}", self.format_version)));
        }
        if self.chunks.len() != self.vectors.len() {
            return Err(fail(format!(
                "{} chunks but {} vectors",
                self.chunks.len(),
                self.vectors.len()
            )));
        }

        let index = FlatIndex::build(self.vectors).map_err(|e| fail(e.to_string()))?;
        if !index.is_empty() && index.dimensions() != self.dimensions {
            return Err(fail(format!(
                "header says {} dimensions, vectors have {}",
                self.dimensions,
                index.dimensions()
            )));
        }

        let chunks = self
            .chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| DocumentChunk::new(text, i))
            .collect();
        Ok((index, chunks))
    }
}

/// A storage backend for persisted indexes, keyed by user id.
///
/// Implementations must make [`save`](IndexStore::save) atomic: a reader
/// either sees the previous document or the new one, never a partial write.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Persist `index`, replacing any previous index for the same user.
    async fn save(&self, index: &PersistedIndex) -> Result<()>;

    /// Load the index for `user_id`, or `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexLoadFailed`] if a document exists but cannot
    /// be read or decoded.
    async fn load(&self, user_id: &str) -> Result<Option<PersistedIndex>>;
}

/// Stores each user's index as a JSON file under a root directory.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target.
#[derive(Debug)]
pub struct FileIndexStore {
    root: PathBuf,
    write_seq: AtomicU64,
}

impl FileIndexStore {
    /// Create a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_seq: AtomicU64::new(0) }
    }

    /// The root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the index document for `user_id`.
    ///
    /// Distinct user ids always map to distinct paths.
    pub fn index_path(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("user_{}.index.json", encode_user_id(user_id)))
    }

    fn store_error(message: String) -> RagError {
        RagError::IndexStoreError { backend: "File".to_string(), message }
    }
}

/// Encodes a user id for use in a file name.
///
/// ASCII alphanumerics and `-` pass through; every other byte, `_` included,
/// becomes `_` followed by two hex digits. The encoding is reversible, so
/// it never maps two ids to the same name.
fn encode_user_id(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02x}"));
        }
    }
    out
}

#[async_trait]
impl IndexStore for FileIndexStore {
    async fn save(&self, index: &PersistedIndex) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Self::store_error(format!("failed to create '{}': {e}", self.root.display()))
        })?;

        let path = self.index_path(&index.user_id);
        let content = serde_json::to_vec(index)
            .map_err(|e| Self::store_error(format!("failed to serialize index: {e}")))?;

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));

        if let Err(e) = tokio::fs::write(&tmp, &content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            error!(path = %tmp.display(), error = %e, "failed to write temporary index");
            return Err(Self::store_error(format!("failed to write '{}': {e}", tmp.display())));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            error!(path = %path.display(), error = %e, "failed to swap index into place");
            return Err(Self::store_error(format!("failed to replace '{}': {e}", path.display())));
        }

        debug!(user_id = %index.user_id, path = %path.display(), chunks = index.chunks.len(), "index saved");
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Option<PersistedIndex>> {
        let path = self.index_path(user_id);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RagError::IndexLoadFailed {
                    user_id: user_id.to_string(),
                    message: format!("failed to read '{}': {e}", path.display()),
                });
            }
        };

        let index: PersistedIndex =
            serde_json::from_slice(&content).map_err(|e| RagError::IndexLoadFailed {
                user_id: user_id.to_string(),
                message: format!("failed to decode '{}': {e}", path.display()),
            })?;

        if index.user_id != user_id {
            return Err(RagError::IndexLoadFailed {
                user_id: user_id.to_string(),
                message: format!("document belongs to user '{}'", index.user_id),
            });
        }
        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_ids_have_no_path_separators() {
        assert_eq!(encode_user_id("../etc/passwd"), "_2e_2e_2fetc_2fpasswd");
        assert_eq!(encode_user_id("user-42"), "user-42");
        assert_eq!(encode_user_id(""), "");
    }

    #[test]
    fn similar_ids_get_distinct_paths() {
        let store = FileIndexStore::new("/indexes");
        let ids = ["a.b", "a_b", "a b", "../x", "___x", "_2e", ".", "é"];
        let paths: std::collections::HashSet<PathBuf> = ids.iter().map(|id| store.index_path(id)).collect();
        assert_eq!(paths.len(), ids.len());
    }

    #[test]
    fn mismatched_parts_fail_to_load() {
        let persisted = PersistedIndex {
            format_version: INDEX_FORMAT_VERSION,
            user_id: "u1".to_string(),
            dimensions: 2,
            chunks: vec!["a".to_string(), "b".to_string()],
            vectors: vec![vec![1.0, 0.0]],
        };
        let err = persisted.into_parts().unwrap_err();
        assert!(matches!(err, RagError::IndexLoadFailed { .. }));
    }

    #[test]
    fn unknown_version_fails_to_load() {
        let persisted = PersistedIndex {
            format_version: 99,
            user_id: "u1".to_string(),
            dimensions: 1,
            chunks: vec!["a".to_string()],
            vectors: vec![vec![1.0]],
        };
        assert!(persisted.into_parts().is_err());
    }
}
