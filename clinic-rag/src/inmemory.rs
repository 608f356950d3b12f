//! In-memory index store.
//!
//! [`InMemoryIndexStore`] keeps persisted indexes in a `HashMap` behind a
//! `tokio::sync::RwLock`. Replacing an entry is a single map insert, so
//! readers never observe a partial index. Suitable for tests and ephemeral
//! sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::{IndexStore, PersistedIndex};

/// An index store that lives for the duration of the process.
///
/// # Example
///
/// ```rust,ignore
/// use clinic_rag::{InMemoryIndexStore, IndexStore};
///
/// let store = InMemoryIndexStore::new();
/// store.save(&persisted).await?;
/// assert!(store.load("user-1").await?.is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryIndexStore {
    indexes: RwLock<HashMap<String, PersistedIndex>>,
}

impl InMemoryIndexStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a saved index.
    pub async fn len(&self) -> usize {
        self.indexes.read().await.len()
    }

    /// Whether no index has been saved.
    pub async fn is_empty(&self) -> bool {
        self.indexes.read().await.is_empty()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn save(&self, index: &PersistedIndex) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        indexes.insert(index.user_id.clone(), index.clone());
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Option<PersistedIndex>> {
        let indexes = self.indexes.read().await;
        Ok(indexes.get(user_id).cloned())
    }
}
