//! Data-access collaborator: the four todo operations and an in-process store.
//!
//! The service only ever talks to storage through [`TodoStore`]. [`MemoryStore`]
//! is the implementation the binary runs with; it behaves like a single table with
//! an auto-increment key and a bounded `item` column.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Server-assigned todo identifier.
pub type TodoId = u64;

/// Longest `item` the in-process store accepts, in characters.
pub const MAX_ITEM_LEN: usize = 255;

/// A stored todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub item: String,
}

/// Failures reported by a [`TodoStore`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated: {0}")]
    Constraint(String),
}

/// The operations the service needs from storage.
///
/// Implementations apply their own timeout policy; callers never retry.
pub trait TodoStore: Send + Sync + 'static {
    /// All todos, ordered by id.
    fn list(&self) -> impl Future<Output = Result<Vec<Todo>, StoreError>> + Send;

    fn get_by_id(&self, id: TodoId) -> impl Future<Output = Result<Option<Todo>, StoreError>> + Send;

    /// Stores `item` and returns the id assigned to it.
    fn insert(&self, item: &str) -> impl Future<Output = Result<TodoId, StoreError>> + Send;

    /// Removes the todo with `id`, returning how many rows went away (0 or 1).
    fn delete_by_id(&self, id: TodoId) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// Process-local [`TodoStore`] backed by an ordered map.
#[derive(Debug)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<TodoId, String>>,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl TodoStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .map(|(id, item)| Todo {
                id: *id,
                item: item.clone(),
            })
            .collect())
    }

    async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).map(|item| Todo {
            id,
            item: item.clone(),
        }))
    }

    async fn insert(&self, item: &str) -> Result<TodoId, StoreError> {
        if item.chars().count() > MAX_ITEM_LEN {
            return Err(StoreError::Constraint(format!(
                "item longer than {MAX_ITEM_LEN} characters"
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.rows.write().await.insert(id, item.to_owned());
        Ok(id)
    }

    async fn delete_by_id(&self, id: TodoId) -> Result<u64, StoreError> {
        let removed = self.rows.write().await.remove(&id);
        Ok(u64::from(removed.is_some()))
    }
}
