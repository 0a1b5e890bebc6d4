//! Memoizing wrapper around the [`TodoStore`] collaborator.
//!
//! Reads are cached by call signature:
//!
//! | Call              | Key              |
//! |-------------------|------------------|
//! | `list()`          | `list:`          |
//! | `get_by_id(7)`    | `getById:7`      |
//!
//! Writes always reach the store and, once they succeed, drop the keys they may
//! have made stale. `insert` drops `list:` and the `getById:` key of the id it was
//! given, without filling it in. `delete_by_id(id)` drops `list:` and
//! `getById:<id>` even when nothing was removed. A failed write drops nothing.
//!
//! There is no single-flight: concurrent misses on one key each call the store and
//! the last result stored wins. A fetch that started before an invalidation can
//! repopulate the key right after it, leaving a stale entry until the next write.
//! Entries have no TTL.

mod memo;

use std::sync::Arc;

use tracing::debug;

pub use memo::{CacheEntry, Memo, MemoStats};

use crate::database::{StoreError, Todo, TodoId, TodoStore};

const LIST_KEY: &str = "list:";

fn by_id_key(id: TodoId) -> String {
    format!("getById:{id}")
}

/// [`TodoStore`] operations with read memoization and write invalidation.
///
/// Construct one per process and share it behind an [`Arc`]; tests build their own.
#[derive(Debug)]
pub struct CacheLayer<S> {
    store: S,
    lists: Memo<Arc<Vec<Todo>>>,
    items: Memo<Option<Todo>>,
}

impl<S: TodoStore> CacheLayer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lists: Memo::new(),
            items: Memo::new(),
        }
    }

    /// The wrapped collaborator.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All todos, from cache when present.
    pub async fn list(&self) -> Result<Arc<Vec<Todo>>, StoreError> {
        self.lists
            .get_or_fetch(LIST_KEY, || async { self.store.list().await.map(Arc::new) })
            .await
    }

    /// One todo by id, from cache when present. Absent results are cached too.
    pub async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        self.items
            .get_or_fetch(&by_id_key(id), || self.store.get_by_id(id))
            .await
    }

    /// Inserts `item` and invalidates the cached list.
    ///
    /// The new id's entry is dropped too: a lookup made before the id was
    /// assigned may have cached its absence.
    pub async fn insert(&self, item: &str) -> Result<TodoId, StoreError> {
        let id = self.store.insert(item).await?;
        self.lists.invalidate(LIST_KEY);
        self.items.invalidate(&by_id_key(id));
        debug!(id, "insert invalidated list and item");
        Ok(id)
    }

    /// Deletes by id and invalidates the list and that id's entry.
    pub async fn delete_by_id(&self, id: TodoId) -> Result<u64, StoreError> {
        let removed = self.store.delete_by_id(id).await?;
        self.lists.invalidate(LIST_KEY);
        self.items.invalidate(&by_id_key(id));
        debug!(id, removed, "delete invalidated list and item");
        Ok(removed)
    }

    /// Drops every cached entry.
    pub fn flush(&self) {
        self.lists.flush();
        self.items.flush();
    }

    /// Number of cached entries across all operations.
    pub fn len(&self) -> usize {
        self.lists.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combined hit and miss counters.
    pub fn stats(&self) -> MemoStats {
        let lists = self.lists.stats();
        let items = self.items.stats();
        MemoStats {
            hits: lists.hits + items.hits,
            misses: lists.misses + items.misses,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A store double that counts calls and can be told to fail or stall.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::database::{MemoryStore, StoreError, Todo, TodoId, TodoStore};

    #[derive(Default)]
    pub struct CountingStore {
        pub inner: MemoryStore,
        pub list_calls: AtomicUsize,
        pub get_calls: AtomicUsize,
        pub insert_calls: AtomicUsize,
        pub delete_calls: AtomicUsize,
        pub fail: AtomicBool,
        pub read_delay: Option<Duration>,
    }

    impl CountingStore {
        pub fn failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".to_owned()))
            } else {
                Ok(())
            }
        }

        async fn stall(&self) {
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    impl TodoStore for CountingStore {
        async fn list(&self) -> Result<Vec<Todo>, StoreError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.stall().await;
            self.check()?;
            self.inner.list().await
        }

        async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.stall().await;
            self.check()?;
            self.inner.get_by_id(id).await
        }

        async fn insert(&self, item: &str) -> Result<TodoId, StoreError> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.insert(item).await
        }

        async fn delete_by_id(&self, id: TodoId) -> Result<u64, StoreError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.delete_by_id(id).await
        }
    }
}
