//! Shared reading store handle.
//!
//! `ReadingStore` wraps either backend behind a cheap-to-clone handle with an
//! async interface. The in-memory backend is called inline (its lock is only
//! held for a copy); SQLite calls run on the blocking pool behind a mutex.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::backend::{ReadingBackend, StoreError, StoreResult};
use crate::memory::MemoryReadingStore;
use crate::reading::Reading;
use crate::sqlite::SqliteReadingStore;

/// The single shared mutable structure of the service.
#[derive(Clone)]
pub enum ReadingStore {
    /// Process-lifetime map (default).
    Memory(Arc<MemoryReadingStore>),

    /// Append-only SQLite table.
    Sqlite(Arc<Mutex<SqliteReadingStore>>),
}

impl ReadingStore {
    /// Create an empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(Arc::new(MemoryReadingStore::new()))
    }

    /// Create a SQLite-backed store.
    pub fn sqlite(store: SqliteReadingStore) -> Self {
        Self::Sqlite(Arc::new(Mutex::new(store)))
    }

    /// Short backend name for logs.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    /// A handle that can only read.
    pub fn reader(&self) -> ReadingView {
        ReadingView {
            store: self.clone(),
        }
    }

    async fn with_backend<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ReadingBackend) -> StoreResult<T> + Send + 'static,
    {
        match self {
            Self::Memory(store) => op(&**store),
            Self::Sqlite(store) => {
                let store = store.clone();
                tokio::task::spawn_blocking(move || {
                    let guard = store.lock();
                    op(&*guard)
                })
                .await
                .map_err(|e| StoreError::Task(e.to_string()))?
            }
        }
    }

    /// Append a reading to the end of its location's sequence.
    pub async fn append(&self, reading: Reading) -> StoreResult<()> {
        self.with_backend(move |backend| backend.append(reading)).await
    }

    /// The most recently appended reading for `location`.
    pub async fn latest(&self, location: &str) -> StoreResult<Option<Reading>> {
        let location = location.to_string();
        self.with_backend(move |backend| backend.latest(&location))
            .await
    }

    /// Snapshot of all readings for `location` in arrival order.
    pub async fn all(&self, location: &str) -> StoreResult<Vec<Reading>> {
        let location = location.to_string();
        self.with_backend(move |backend| backend.all(&location)).await
    }

    /// Known location keys, sorted.
    pub async fn locations(&self) -> StoreResult<Vec<String>> {
        self.with_backend(|backend| backend.locations()).await
    }

    /// Total number of stored readings.
    pub async fn len(&self) -> StoreResult<usize> {
        self.with_backend(|backend| backend.len()).await
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        self.with_backend(|backend| backend.is_empty()).await
    }
}

/// Read-only access to a [`ReadingStore`], handed to query handlers.
#[derive(Clone)]
pub struct ReadingView {
    store: ReadingStore,
}

impl ReadingView {
    pub async fn latest(&self, location: &str) -> StoreResult<Option<Reading>> {
        self.store.latest(location).await
    }

    pub async fn all(&self, location: &str) -> StoreResult<Vec<Reading>> {
        self.store.all(location).await
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
