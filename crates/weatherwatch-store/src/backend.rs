//! Reading storage backend trait and error types.
//!
//! This module defines the `ReadingBackend` trait that abstracts over the
//! in-memory map and the SQLite table.

use thiserror::Error;
use weatherwatch_core::DatabaseError;

use crate::reading::Reading;

/// Errors that can occur during reading backend operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure (persistent backend only).
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// A stored row could not be turned back into a reading.
    #[error("Corrupt reading row: {0}")]
    CorruptRow(String),

    /// The blocking task running a database call panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for reading backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for reading storage backends.
///
/// Every location key maps to the readings appended for it, in arrival order.
/// "Latest" always means the last-appended reading, regardless of its
/// `observed_at`. Keys are compared exactly; normalization is the caller's job.
///
/// Note: Implementations don't need to be Sync - the ReadingStore wrapper
/// handles thread-safe access where the backend itself isn't.
pub trait ReadingBackend: Send {
    /// Append `reading` to the end of its location's sequence, creating the
    /// sequence on first use.
    fn append(&self, reading: Reading) -> StoreResult<()>;

    /// The most recently appended reading for `location`.
    ///
    /// Returns `None` if nothing was ever appended for it.
    fn latest(&self, location: &str) -> StoreResult<Option<Reading>>;

    /// Snapshot of every reading for `location`, oldest arrival first.
    ///
    /// Returns an empty vector for unknown locations.
    fn all(&self, location: &str) -> StoreResult<Vec<Reading>>;

    /// Known location keys, sorted.
    fn locations(&self) -> StoreResult<Vec<String>>;

    /// Total number of readings across all locations.
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
