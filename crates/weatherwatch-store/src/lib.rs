//! Reading storage for weatherwatch.
//!
//! The scheduler appends readings, query handlers read them. Everything goes
//! through [`ReadingStore`] (or its read-only [`ReadingView`]); the underlying
//! map or database is never handed out.

pub mod backend;
pub mod memory;
pub mod reading;
pub mod sqlite;
pub mod store;

pub use backend::{ReadingBackend, StoreError, StoreResult};
pub use memory::MemoryReadingStore;
pub use reading::Reading;
pub use sqlite::SqliteReadingStore;
pub use store::{ReadingStore, ReadingView};
