//! SQLite-based reading storage.
//!
//! A single append-only `reading` table. Rows get a monotonically increasing
//! rowid, and "latest" is the highest rowid for a location: the persistent
//! variant keeps the arrival-order contract instead of sorting by timestamp.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use weatherwatch_core::RusqliteErrorExt;

use crate::backend::{ReadingBackend, StoreError, StoreResult};
use crate::reading::Reading;

/// Textual timestamp format stored in the `timestamp` column.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// SQLite-based reading storage.
pub struct SqliteReadingStore {
    conn: Connection,
}

impl SqliteReadingStore {
    /// Open a reading store at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| e.into_database_error())?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!("Opened reading database at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory reading store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| e.into_database_error())?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS reading (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    temperature REAL NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_reading_name_id ON reading(name, id);
                "#,
            )
            .map_err(|e| e.into_database_error())?;
        Ok(())
    }

    /// Convert a database row to a Reading.
    fn row_to_reading(row: &rusqlite::Row) -> rusqlite::Result<Reading> {
        let name: String = row.get(0)?;
        let timestamp_str: String = row.get(1)?;
        let temperature: f64 = row.get(2)?;

        let observed_at = NaiveDateTime::parse_from_str(&timestamp_str, TIMESTAMP_FORMAT)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(Reading::new(name, observed_at, temperature))
    }
}

fn query_error(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
            StoreError::CorruptRow(source.to_string())
        }
        other => other.into_database_error().into(),
    }
}

impl ReadingBackend for SqliteReadingStore {
    fn append(&self, reading: Reading) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO reading (name, timestamp, temperature) VALUES (?1, ?2, ?3)",
                params![
                    reading.location(),
                    reading.observed_at().format(TIMESTAMP_FORMAT).to_string(),
                    reading.temperature_celsius(),
                ],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn latest(&self, location: &str) -> StoreResult<Option<Reading>> {
        self.conn
            .query_row(
                "SELECT name, timestamp, temperature FROM reading
                 WHERE name = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![location],
                Self::row_to_reading,
            )
            .optional()
            .map_err(query_error)
    }

    fn all(&self, location: &str) -> StoreResult<Vec<Reading>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, timestamp, temperature FROM reading
                 WHERE name = ?1
                 ORDER BY id ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![location], Self::row_to_reading)
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn locations(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT name FROM reading ORDER BY name ASC")
            .map_err(query_error)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reading", [], |row| row.get(0))
            .map_err(query_error)?;
        Ok(count as usize)
    }
}
