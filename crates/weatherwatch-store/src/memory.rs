//! In-memory reading storage.
//!
//! One `RwLock` guards the whole map. Writers hold it for a single push,
//! readers for a single clone, so a reader sees either all of an append or
//! none of it and the lock is never held across I/O.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::backend::{ReadingBackend, StoreResult};
use crate::reading::Reading;

#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    readings: RwLock<HashMap<String, Vec<Reading>>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadingBackend for MemoryReadingStore {
    fn append(&self, reading: Reading) -> StoreResult<()> {
        let key = reading.location().to_string();
        self.readings.write().entry(key).or_default().push(reading);
        Ok(())
    }

    fn latest(&self, location: &str) -> StoreResult<Option<Reading>> {
        Ok(self
            .readings
            .read()
            .get(location)
            .and_then(|readings| readings.last().cloned()))
    }

    fn all(&self, location: &str) -> StoreResult<Vec<Reading>> {
        Ok(self
            .readings
            .read()
            .get(location)
            .cloned()
            .unwrap_or_default())
    }

    fn locations(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.readings.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.readings.read().values().map(Vec::len).sum())
    }
}
