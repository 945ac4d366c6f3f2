//! In-memory snapshot storage.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{SnapshotStorage, StoreError};

/// Snapshot storage backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
