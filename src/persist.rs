//! Shared persistence boundary helpers.
//!
//! Every store writes its full serialized state through here after each
//! mutation and reads it back once at construction. Failures never reach
//! callers: a failed write is logged and the in-memory state stays
//! authoritative; unreadable or unparseable stored state falls back to the
//! store's default.

use crate::error::{Result, StoreError};
use crate::storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

fn encode<T: Serialize>(state: &T) -> Result<String> {
    serde_json::to_string(state).map_err(StoreError::from)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| StoreError::Deserialization(e.to_string()))
}

/// Serialize `state` and write it under `key`.
///
/// Write-through is best effort: errors are logged, not returned, so store
/// mutations stay total.
pub(crate) fn write_through<T: Serialize>(storage: &dyn StorageBackend, key: &str, state: &T) {
    let encoded = match encode(state) {
        Ok(s) => s,
        Err(e) => {
            warn!(key, error = %e, "failed to serialize store state");
            return;
        }
    };

    if let Err(e) = storage.write(key, &encoded) {
        warn!(key, error = %e, "failed to persist store state");
    }
}

/// Read and deserialize the state stored under `key`.
///
/// Returns `None` when the key is absent, unreadable, or holds data that no
/// longer parses; the caller substitutes its default state.
pub(crate) fn rehydrate<T: DeserializeOwned>(storage: &dyn StorageBackend, key: &str) -> Option<T> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "failed to read persisted state, using defaults");
            return None;
        }
    };

    match decode(&raw) {
        Ok(state) => {
            debug!(key, "rehydrated store state");
            Some(state)
        }
        Err(e) => {
            warn!(key, error = %e, "persisted state is malformed, using defaults");
            None
        }
    }
}
