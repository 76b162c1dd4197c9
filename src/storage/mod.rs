//! Key-value storage backends for persisted store state.
//!
//! A backend is the durable-client-storage analog: string keys, string
//! values, no structure. Stores serialize their full state to JSON and hand
//! it here after every mutation.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// A string-keyed, string-valued storage backend.
///
/// Reads return `Ok(None)` for absent keys; corrupt values are handed back
/// verbatim and rejected at the deserialization layer above.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`. No-op if absent.
    fn remove(&self, key: &str) -> Result<()>;
}
