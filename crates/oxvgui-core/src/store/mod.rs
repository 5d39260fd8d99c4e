//! Persistent key-value storage for application state.
//!
//! The controller remembers the last applied settings and the last seen
//! application version through this interface. Writes to different keys carry
//! no ordering guarantee relative to each other.

mod json_file;
mod memory;

use async_trait::async_trait;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::Result;

/// Async key-value store holding JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}
