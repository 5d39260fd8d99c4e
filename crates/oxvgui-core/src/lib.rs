#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for result cache operations.
///
/// Use this target for logging cache hits, misses, insertions, evictions and purges.
pub const TRACING_TARGET_CACHE: &str = "oxvgui_core::cache";

/// Tracing target for key-value store operations.
///
/// Use this target for logging reads and writes of persisted application state.
pub const TRACING_TARGET_STORE: &str = "oxvgui_core::store";

/// Tracing target for settings translation.
pub const TRACING_TARGET_SETTINGS: &str = "oxvgui_core::settings";

pub mod cache;
mod error;
#[doc(hidden)]
pub mod prelude;
pub mod settings;
pub mod store;
pub mod types;

pub use cache::{DEFAULT_CACHE_CAPACITY, ResultCache};
pub use error::{Error, Result};
pub use settings::{Fingerprint, JobConfig, JobParams, JobShape, JobsConfig, Settings};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use types::{CompressionMode, Dimensions, ResultValue};
