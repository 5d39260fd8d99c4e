//! Prelude module for oxvgui-core.
//!
//! Re-exports the most commonly used types so downstream crates can import
//! them with a single `use oxvgui_core::prelude::*;`.

pub use crate::cache::{DEFAULT_CACHE_CAPACITY, ResultCache};
pub use crate::settings::{Fingerprint, JobsConfig, Settings};
pub use crate::store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use crate::types::{CompressionMode, Dimensions, ResultValue};
pub use crate::{Error, Result};
