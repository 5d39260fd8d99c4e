//! Controller configuration.

#[cfg(feature = "config")]
use clap::Args;
use oxvgui_core::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};

/// Version recorded as last seen when no other is configured.
pub const DEFAULT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Controller behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ControllerConfig {
    /// Number of optimized results kept per loaded document.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cache-capacity",
            env = "OXVGUI_CACHE_CAPACITY",
            default_value_t = DEFAULT_CACHE_CAPACITY
        )
    )]
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Application version compared against the last seen one on startup.
    #[cfg_attr(
        feature = "config",
        arg(long = "app-version", env = "OXVGUI_APP_VERSION", default_value = DEFAULT_APP_VERSION)
    )]
    #[serde(default = "default_app_version")]
    pub app_version: String,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_app_version() -> String {
    DEFAULT_APP_VERSION.to_owned()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            app_version: default_app_version(),
        }
    }
}

impl ControllerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }
}
