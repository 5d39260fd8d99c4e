//! Worker configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Whether the compute endpoint starts before the first request by default.
pub const DEFAULT_EAGER_START: bool = true;

/// Compute endpoint startup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct WorkerConfig {
    /// Start the compute endpoint right away instead of on the first request.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "worker-eager-start",
            env = "OXVGUI_WORKER_EAGER_START",
            default_value_t = DEFAULT_EAGER_START,
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default = "default_eager_start")]
    pub eager_start: bool,
}

fn default_eager_start() -> bool {
    DEFAULT_EAGER_START
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            eager_start: DEFAULT_EAGER_START,
        }
    }
}

impl WorkerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the endpoint starts eagerly.
    pub fn with_eager_start(mut self, eager_start: bool) -> Self {
        self.eager_start = eager_start;
        self
    }
}
