#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for request correlation and cancellation.
pub const TRACING_TARGET_CHANNEL: &str = "oxvgui_worker::channel";

/// Tracing target for compute endpoint startup and request handling.
pub const TRACING_TARGET_ENDPOINT: &str = "oxvgui_worker::endpoint";

/// Tracing target for optimization queue activity.
pub const TRACING_TARGET_QUEUE: &str = "oxvgui_worker::queue";

pub mod channel;
mod config;
pub mod endpoint;
pub mod engine;
mod error;
pub mod protocol;
mod queue;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod testing;

pub use channel::RequestChannel;
pub use config::WorkerConfig;
pub use endpoint::Endpoint;
pub use engine::{BasicEngine, Engine, OptimizerEndpoint};
pub use error::{Result, WorkerError};
pub use protocol::{Action, CorrelationId, OptimiseResult, WorkerRequest, WorkerResponse};
pub use queue::OptimizationQueue;
