#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for controller events, presentation and persistence.
pub const TRACING_TARGET_CONTROLLER: &str = "oxvgui_controller::controller";

/// Tracing target for job token minting and stale result checks.
pub const TRACING_TARGET_RESOLVER: &str = "oxvgui_controller::resolver";

mod config;
mod controller;
mod error;
pub mod presenter;
mod resolver;

pub use config::ControllerConfig;
pub use controller::{Controller, ControllerHandle, LAST_SEEN_VERSION_KEY, SETTINGS_KEY};
pub use error::{ControllerError, Failure, FailureKind, Result};
pub use presenter::{ChannelPresenter, Notification, Presentation, Presenter};
pub use resolver::{JobRaceResolver, JobToken};
