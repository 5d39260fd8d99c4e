//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── settings: SettingsArgs         # Jobs, precisions, output toggles
//! ├── worker: WorkerConfig           # Compute endpoint startup
//! └── controller: ControllerConfig   # Cache capacity, app version
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.

mod settings;

use std::path::{Path, PathBuf};

use clap::Parser;
use oxvgui_controller::ControllerConfig;
use oxvgui_worker::WorkerConfig;
use serde::{Deserialize, Serialize};
pub use settings::SettingsArgs;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::TRACING_TARGET_STARTUP;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "oxvgui")]
#[command(about = "Optimize an SVG document")]
#[command(version)]
pub struct Cli {
    /// SVG document to optimize.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the result. Defaults to stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// JSON file remembering settings and the last seen version.
    #[arg(long = "state", env = "OXVGUI_STATE", value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, env = "OXVGUI_LOG_JSON")]
    #[serde(default)]
    pub log_json: bool,

    /// Optimization settings.
    #[clap(flatten)]
    pub settings: SettingsArgs,

    /// Compute endpoint configuration.
    #[clap(flatten)]
    pub worker: WorkerConfig,

    /// Controller configuration.
    #[clap(flatten)]
    pub controller: ControllerConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Name reported for the input document.
    pub fn input_name(&self) -> String {
        self.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }

    /// Path of the state file, if persistence is enabled.
    pub fn state_path(&self) -> Option<&Path> {
        self.state.as_deref()
    }

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs go to stderr so stdout stays free for the document.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        if self.log_json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    /// Logs the effective configuration.
    pub fn log_config(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            input = %self.input.display(),
            output = ?self.output,
            state = ?self.state,
            jobs = ?self.settings.jobs,
            eager_start = self.worker.eager_start,
            cache_capacity = self.controller.cache_capacity,
            "configuration"
        );
    }
}
