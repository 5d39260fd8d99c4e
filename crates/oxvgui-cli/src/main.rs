#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;

use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{Context, bail};
use oxvgui_controller::{ChannelPresenter, Controller, Notification, Presentation};
use oxvgui_core::{JsonFileStore, KeyValueStore, MemoryStore};
use oxvgui_worker::{BasicEngine, OptimizationQueue, OptimizerEndpoint};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "oxvgui_cli::startup";
pub const TRACING_TARGET_RUN: &str = "oxvgui_cli::run";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_RUN,
            error = %format!("{error:#}"),
            "optimization failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    cli.init_tracing();
    log_startup_info();
    cli.log_config();

    let settings = cli.settings.to_settings();
    settings
        .jobs_config()
        .context("invalid optimization settings")?;

    let data = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let queue = OptimizationQueue::with_endpoint(OptimizerEndpoint::new(BasicEngine::new()));
    queue.start(cli.worker.eager_start);

    let (presenter, mut notifications) = ChannelPresenter::new();
    let controller = Controller::new(
        cli.controller.clone(),
        queue,
        Arc::new(presenter),
        create_store(cli.state_path()),
    )
    .with_settings(settings.clone());
    let (handle, task) = controller.spawn();

    // Applied after any restored settings, so the command line wins.
    handle
        .change_settings(settings)
        .context("failed to apply settings")?;
    handle
        .load_input(data, cli.input_name())
        .context("failed to load document")?;

    let outcome = wait_for_result(&mut notifications).await;
    handle.shutdown();
    if let Err(err) = task.await {
        tracing::warn!(target: TRACING_TARGET_RUN, error = %err, "controller task failed");
    }

    let presentation = outcome?;
    log_sizes(&presentation);
    write_output(cli.output.as_deref(), presentation.value.text()).await
}

fn create_store(path: Option<&Path>) -> Arc<dyn KeyValueStore> {
    match path {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    }
}

/// Waits for the first presented document or failure.
async fn wait_for_result(
    notifications: &mut UnboundedReceiver<Notification>,
) -> anyhow::Result<Presentation> {
    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::ResultReady(presentation) | Notification::OriginalReady(presentation) => {
                return Ok(presentation);
            }
            Notification::Error(failure) => return Err(failure.into()),
            Notification::VersionChanged { previous, current } => {
                tracing::info!(
                    target: TRACING_TARGET_RUN,
                    previous = %previous,
                    current = %current,
                    "updated since last run"
                );
            }
            Notification::InputLoaded {
                filename,
                dimensions,
            } => {
                tracing::info!(
                    target: TRACING_TARGET_RUN,
                    filename = %filename,
                    width = dimensions.width,
                    height = dimensions.height,
                    "document loaded"
                );
            }
            Notification::Busy(busy) => {
                tracing::debug!(target: TRACING_TARGET_RUN, busy, "optimizer busy");
            }
            Notification::SettingsRestored(_) | Notification::SettingsReset { .. } => {}
        }
    }

    bail!("controller stopped before producing a result")
}

fn log_sizes(presentation: &Presentation) {
    tracing::info!(
        target: TRACING_TARGET_RUN,
        mode = presentation.mode.as_ref(),
        size = presentation.size,
        comparison_size = ?presentation.comparison_size,
        saved_percent = ?presentation.savings_percent().map(|p| (p * 100.0).round() / 100.0),
        "optimization finished"
    );
}

async fn write_output(path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, text)
            .await
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(text.as_bytes())
                .await
                .context("failed to write to stdout")?;
            stdout.flush().await.context("failed to flush stdout")
        }
    }
}

/// Logs startup information.
fn log_startup_info() {
    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        features = ?enabled_features(),
        "starting oxvgui"
    );
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [cfg!(feature = "dotenv").then_some("dotenv")]
        .into_iter()
        .flatten()
        .collect()
}
