//! Cloneable handle feeding events to a running controller.

use oxvgui_core::Settings;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{ControllerError, Result};

/// Event delivered to the controller task.
#[derive(Debug)]
pub(super) enum Command {
    LoadInput { data: String, filename: String },
    ChangeSettings(Settings),
    ResetSettings(Settings),
}

/// Handle to a running [`Controller`].
///
/// Events are processed one at a time, in the order they were sent.
///
/// [`Controller`]: super::Controller
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl ControllerHandle {
    pub(super) fn new(
        commands: mpsc::UnboundedSender<Command>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { commands, shutdown }
    }

    /// Loads a new source document.
    pub fn load_input(&self, data: impl Into<String>, filename: impl Into<String>) -> Result<()> {
        self.send(Command::LoadInput {
            data: data.into(),
            filename: filename.into(),
        })
    }

    /// Applies new settings and recomputes the result.
    pub fn change_settings(&self, settings: Settings) -> Result<()> {
        self.send(Command::ChangeSettings(settings))
    }

    /// Replaces the settings as a reset, reporting the previous ones.
    pub fn reset_settings(&self, settings: Settings) -> Result<()> {
        self.send(Command::ResetSettings(settings))
    }

    /// Stops the controller. Pending events are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Returns `true` once the controller has been asked to stop.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled() || self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(ControllerError::Stopped);
        }
        self.commands
            .send(command)
            .map_err(|_| ControllerError::Stopped)
    }
}
