//! Controller error types.

use oxvgui_worker::WorkerError;

/// Result type alias for controller operations.
pub type Result<T, E = ControllerError> = std::result::Result<T, E>;

/// Errors returned by a [`ControllerHandle`].
///
/// [`ControllerHandle`]: crate::ControllerHandle
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The controller task is no longer running.
    #[error("controller has stopped")]
    Stopped,
}

/// Where a user-visible failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A new document could not be read.
    Load,
    /// The document could not be optimized with the current settings.
    Minify,
    /// The compute endpoint did not start.
    Initialization,
}

impl FailureKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Load => "Load failed: ",
            Self::Minify => "Minifying error: ",
            Self::Initialization => "Optimizer failed to start: ",
        }
    }
}

/// A failure reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{}", .kind.prefix(), .message)]
pub struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_worker(kind: FailureKind, error: &WorkerError) -> Self {
        match error {
            WorkerError::Initialization { reason } => {
                Self::new(FailureKind::Initialization, reason.as_ref())
            }
            other => Self::new(kind, other.to_string()),
        }
    }

    #[inline]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The underlying description, without context.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}
