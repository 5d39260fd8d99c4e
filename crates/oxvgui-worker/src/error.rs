//! Worker error types.

use std::borrow::Cow;

/// Result type alias for worker operations.
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Worker error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The compute endpoint failed to start. Every pending and later request
    /// on the same channel fails with this error.
    #[error("compute endpoint failed to initialize: {reason}")]
    Initialization { reason: Cow<'static, str> },

    /// The endpoint processed the request and reported an error.
    #[error("{message}")]
    Computation { message: Cow<'static, str> },

    /// The request was superseded by a newer one.
    #[error("request was cancelled")]
    Cancelled,

    /// The channel or its endpoint is gone.
    #[error("compute endpoint disconnected")]
    Disconnected,

    /// The endpoint replied with something other than what was asked for.
    #[error("unexpected reply from compute endpoint: {0}")]
    Protocol(Cow<'static, str>),
}

impl WorkerError {
    /// Creates an initialization error.
    pub fn initialization(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }

    /// Creates a computation error.
    pub fn computation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Computation {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns `true` for the error produced by cancellation.
    ///
    /// Callers treat it as a silent outcome rather than a failure.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short kind name of this error.
    ///
    /// Cancellation reports `AbortError`, the name callers match on to
    /// tell it apart from real failures.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "InitializationError",
            Self::Computation { .. } => "ComputationError",
            Self::Cancelled => "AbortError",
            Self::Disconnected => "DisconnectedError",
            Self::Protocol(_) => "ProtocolError",
        }
    }
}
