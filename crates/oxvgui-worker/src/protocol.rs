//! Message shapes exchanged with a compute endpoint.
//!
//! A request travels as `{ id, action, data, settings }` and its reply comes
//! back as either `{ id, result }` or `{ id, error }`. Identifiers are minted
//! by the sending channel and are unique for its lifetime.

use derive_more::{Display, From, Into};
use oxvgui_core::{Dimensions, Settings};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// Correlation identifier attached to every request and echoed in its reply.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Returns the identifier following this one.
    #[inline]
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// A request body tagged with its correlation identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub id: CorrelationId,
    #[serde(flatten)]
    pub body: T,
}

/// A reply tagged with the identifier of the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub id: CorrelationId,
    #[serde(flatten)]
    pub outcome: ReplyOutcome<T>,
}

/// Outcome carried by a [`Reply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOutcome<T> {
    Result(T),
    Error(String),
}

impl<T> ReplyOutcome<T> {
    /// Builds an outcome from an endpoint result.
    pub fn from_result(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => Self::Result(value),
            Err(message) => Self::Error(message),
        }
    }
}

/// Operation requested from the optimizer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Validate a document and report its dimensions.
    Inspect,
    /// Optimize a document with the supplied settings.
    Optimize,
}

/// Request understood by the optimizer endpoint.
///
/// The legacy action names `wrapOriginal` and `process` are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WorkerRequest {
    #[serde(alias = "wrapOriginal")]
    Inspect { data: String },
    #[serde(alias = "process")]
    Optimize { data: String, settings: Settings },
}

impl WorkerRequest {
    /// Returns the action this request performs.
    pub fn action(&self) -> Action {
        match self {
            Self::Inspect { .. } => Action::Inspect,
            Self::Optimize { .. } => Action::Optimize,
        }
    }

    /// Size of the document carried by this request, in bytes.
    pub fn data_len(&self) -> usize {
        match self {
            Self::Inspect { data } | Self::Optimize { data, .. } => data.len(),
        }
    }
}

/// Output of an optimization: the new document and its dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimiseResult {
    pub data: String,
    pub dimensions: Dimensions,
}

/// Reply payload produced by the optimizer endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    Optimized(OptimiseResult),
    Dimensions(Dimensions),
}
