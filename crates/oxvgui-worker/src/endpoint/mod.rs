//! Compute endpoints and the task that drives them.
//!
//! An endpoint processes one request at a time. It is initialized exactly
//! once, either as soon as it is spawned or right before its first request,
//! and a failed initialization is final.

mod runner;

use std::future::Future;

pub(crate) use runner::{Incoming, spawn_endpoint};

/// An isolated worker that answers requests.
///
/// Failures are reported as plain descriptions: they cross the same boundary
/// a reply does and carry no structured source.
pub trait Endpoint: Send + 'static {
    /// Request payload.
    type Request: Send + 'static;
    /// Reply payload.
    type Response: Send + 'static;

    /// Prepares the endpoint for work.
    fn initialize(&mut self) -> impl Future<Output = Result<(), String>> + Send;

    /// Handles a single request.
    fn handle(
        &mut self,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, String>> + Send;
}
