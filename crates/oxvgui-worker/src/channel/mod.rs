//! Request/reply correlation over a compute endpoint.

mod dispatcher;

use std::future::Future;

use dispatcher::{Command, Dispatcher};
use tokio::sync::{mpsc, oneshot};

use crate::endpoint::Endpoint;
use crate::{Result, TRACING_TARGET_CHANNEL, WorkerError};

/// Handle to a compute endpoint that pairs every request with its reply.
///
/// The endpoint is spawned the first time [`start`] or a call needs it. Each
/// call gets a fresh correlation identifier and settles exactly once: with
/// the reply, with the endpoint's error, with [`WorkerError::Cancelled`] or,
/// if the endpoint failed to start, with [`WorkerError::Initialization`].
///
/// Handles are cheap to clone and share the same endpoint. The channel must
/// be created inside a Tokio runtime.
///
/// [`start`]: RequestChannel::start
pub struct RequestChannel<E: Endpoint> {
    commands: mpsc::UnboundedSender<Command<E>>,
}

impl<E: Endpoint> Clone for RequestChannel<E> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<E: Endpoint> RequestChannel<E> {
    /// Creates a channel over `endpoint` without starting it.
    pub fn new(endpoint: E) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(Dispatcher::new(endpoint).run(rx));
        Self { commands }
    }

    /// Starts the endpoint if it is not running yet.
    ///
    /// With `eager` set, the endpoint initializes right away; otherwise it
    /// initializes on its first request. Repeated calls have no effect.
    pub fn start(&self, eager: bool) {
        if self.commands.send(Command::Start { eager }).is_err() {
            tracing::warn!(target: TRACING_TARGET_CHANNEL, "Request channel is closed");
        }
    }

    /// Sends `request` and returns a future settled by its reply.
    ///
    /// The request is dispatched before this method returns, so requests
    /// reach the endpoint in call order. A later [`cancel`] can reject it.
    ///
    /// [`cancel`]: RequestChannel::cancel
    pub fn call(
        &self,
        request: E::Request,
    ) -> impl Future<Output = Result<E::Response>> + Send + 'static {
        self.submit(request, true)
    }

    /// Like [`call`], but the request is never targeted by [`cancel`].
    ///
    /// [`call`]: RequestChannel::call
    /// [`cancel`]: RequestChannel::cancel
    pub fn call_detached(
        &self,
        request: E::Request,
    ) -> impl Future<Output = Result<E::Response>> + Send + 'static {
        self.submit(request, false)
    }

    /// Rejects the most recent outstanding cancellable request with
    /// [`WorkerError::Cancelled`].
    ///
    /// Its reply, if one still arrives, is discarded. Does nothing when no
    /// such request is outstanding.
    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }

    fn submit(
        &self,
        request: E::Request,
        cancellable: bool,
    ) -> impl Future<Output = Result<E::Response>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        let sent = self
            .commands
            .send(Command::Call {
                request,
                cancellable,
                reply,
            })
            .is_ok();

        async move {
            if !sent {
                return Err(WorkerError::Disconnected);
            }
            rx.await.unwrap_or(Err(WorkerError::Disconnected))
        }
    }
}
