//! Single-flight optimization queue.

use std::future::Future;

use oxvgui_core::{Dimensions, ResultValue, Settings};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::channel::RequestChannel;
use crate::endpoint::Endpoint;
use crate::protocol::{WorkerRequest, WorkerResponse};
use crate::{Result, TRACING_TARGET_QUEUE, WorkerError};

/// Serializes optimization requests over a [`RequestChannel`].
///
/// Every [`optimize`] call cancels the one before it and appends a link to
/// an internal chain. A link issues its request only once the previous link
/// has settled, so requests reach the endpoint in the order they were made.
/// Superseded links still issue their request but settle with
/// [`WorkerError::Cancelled`] instead of the reply. Rejections of earlier
/// links never stop later ones.
///
/// [`inspect`] bypasses the chain and is never cancelled.
///
/// [`optimize`]: OptimizationQueue::optimize
/// [`inspect`]: OptimizationQueue::inspect
pub struct OptimizationQueue<E>
where
    E: Endpoint<Request = WorkerRequest, Response = WorkerResponse>,
{
    channel: RequestChannel<E>,
    /// Settles when the last link has.
    tail: Option<oneshot::Receiver<()>>,
    /// Cancels the last link.
    current: Option<CancellationToken>,
    issued: u64,
}

impl<E> OptimizationQueue<E>
where
    E: Endpoint<Request = WorkerRequest, Response = WorkerResponse>,
{
    /// Creates a queue sending its requests through `channel`.
    pub fn new(channel: RequestChannel<E>) -> Self {
        Self {
            channel,
            tail: None,
            current: None,
            issued: 0,
        }
    }

    /// Creates a queue over a new channel to `endpoint`.
    pub fn with_endpoint(endpoint: E) -> Self {
        Self::new(RequestChannel::new(endpoint))
    }

    /// Starts the underlying endpoint. See [`RequestChannel::start`].
    pub fn start(&self, eager: bool) {
        self.channel.start(eager);
    }

    /// Returns the channel this queue sends through.
    pub fn channel(&self) -> &RequestChannel<E> {
        &self.channel
    }

    /// Validates `document` and returns its dimensions.
    pub fn inspect(
        &self,
        document: impl Into<String>,
    ) -> impl Future<Output = Result<Dimensions>> + Send + 'static {
        let call = self.channel.call_detached(WorkerRequest::Inspect {
            data: document.into(),
        });

        async move {
            match call.await? {
                WorkerResponse::Dimensions(dimensions) => Ok(dimensions),
                WorkerResponse::Optimized(_) => Err(WorkerError::protocol(
                    "expected dimensions, got an optimization result",
                )),
            }
        }
    }

    /// Optimizes `document` with `settings`, superseding any earlier request.
    ///
    /// The returned future does not need to be polled for the request to be
    /// issued.
    pub fn optimize(
        &mut self,
        document: impl Into<String>,
        settings: Settings,
    ) -> impl Future<Output = Result<ResultValue>> + Send + 'static {
        self.cancel();

        let token = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.tail.replace(done_rx);
        self.current = Some(token.clone());
        self.issued += 1;

        let link = self.issued;
        let channel = self.channel.clone();
        let request = WorkerRequest::Optimize {
            data: document.into(),
            settings,
        };

        tracing::debug!(target: TRACING_TARGET_QUEUE, link, "Queued optimization");

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                // Settles either way, including when that link was dropped.
                let _ = previous.await;
            }

            tracing::trace!(target: TRACING_TARGET_QUEUE, link, "Issuing optimization");
            let call = channel.call(request);

            let result = tokio::select! {
                biased;

                result = call => result,

                () = token.cancelled() => {
                    // Nothing newer has been issued yet, so this targets our call.
                    channel.cancel();
                    Err(WorkerError::Cancelled)
                }
            };

            let _ = done_tx.send(());
            result
        });

        async move {
            let response = handle.await.map_err(|err| {
                tracing::error!(
                    target: TRACING_TARGET_QUEUE,
                    error = %err,
                    "Optimization link failed"
                );
                WorkerError::Disconnected
            })??;

            match response {
                WorkerResponse::Optimized(result) => {
                    Ok(ResultValue::new(result.data, result.dimensions))
                }
                WorkerResponse::Dimensions(_) => Err(WorkerError::protocol(
                    "expected an optimization result, got dimensions",
                )),
            }
        }
    }

    /// Cancels the most recent optimization, if it is still outstanding.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
        self.channel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::OptimizerEndpoint;
    use crate::testing::ScriptedEngine;

    fn queue(engine: &ScriptedEngine) -> OptimizationQueue<OptimizerEndpoint<ScriptedEngine>> {
        OptimizationQueue::with_endpoint(OptimizerEndpoint::new(engine.clone()))
    }

    #[tokio::test]
    async fn test_back_to_back_calls_reach_endpoint_in_order() {
        let engine = ScriptedEngine::new().with_delay(Duration::from_millis(20));
        let mut queue = queue(&engine);
        let settings = Settings::empty();

        let first = queue.optimize("<svg>a</svg>", settings.clone());
        let second = queue.optimize("<svg>b</svg>", settings.clone());

        assert_eq!(first.await.unwrap_err(), WorkerError::Cancelled);
        let value = second.await.unwrap();

        assert_eq!(value.text(), ScriptedEngine::output("<svg>b</svg>", &settings));
        assert_eq!(engine.optimised(), vec!["<svg>a</svg>", "<svg>b</svg>"]);
    }

    #[tokio::test]
    async fn test_only_the_latest_link_completes() {
        let engine = ScriptedEngine::new().with_delay(Duration::from_millis(5));
        let mut queue = queue(&engine);
        let settings = Settings::empty();

        let mut links = Vec::new();
        for i in 0..5 {
            links.push(queue.optimize(format!("<svg>{i}</svg>"), settings.clone()));
        }

        let mut outcomes = Vec::new();
        for link in links {
            outcomes.push(link.await);
        }

        let (last, earlier) = outcomes.split_last().unwrap();
        assert!(earlier.iter().all(|r| r.as_ref().is_err_and(WorkerError::is_cancelled)));
        assert_eq!(
            last.as_ref().unwrap().text(),
            ScriptedEngine::output("<svg>4</svg>", &settings)
        );
        assert_eq!(engine.optimised().len(), 5);
    }

    #[tokio::test]
    async fn test_failure_does_not_break_the_chain() {
        let engine = ScriptedEngine::new();
        let mut queue = queue(&engine);

        let failed = queue.optimize("<svg>fail</svg>", Settings::empty()).await;
        assert!(matches!(failed, Err(WorkerError::Computation { .. })));

        let ok = queue.optimize("<svg/>", Settings::empty()).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_inspect_is_not_cancelled_by_optimize() {
        let engine = ScriptedEngine::new().with_delay(Duration::from_millis(10));
        let mut queue = queue(&engine);

        let inspect = queue.inspect("<svg/>");
        let optimize = queue.optimize("<svg/>", Settings::empty());

        assert_eq!(inspect.await.unwrap(), ScriptedEngine::DIMENSIONS);
        assert!(optimize.await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_rejects_the_pending_link() {
        let engine = ScriptedEngine::new().with_delay(Duration::from_millis(20));
        let mut queue = queue(&engine);

        let pending = queue.optimize("<svg/>", Settings::empty());
        queue.cancel();

        assert_eq!(pending.await.unwrap_err(), WorkerError::Cancelled);
    }
}
