//! Task hosting an [`Endpoint`].

use tokio::sync::mpsc;

use super::Endpoint;
use crate::TRACING_TARGET_ENDPOINT;
use crate::protocol::{Envelope, Reply, ReplyOutcome};

/// Message sent from an endpoint task back to its channel.
#[derive(Debug)]
pub(crate) enum Incoming<T> {
    /// A reply to a previously sent request.
    Reply(Reply<T>),
    /// The endpoint could not be initialized.
    InitializationFailed(String),
}

/// Spawns a task hosting `endpoint` and returns its request inbox.
///
/// With `eager` set, initialization runs immediately; otherwise it runs when
/// the first request arrives. Replies and initialization failures are sent to
/// `outbox`.
pub(crate) fn spawn_endpoint<E: Endpoint>(
    endpoint: E,
    eager: bool,
    outbox: mpsc::UnboundedSender<Incoming<E::Response>>,
) -> mpsc::UnboundedSender<Envelope<E::Request>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(endpoint, eager, rx, outbox));
    tx
}

async fn run<E: Endpoint>(
    mut endpoint: E,
    eager: bool,
    mut inbox: mpsc::UnboundedReceiver<Envelope<E::Request>>,
    outbox: mpsc::UnboundedSender<Incoming<E::Response>>,
) {
    tracing::debug!(target: TRACING_TARGET_ENDPOINT, eager, "Starting compute endpoint");

    let mut ready = false;
    if eager {
        ready = initialize(&mut endpoint, &outbox).await;
        if !ready {
            return drain_failed(inbox, outbox).await;
        }
    }

    while let Some(envelope) = inbox.recv().await {
        if !ready {
            ready = initialize(&mut endpoint, &outbox).await;
            if !ready {
                return drain_failed(inbox, outbox).await;
            }
        }

        let id = envelope.id;
        tracing::trace!(target: TRACING_TARGET_ENDPOINT, %id, "Handling request");

        let outcome = ReplyOutcome::from_result(endpoint.handle(envelope.body).await);
        if let ReplyOutcome::Error(message) = &outcome {
            tracing::debug!(
                target: TRACING_TARGET_ENDPOINT,
                %id,
                error = %message,
                "Request failed"
            );
        }

        if outbox.send(Incoming::Reply(Reply { id, outcome })).is_err() {
            break;
        }
    }

    tracing::debug!(target: TRACING_TARGET_ENDPOINT, "Compute endpoint stopped");
}

async fn initialize<E: Endpoint>(
    endpoint: &mut E,
    outbox: &mpsc::UnboundedSender<Incoming<E::Response>>,
) -> bool {
    match endpoint.initialize().await {
        Ok(()) => {
            tracing::info!(target: TRACING_TARGET_ENDPOINT, "Compute endpoint ready");
            true
        }
        Err(reason) => {
            tracing::error!(
                target: TRACING_TARGET_ENDPOINT,
                error = %reason,
                "Compute endpoint failed to initialize"
            );
            let _ = outbox.send(Incoming::InitializationFailed(reason));
            false
        }
    }
}

// Keeps answering after a failed start so requests already in flight towards
// the endpoint still settle.
async fn drain_failed<Req, Res>(
    mut inbox: mpsc::UnboundedReceiver<Envelope<Req>>,
    outbox: mpsc::UnboundedSender<Incoming<Res>>,
) {
    while inbox.recv().await.is_some() {
        if outbox
            .send(Incoming::InitializationFailed(
                "compute endpoint is unavailable".to_owned(),
            ))
            .is_err()
        {
            break;
        }
    }
}
