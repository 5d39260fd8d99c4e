//! Task owning the pending-request table of a [`RequestChannel`].
//!
//! All channel state lives here and is only touched by this task, so
//! registration, settlement and cancellation never race with each other.
//!
//! [`RequestChannel`]: super::RequestChannel

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, oneshot};

use crate::endpoint::{Endpoint, Incoming, spawn_endpoint};
use crate::protocol::{CorrelationId, Envelope, Reply, ReplyOutcome};
use crate::{Result, TRACING_TARGET_CHANNEL, WorkerError};

pub(super) type ReplySender<T> = oneshot::Sender<Result<T>>;

/// Instruction sent from a channel handle to its dispatcher.
pub(super) enum Command<E: Endpoint> {
    Start {
        eager: bool,
    },
    Call {
        request: E::Request,
        cancellable: bool,
        reply: ReplySender<E::Response>,
    },
    Cancel,
}

pub(super) struct Dispatcher<E: Endpoint> {
    /// Endpoint waiting to be started.
    idle: Option<E>,
    outbox: Option<mpsc::UnboundedSender<Envelope<E::Request>>>,
    replies_tx: mpsc::UnboundedSender<Incoming<E::Response>>,
    replies_rx: mpsc::UnboundedReceiver<Incoming<E::Response>>,
    pending: HashMap<CorrelationId, ReplySender<E::Response>>,
    /// Requests rejected by cancellation whose replies are still due.
    cancelled: HashSet<CorrelationId>,
    /// Most recent cancellable request still outstanding.
    latest: Option<CorrelationId>,
    last_id: CorrelationId,
    failure: Option<String>,
}

impl<E: Endpoint> Dispatcher<E> {
    pub(super) fn new(endpoint: E) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            idle: Some(endpoint),
            outbox: None,
            replies_tx,
            replies_rx,
            pending: HashMap::new(),
            cancelled: HashSet::new(),
            latest: None,
            last_id: CorrelationId::default(),
            failure: None,
        }
    }

    /// Runs until every channel handle is dropped.
    pub(super) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<E>>) {
        loop {
            tokio::select! {
                biased;

                Some(incoming) = self.replies_rx.recv() => self.receive(incoming),

                command = commands.recv() => match command {
                    Some(command) => self.execute(command),
                    None => break,
                },
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_CHANNEL,
            pending = self.pending.len(),
            "Request channel closed"
        );
    }

    fn execute(&mut self, command: Command<E>) {
        match command {
            Command::Start { eager } => self.start(eager),
            Command::Call {
                request,
                cancellable,
                reply,
            } => self.call(request, cancellable, reply),
            Command::Cancel => self.cancel(),
        }
    }

    fn start(&mut self, eager: bool) {
        let Some(endpoint) = self.idle.take() else {
            return;
        };

        tracing::debug!(target: TRACING_TARGET_CHANNEL, eager, "Spawning compute endpoint");
        self.outbox = Some(spawn_endpoint(endpoint, eager, self.replies_tx.clone()));
    }

    fn call(&mut self, request: E::Request, cancellable: bool, reply: ReplySender<E::Response>) {
        if let Some(reason) = &self.failure {
            let _ = reply.send(Err(WorkerError::initialization(reason.clone())));
            return;
        }

        self.start(false);

        self.last_id = self.last_id.next();
        let id = self.last_id;
        self.pending.insert(id, reply);
        if cancellable {
            self.latest = Some(id);
        }

        let sent = self
            .outbox
            .as_ref()
            .is_some_and(|outbox| outbox.send(Envelope { id, body: request }).is_ok());

        if !sent {
            tracing::warn!(
                target: TRACING_TARGET_CHANNEL,
                %id,
                "Compute endpoint is gone, rejecting outstanding requests"
            );
            self.reject_all(|| WorkerError::Disconnected);
            return;
        }

        tracing::trace!(
            target: TRACING_TARGET_CHANNEL,
            %id,
            cancellable,
            pending = self.pending.len(),
            "Request sent"
        );
    }

    fn cancel(&mut self) {
        let Some(id) = self.latest.take() else {
            tracing::trace!(target: TRACING_TARGET_CHANNEL, "Nothing to cancel");
            return;
        };

        if let Some(reply) = self.pending.remove(&id) {
            self.cancelled.insert(id);
            let _ = reply.send(Err(WorkerError::Cancelled));
            tracing::debug!(target: TRACING_TARGET_CHANNEL, %id, "Request cancelled");
        }
    }

    fn receive(&mut self, incoming: Incoming<E::Response>) {
        match incoming {
            Incoming::Reply(reply) => self.settle(reply),
            Incoming::InitializationFailed(reason) => self.fail(reason),
        }
    }

    fn settle(&mut self, Reply { id, outcome }: Reply<E::Response>) {
        if self.latest == Some(id) {
            self.latest = None;
        }

        let Some(reply) = self.pending.remove(&id) else {
            if self.cancelled.remove(&id) {
                tracing::trace!(
                    target: TRACING_TARGET_CHANNEL,
                    %id,
                    "Dropped reply to a cancelled request"
                );
            } else {
                tracing::warn!(
                    target: TRACING_TARGET_CHANNEL,
                    %id,
                    "Dropped reply with unknown correlation id"
                );
            }
            return;
        };

        let result = match outcome {
            ReplyOutcome::Result(response) => Ok(response),
            ReplyOutcome::Error(message) => Err(WorkerError::computation(message)),
        };

        // The caller may have stopped waiting.
        let _ = reply.send(result);
        tracing::trace!(target: TRACING_TARGET_CHANNEL, %id, "Request settled");
    }

    fn fail(&mut self, reason: String) {
        let reason = match &self.failure {
            Some(first) => first.clone(),
            None => {
                tracing::error!(
                    target: TRACING_TARGET_CHANNEL,
                    error = %reason,
                    pending = self.pending.len(),
                    "Compute endpoint failed to initialize, rejecting all requests"
                );
                self.failure = Some(reason.clone());
                reason
            }
        };

        self.reject_all(|| WorkerError::initialization(reason.clone()));
    }

    fn reject_all(&mut self, error: impl Fn() -> WorkerError) {
        self.latest = None;
        self.cancelled.clear();
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(error()));
        }
    }
}
