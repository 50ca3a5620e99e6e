//! Live stream sessions.
//!
//! A [`StreamSession`] owns exactly one connection to the backend's stream
//! endpoint for one [`SourceRef`], decodes every inbound message into a
//! [`StreamUpdate`] (frame plus stats) and hands it to the consumer in arrival
//! order. All failure causes collapse into a single `Closed` status; there is
//! no automatic reconnect.
//!
//! A [`StreamSlot`] is one display position that holds at most one session.
//! Re-opening a slot fully shuts down the previous session before the new
//! connection is attempted.

mod connector;
mod error;
mod parser;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::{MessageStream, StreamConnector, WsConnector};
pub use error::StreamError;
pub use parser::parse_message;
pub use types::*;

use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type UpdateFn = Box<dyn Fn(StreamUpdate) + Send + Sync>;
type StatusFn = Box<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Mutable part of a session, guarded so that a delivery and a close never
/// interleave.
struct Gate {
    status: ConnectionStatus,
    latest: Option<StreamUpdate>,
}

struct Shared {
    id: Uuid,
    source: SourceRef,
    gate: Mutex<Gate>,
    cancel: CancellationToken,
    on_update: UpdateFn,
    on_status: StatusFn,
}

impl Shared {
    fn gate(&self) -> MutexGuard<'_, Gate> {
        // A poisoned gate only means a consumer callback panicked; the data is still valid.
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Transition CONNECTING -> OPEN. Returns false if the session was closed meanwhile.
    fn mark_open(&self) -> bool {
        let mut gate = self.gate();
        if gate.status == ConnectionStatus::Closed {
            return false;
        }
        gate.status = ConnectionStatus::Open;
        (self.on_status)(ConnectionStatus::Open);
        true
    }

    /// Publish a decoded pair. Returns false once the session is closed.
    fn deliver(&self, update: StreamUpdate) -> bool {
        let mut gate = self.gate();
        if gate.status == ConnectionStatus::Closed {
            return false;
        }
        gate.latest = Some(update.clone());
        (self.on_update)(update);
        true
    }

    /// Transition to CLOSED exactly once.
    fn mark_closed(&self) -> bool {
        let mut gate = self.gate();
        if gate.status == ConnectionStatus::Closed {
            return false;
        }
        gate.status = ConnectionStatus::Closed;
        self.cancel.cancel();
        (self.on_status)(ConnectionStatus::Closed);
        true
    }
}

/// Handle to one live connection bound to a source.
///
/// Dropping the handle closes the session. Callbacks run on the session's
/// task and must not close their own session.
pub struct StreamSession {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl StreamSession {
    /// Open a session for `source`.
    ///
    /// `on_update` receives every successfully decoded message; `on_status`
    /// fires `Open` after the handshake and `Closed` once on any termination.
    /// Must be called from within a tokio runtime.
    pub fn open<U, S>(
        connector: Arc<dyn StreamConnector>,
        source: SourceRef,
        on_update: U,
        on_status: S,
    ) -> Self
    where
        U: Fn(StreamUpdate) + Send + Sync + 'static,
        S: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            source,
            gate: Mutex::new(Gate {
                status: ConnectionStatus::Connecting,
                latest: None,
            }),
            cancel: CancellationToken::new(),
            on_update: Box::new(on_update),
            on_status: Box::new(on_status),
        });

        tracing::debug!(
            session_id = %shared.id,
            source = %shared.source,
            "Opening stream session"
        );

        let task = tokio::spawn(run_session(Arc::clone(&shared), connector));

        Self {
            shared,
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn source(&self) -> &SourceRef {
        &self.shared.source
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.gate().status
    }

    /// Most recent frame and stats pair, if any message has been decoded.
    pub fn latest(&self) -> Option<StreamUpdate> {
        self.shared.gate().latest.clone()
    }

    /// Close the session. Idempotent.
    ///
    /// Once this returns no further callbacks are observed; the connection
    /// itself is released by the session task shortly after.
    pub fn close(&self) {
        if self.shared.mark_closed() {
            tracing::debug!(
                session_id = %self.shared.id,
                source = %self.shared.source,
                "Stream session closed"
            );
        }
    }

    /// Close the session and wait until its connection has been released.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(
                    session_id = %self.shared.id,
                    error = %e,
                    "Stream session task ended abnormally"
                );
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.shared.id)
            .field("source", &self.shared.source)
            .field("status", &self.status())
            .finish()
    }
}

async fn run_session(shared: Arc<Shared>, connector: Arc<dyn StreamConnector>) {
    let connected = tokio::select! {
        biased;
        _ = shared.cancel.cancelled() => return,
        result = connector.connect(&shared.source) => result,
    };

    let mut messages = match connected {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(
                session_id = %shared.id,
                source = %shared.source,
                error = %e,
                "Stream connection failed"
            );
            shared.mark_closed();
            return;
        }
    };

    if !shared.mark_open() {
        return;
    }
    tracing::info!(session_id = %shared.id, source = %shared.source, "Stream connected");

    loop {
        let next = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            next = messages.next() => next,
        };

        match next {
            Some(Ok(text)) => match parse_message(&text) {
                Ok(update) => {
                    if !shared.deliver(update) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        session_id = %shared.id,
                        error = %e,
                        "Dropping malformed stream message"
                    );
                }
            },
            Some(Err(StreamError::Malformed(reason))) => {
                tracing::debug!(
                    session_id = %shared.id,
                    error = %reason,
                    "Dropping undecodable stream frame"
                );
            }
            Some(Err(e)) => {
                tracing::warn!(session_id = %shared.id, error = %e, "Stream transport error");
                break;
            }
            None => {
                tracing::info!(session_id = %shared.id, "Stream closed by backend");
                break;
            }
        }
    }

    drop(messages);
    shared.mark_closed();
}

/// One display position owning at most one [`StreamSession`].
pub struct StreamSlot {
    name: &'static str,
    connector: Arc<dyn StreamConnector>,
    session: Option<StreamSession>,
}

impl StreamSlot {
    pub fn new(name: &'static str, connector: Arc<dyn StreamConnector>) -> Self {
        Self {
            name,
            connector,
            session: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Bind the slot to `source`, replacing any previous session.
    ///
    /// The previous connection is fully released before the new one is opened.
    pub async fn open<U, S>(&mut self, source: SourceRef, on_update: U, on_status: S)
    where
        U: Fn(StreamUpdate) + Send + Sync + 'static,
        S: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.close().await;
        tracing::debug!(slot = self.name, source = %source, "Binding slot to source");
        self.session = Some(StreamSession::open(
            Arc::clone(&self.connector),
            source,
            on_update,
            on_status,
        ));
    }

    /// Shut down the slot's session, if any.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    pub fn source(&self) -> Option<&SourceRef> {
        self.session.as_ref().map(|s| s.source())
    }

    pub fn is_bound(&self) -> bool {
        self.session.is_some()
    }
}
