//! In-memory connector used by unit tests.

use super::{MessageStream, SourceRef, StreamConnector, StreamError};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Decrements the live-connection counter when the message stream is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connector whose connections are fed by the test through [`FakeConnector::send`].
#[derive(Default)]
pub struct FakeConnector {
    live: Arc<AtomicUsize>,
    opened: Mutex<Vec<SourceRef>>,
    senders: Mutex<Vec<(SourceRef, mpsc::UnboundedSender<Result<String, StreamError>>)>>,
    refused: Mutex<HashSet<String>>,
    connect_delay: Mutex<Option<Duration>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connections currently held open by sessions.
    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Every source a handshake was completed for, in order.
    pub fn opened(&self) -> Vec<SourceRef> {
        self.opened.lock().unwrap().clone()
    }

    pub fn refuse(&self, source: &str) {
        self.refused.lock().unwrap().insert(source.to_string());
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = Some(delay);
    }

    /// Push a raw message to the most recent connection for `source`.
    pub fn send(&self, source: &str, message: &str) -> bool {
        self.sender_for(source)
            .map(|tx| tx.send(Ok(message.to_string())).is_ok())
            .unwrap_or(false)
    }

    /// Push a frame the transport could not decode as text.
    pub fn send_undecodable(&self, source: &str) -> bool {
        self.sender_for(source)
            .map(|tx| {
                tx.send(Err(StreamError::Malformed("invalid utf-8".into())))
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Fail the most recent connection for `source` with a transport error.
    pub fn fail(&self, source: &str) -> bool {
        self.sender_for(source)
            .map(|tx| tx.send(Err(StreamError::Transport("reset".into()))).is_ok())
            .unwrap_or(false)
    }

    /// End the most recent connection for `source` as if the backend closed it.
    pub fn hang_up(&self, source: &str) {
        let mut senders = self.senders.lock().unwrap();
        if let Some(pos) = senders.iter().rposition(|(s, _)| s.as_str() == source) {
            senders.remove(pos);
        }
    }

    fn sender_for(
        &self,
        source: &str,
    ) -> Option<mpsc::UnboundedSender<Result<String, StreamError>>> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| s.as_str() == source)
            .map(|(_, tx)| tx.clone())
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    async fn connect(&self, source: &SourceRef) -> Result<MessageStream, StreamError> {
        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.refused.lock().unwrap().contains(source.as_str()) {
            return Err(StreamError::ConnectionFailed("refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));
        self.opened.lock().unwrap().push(source.clone());
        self.senders.lock().unwrap().push((source.clone(), tx));

        let stream = futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|item| (item, (rx, guard)))
        });
        Ok(stream.boxed())
    }
}

/// Encode a stream message the way the backend does.
pub fn message(image: &str, total: u64, alert: Option<&str>) -> String {
    serde_json::json!({
        "image": image,
        "stats": {
            "total_vehicles": total,
            "density": "Low",
            "breakdown": {"Car": total},
            "alert": alert,
            "signal_state": "GREEN"
        }
    })
    .to_string()
}
