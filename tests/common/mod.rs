//! Shared test utilities for traffic-guard integration tests.
//!
//! Provides an in-process mock of the traffic-sensing backend: the `/ws/video`
//! stream endpoint plus the request/response endpoints, served by axum on an
//! ephemeral port.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use traffic_guard::config::TrafficGuardConfig;

// =============================================================================
// Message Builders
// =============================================================================

/// Encode a stream message the way the backend does.
pub fn stream_message(image: &str, total: u64, alert: Option<&str>) -> String {
    json!({
        "image": image,
        "stats": {
            "total_vehicles": total,
            "density": if total > 20 { "High" } else { "Low" },
            "breakdown": {"Car": total, "Bike": 0, "Bus": 0, "Truck": 0, "Person": 0},
            "alert": alert,
            "signal_state": if total > 20 { "RED" } else { "GREEN" }
        }
    })
    .to_string()
}

pub fn log_row(id: i64, alert: Option<&str>) -> Value {
    json!({
        "id": id,
        "timestamp": "2024-05-01T08:15:00",
        "density_status": "High",
        "total_vehicles": 25,
        "alert_type": alert,
        "vehicle_breakdown": {"Car": 20, "Bus": 5}
    })
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// =============================================================================
// Mock Backend
// =============================================================================

#[derive(Debug, Clone)]
enum Push {
    Text { source: String, text: String },
    Binary { source: String, bytes: Vec<u8> },
    Close { source: String },
}

struct MockState {
    pushes: broadcast::Sender<Push>,
    sources: Mutex<Vec<String>>,
    live: AtomicUsize,
    log_requests: AtomicUsize,
    analytics_requests: AtomicUsize,
    logs: Mutex<Vec<Value>>,
}

/// Decrements the live stream count when a socket handler exits.
struct LiveGuard(Arc<MockState>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockBackend {
    pub url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let (pushes, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            pushes,
            sources: Mutex::new(Vec::new()),
            live: AtomicUsize::new(0),
            log_requests: AtomicUsize::new(0),
            analytics_requests: AtomicUsize::new(0),
            logs: Mutex::new(vec![log_row(2, Some("Congestion")), log_row(1, None)]),
        });

        let app = Router::new()
            .route("/", get(root))
            .route("/ws/video", get(stream_handler))
            .route("/logs", get(logs))
            .route("/analytics/daily", get(analytics))
            .route("/analyze/image", post(analyze_image))
            .route("/upload/video", post(upload_video))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Configuration pointing every endpoint at this backend.
    pub fn config(&self) -> TrafficGuardConfig {
        let mut config = TrafficGuardConfig::default();
        config.backend.url = self.url.clone();
        config.backend.timeout_seconds = 5;
        config
    }

    /// Send a text frame to every open stream for `source`.
    pub fn push(&self, source: &str, text: &str) {
        let _ = self.state.pushes.send(Push::Text {
            source: source.to_string(),
            text: text.to_string(),
        });
    }

    /// Send a binary frame to every open stream for `source`.
    pub fn push_binary(&self, source: &str, bytes: impl Into<Vec<u8>>) {
        let _ = self.state.pushes.send(Push::Binary {
            source: source.to_string(),
            bytes: bytes.into(),
        });
    }

    /// Close every open stream for `source` from the server side.
    pub fn close_streams(&self, source: &str) {
        let _ = self.state.pushes.send(Push::Close {
            source: source.to_string(),
        });
    }

    pub fn live_connections(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Decoded `source` query values, one per accepted stream.
    pub fn sources(&self) -> Vec<String> {
        self.state.sources.lock().unwrap().clone()
    }

    pub fn log_requests(&self) -> usize {
        self.state.log_requests.load(Ordering::SeqCst)
    }

    pub fn analytics_requests(&self) -> usize {
        self.state.analytics_requests.load(Ordering::SeqCst)
    }
}

async fn root() -> Json<Value> {
    Json(json!({"message": "Traffic AI backend running"}))
}

async fn stream_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<MockState>>,
) -> Response {
    let source = params.get("source").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| handle_stream(socket, source, state))
}

async fn handle_stream(socket: WebSocket, source: String, state: Arc<MockState>) {
    let mut rx = state.pushes.subscribe();
    state.sources.lock().unwrap().push(source.clone());
    state.live.fetch_add(1, Ordering::SeqCst);
    let _guard = LiveGuard(Arc::clone(&state));

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            push = rx.recv() => match push {
                Ok(Push::Text { source: target, text }) if target == source => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Binary { source: target, bytes }) if target == source => {
                    if sender.send(Message::Binary(bytes)).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close { source: target }) if target == source => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn logs(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<MockState>>,
) -> Json<Value> {
    state.log_requests.fetch_add(1, Ordering::SeqCst);
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(50);
    let rows: Vec<Value> = state
        .logs
        .lock()
        .unwrap()
        .iter()
        .take(limit)
        .cloned()
        .collect();
    Json(Value::Array(rows))
}

async fn analytics(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.analytics_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "summary": {"Car": 120, "Bike": 30, "Bus": 8, "Truck": 12, "Person": 45},
        "trends": [
            {"hour": "08:00", "Car": 60, "Bus": 4},
            {"hour": "09:00", "Car": 60, "Bus": 4}
        ]
    }))
}

async fn analyze_image() -> Json<Value> {
    Json(json!({
        "image": "YW5ub3RhdGVk",
        "stats": {
            "total_vehicles": 3,
            "density": "Low",
            "breakdown": {"Car": 2, "Person": 1},
            "alert": null,
            "signal_state": "GREEN"
        }
    }))
}

/// Echo the uploaded file's name, the way the backend stores uploads.
async fn upload_video(body: Bytes) -> Json<Value> {
    let body = String::from_utf8_lossy(&body);
    let filename = body
        .split("filename=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap_or_default()
        .to_string();
    Json(json!({"filename": filename, "message": "Video uploaded successfully"}))
}
