//! Stream session tests against a real websocket endpoint.

mod common;

use common::{stream_message, wait_until, MockBackend};
use std::sync::{Arc, Mutex};
use traffic_guard::stream::{
    ConnectionStatus, SourceRef, StreamSession, StreamSlot, StreamUpdate, WsConnector,
};

#[derive(Default, Clone)]
struct Recorder {
    updates: Arc<Mutex<Vec<StreamUpdate>>>,
    statuses: Arc<Mutex<Vec<ConnectionStatus>>>,
}

impl Recorder {
    fn open(&self, connector: Arc<WsConnector>, source: &str) -> StreamSession {
        let updates = Arc::clone(&self.updates);
        let statuses = Arc::clone(&self.statuses);
        StreamSession::open(
            connector,
            SourceRef::new(source),
            move |u| updates.lock().unwrap().push(u),
            move |s| statuses.lock().unwrap().push(s),
        )
    }

    fn updates(&self) -> Vec<StreamUpdate> {
        self.updates.lock().unwrap().clone()
    }

    fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

fn connector(backend: &MockBackend) -> Arc<WsConnector> {
    Arc::new(WsConnector::new(&backend.url).unwrap())
}

#[tokio::test]
async fn test_session_receives_frames_and_stats() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "webcam");

    wait_until("connection", || backend.live_connections() == 1).await;
    wait_until("open status", || session.status() == ConnectionStatus::Open).await;

    backend.push("webcam", &stream_message("ZnJhbWUx", 7, None));
    backend.push("webcam", &stream_message("ZnJhbWUy", 25, Some("Heavy congestion")));
    wait_until("two updates", || recorder.updates().len() == 2).await;

    let updates = recorder.updates();
    assert_eq!(updates[0].frame.as_base64(), "ZnJhbWUx");
    assert_eq!(updates[0].stats.total_count, 7);
    assert_eq!(updates[1].stats.active_alert(), Some("Heavy congestion"));
    assert_eq!(session.latest(), Some(updates[1].clone()));
    assert_eq!(recorder.statuses(), vec![ConnectionStatus::Open]);

    session.shutdown().await;
}

#[tokio::test]
async fn test_source_is_sent_as_query_parameter() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "rtsp://10.0.0.7/live?ch=2");

    wait_until("connection", || backend.live_connections() == 1).await;
    assert_eq!(backend.sources(), vec!["rtsp://10.0.0.7/live?ch=2".to_string()]);

    session.shutdown().await;
}

#[tokio::test]
async fn test_malformed_messages_are_skipped() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "webcam");
    wait_until("connection", || backend.live_connections() == 1).await;

    backend.push("webcam", "not json");
    backend.push("webcam", r#"{"image": "AA=="}"#);
    backend.push("webcam", &stream_message("AA==", 3, None));
    wait_until("valid update", || !recorder.updates().is_empty()).await;

    assert_eq!(recorder.updates().len(), 1);
    assert_eq!(session.status(), ConnectionStatus::Open);
    session.shutdown().await;
}

#[tokio::test]
async fn test_binary_json_frame_is_delivered() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "webcam");
    wait_until("connection", || backend.live_connections() == 1).await;
    wait_until("open status", || session.status() == ConnectionStatus::Open).await;

    backend.push_binary("webcam", stream_message("YmluYXJ5", 11, None).into_bytes());
    wait_until("binary update", || !recorder.updates().is_empty()).await;

    let updates = recorder.updates();
    assert_eq!(updates[0].frame.as_base64(), "YmluYXJ5");
    assert_eq!(updates[0].stats.total_count, 11);
    assert_eq!(session.status(), ConnectionStatus::Open);
    session.shutdown().await;
}

#[tokio::test]
async fn test_non_utf8_binary_frame_is_dropped() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "webcam");
    wait_until("connection", || backend.live_connections() == 1).await;
    wait_until("open status", || session.status() == ConnectionStatus::Open).await;

    backend.push_binary("webcam", vec![0xff, 0xfe, 0x00]);
    backend.push("webcam", &stream_message("AA==", 6, None));
    wait_until("valid update", || !recorder.updates().is_empty()).await;

    assert_eq!(recorder.updates().len(), 1);
    assert_eq!(recorder.updates()[0].stats.total_count, 6);
    assert_eq!(session.status(), ConnectionStatus::Open);
    assert_eq!(recorder.statuses(), vec![ConnectionStatus::Open]);
    assert_eq!(backend.live_connections(), 1);
    session.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_releases_server_connection() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "webcam");
    wait_until("connection", || backend.live_connections() == 1).await;

    session.shutdown().await;
    wait_until("disconnect", || backend.live_connections() == 0).await;

    // Nothing sent after close reaches the consumer
    backend.push("webcam", &stream_message("AA==", 3, None));
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(recorder.updates().is_empty());
    assert_eq!(
        recorder.statuses(),
        vec![ConnectionStatus::Open, ConnectionStatus::Closed]
    );
}

#[tokio::test]
async fn test_server_close_ends_session() {
    let backend = MockBackend::start().await;
    let recorder = Recorder::default();
    let session = recorder.open(connector(&backend), "cam1");
    wait_until("connection", || backend.live_connections() == 1).await;

    backend.close_streams("cam1");
    wait_until("closed status", || session.status() == ConnectionStatus::Closed).await;
    assert_eq!(
        recorder.statuses(),
        vec![ConnectionStatus::Open, ConnectionStatus::Closed]
    );
}

#[tokio::test]
async fn test_unreachable_backend_closes_without_opening() {
    // Bind then drop a listener to get a port nobody is serving
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = Arc::new(WsConnector::new(&format!("http://{}", addr)).unwrap());
    let recorder = Recorder::default();
    let session = recorder.open(connector, "webcam");

    wait_until("closed status", || session.status() == ConnectionStatus::Closed).await;
    assert_eq!(recorder.statuses(), vec![ConnectionStatus::Closed]);
    assert!(recorder.updates().is_empty());
}

#[tokio::test]
async fn test_slot_rebind_keeps_single_connection() {
    let backend = MockBackend::start().await;
    let mut slot = StreamSlot::new("live", connector(&backend));
    let recorder = Recorder::default();

    for source in ["webcam", "cam2", "cam3"] {
        let updates = Arc::clone(&recorder.updates);
        slot.open(
            SourceRef::new(source),
            move |u| updates.lock().unwrap().push(u),
            |_| {},
        )
        .await;
        wait_until("rebind", || {
            backend.sources().last().map(String::as_str) == Some(source)
        })
        .await;
        wait_until("single connection", || backend.live_connections() == 1).await;
    }

    backend.push("webcam", &stream_message("AA==", 1, None));
    backend.push("cam3", &stream_message("AA==", 3, None));
    wait_until("update", || !recorder.updates().is_empty()).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let totals: Vec<u64> = recorder
        .updates()
        .iter()
        .map(|u| u.stats.total_count)
        .collect();
    assert_eq!(totals, vec![3]);
    assert_eq!(slot.source(), Some(&SourceRef::new("cam3")));

    slot.close().await;
    wait_until("disconnect", || backend.live_connections() == 0).await;
}
