//! Dashboard controller.
//!
//! [`DashboardController`] owns the stream slots, the polling scheduler and
//! the alert notifiers, and publishes everything presentation needs through
//! [`DashboardWatch`]. Which sessions and schedules run is derived from the
//! active [`View`]; every state change that affects it reconciles before
//! returning, so no background work from a previous view survives a switch.
//!
//! # Example
//!
//! ```no_run
//! use traffic_guard::config::TrafficGuardConfig;
//! use traffic_guard::dashboard::{DashboardController, View};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = DashboardController::from_config(&TrafficGuardConfig::default())?;
//! controller.start().await;
//! controller.set_active_view(View::Admin).await;
//! let logs = controller.logs();
//! controller.dispose().await;
//! # Ok(())
//! # }
//! ```

mod state;
mod view;


pub use state::{DashboardWatch, SlotState};
pub use view::{Resource, Slot, View};

use crate::alert::{speech_from_config, AlertNotifier, SpeakCommand, SpeechOutput};
use crate::client::{
    AnalysisResult, BackendApi, BackendClient, ClientError, DailyAnalytics, LogRecord,
};
use crate::config::{AlertConfig, AlertScope, PollingConfig, TrafficGuardConfig};
use crate::polling::PollingScheduler;
use crate::stream::{
    ConnectionStatus, SourceRef, StatsSnapshot, StreamConnector, StreamError, StreamSlot,
    StreamUpdate, WsConnector,
};
use state::Cells;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::time::Instant;

/// Errors building a controller from configuration.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Alert notifiers, one per slot or one shared, per [`AlertScope`].
struct AlertRouter {
    scope: AlertScope,
    live: Mutex<AlertNotifier>,
    upload: Mutex<AlertNotifier>,
}

impl AlertRouter {
    fn new(config: &AlertConfig) -> Self {
        Self {
            scope: config.scope,
            live: Mutex::new(AlertNotifier::from_config(config)),
            upload: Mutex::new(AlertNotifier::from_config(config)),
        }
    }

    fn consider(
        &self,
        slot: Slot,
        alert: Option<&str>,
        enabled: bool,
        now: Instant,
    ) -> Option<SpeakCommand> {
        let notifier = match (self.scope, slot) {
            (AlertScope::Shared, _) | (AlertScope::PerSlot, Slot::Live) => &self.live,
            (AlertScope::PerSlot, Slot::Upload) => &self.upload,
        };
        notifier
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .consider(alert, enabled, now)
    }
}

/// Everything a slot's session callbacks need; never touches controller state.
#[derive(Clone)]
struct SlotSink {
    slot: Slot,
    cells: Arc<Cells>,
    alerts: Arc<AlertRouter>,
    speech: Arc<dyn SpeechOutput>,
    voice_enabled: Arc<AtomicBool>,
}

impl SlotSink {
    fn on_update(&self, update: StreamUpdate) {
        let alert = update.stats.active_alert().map(str::to_owned);
        self.cells
            .slot(self.slot)
            .send_modify(|state| state.latest = Some(update));

        let enabled = self.voice_enabled.load(Ordering::SeqCst);
        if let Some(command) =
            self.alerts
                .consider(self.slot, alert.as_deref(), enabled, Instant::now())
        {
            tracing::info!(slot = self.slot.name(), alert = %command.text, "Announcing alert");
            self.speech.speak(command);
        }
    }

    fn on_status(&self, status: ConnectionStatus) {
        tracing::debug!(slot = self.slot.name(), %status, "Slot connection status");
        self.cells
            .slot(self.slot)
            .send_modify(|state| state.status = status);
    }
}

struct Inner {
    view: View,
    live_source: SourceRef,
    upload_source: Option<SourceRef>,
    live: StreamSlot,
    upload: StreamSlot,
    disposed: bool,
}

impl Inner {
    fn slot_mut(&mut self, slot: Slot) -> &mut StreamSlot {
        match slot {
            Slot::Live => &mut self.live,
            Slot::Upload => &mut self.upload,
        }
    }

    fn selected_source(&self, slot: Slot) -> Option<SourceRef> {
        match slot {
            Slot::Live => Some(self.live_source.clone()),
            Slot::Upload => self.upload_source.clone(),
        }
    }
}

/// Composes stream sessions, alerting and polling into published view state.
pub struct DashboardController {
    api: Arc<dyn BackendApi>,
    polling: PollingConfig,
    scheduler: PollingScheduler,
    cells: Arc<Cells>,
    alerts: Arc<AlertRouter>,
    speech: Arc<dyn SpeechOutput>,
    voice_enabled: Arc<AtomicBool>,
    inner: tokio::sync::Mutex<Inner>,
}

impl DashboardController {
    /// Create a controller with explicit collaborators.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    pub fn new(
        config: &TrafficGuardConfig,
        api: Arc<dyn BackendApi>,
        connector: Arc<dyn StreamConnector>,
        speech: Arc<dyn SpeechOutput>,
    ) -> Self {
        let view = config.dashboard.default_view;
        let live_source = SourceRef::new(config.dashboard.default_source.clone());
        let cells = Arc::new(Cells::new(view, config.alerts.voice_enabled));
        cells
            .live
            .send_modify(|state| state.source = Some(live_source.clone()));

        Self {
            api,
            polling: config.polling.clone(),
            scheduler: PollingScheduler::new(),
            cells,
            alerts: Arc::new(AlertRouter::new(&config.alerts)),
            speech,
            voice_enabled: Arc::new(AtomicBool::new(config.alerts.voice_enabled)),
            inner: tokio::sync::Mutex::new(Inner {
                view,
                live_source,
                upload_source: None,
                live: StreamSlot::new(Slot::Live.name(), Arc::clone(&connector)),
                upload: StreamSlot::new(Slot::Upload.name(), connector),
                disposed: false,
            }),
        }
    }

    /// Create a controller talking to the configured backend.
    pub fn from_config(config: &TrafficGuardConfig) -> Result<Self, DashboardError> {
        let api = Arc::new(BackendClient::new(&config.backend)?);
        let connector = Arc::new(WsConnector::new(&config.backend.url)?);
        Ok(Self::new(
            config,
            api,
            connector,
            speech_from_config(&config.alerts),
        ))
    }

    /// Bring sessions and schedules in line with the initial view.
    pub async fn start(&self) {
        let mut inner = self.inner.lock().await;
        if inner.disposed {
            return;
        }
        tracing::info!(view = %inner.view, "Dashboard started");
        self.reconcile(&mut inner).await;
    }

    /// Switch the active view, stopping the old view's background work and
    /// starting the new one's before returning.
    pub async fn set_active_view(&self, view: View) {
        let mut inner = self.inner.lock().await;
        if inner.disposed || inner.view == view {
            return;
        }
        tracing::info!(from = %inner.view, to = %view, "Switching view");
        inner.view = view;
        self.cells.view.send_replace(view);
        self.reconcile(&mut inner).await;
    }

    /// Select the live source. An open live session for another source is
    /// shut down and replaced.
    pub async fn set_live_source(&self, source: SourceRef) {
        let mut inner = self.inner.lock().await;
        if inner.disposed {
            return;
        }
        if inner.live_source != source {
            tracing::info!(from = %inner.live_source, to = %source, "Changing live source");
        }
        inner.live_source = source.clone();
        self.cells
            .live
            .send_modify(|state| state.source = Some(source));
        self.reconcile(&mut inner).await;
    }

    pub fn set_voice_enabled(&self, enabled: bool) {
        self.voice_enabled.store(enabled, Ordering::SeqCst);
        self.cells.voice_enabled.send_replace(enabled);
        tracing::info!(enabled, "Voice alerts toggled");
    }

    /// Submit an image for analysis and publish the result.
    ///
    /// On failure the previously published result is left untouched.
    pub async fn analyze_image(&self, path: &Path) -> Result<AnalysisResult, ClientError> {
        match self.api.analyze_image(path).await {
            Ok(result) => {
                self.cells.image_result.send_replace(Some(result.clone()));
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Image analysis failed");
                Err(e)
            }
        }
    }

    /// Upload a video and bind the upload preview slot to it.
    ///
    /// The preview session opens immediately if the uploads view is active,
    /// otherwise when it next becomes active.
    pub async fn upload_video(&self, path: &Path) -> Result<SourceRef, ClientError> {
        let receipt = match self.api.upload_video(path).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Video upload failed");
                return Err(e);
            }
        };

        let source = SourceRef::new(receipt.filename);
        tracing::info!(source = %source, "Video uploaded");

        let mut inner = self.inner.lock().await;
        if !inner.disposed {
            inner.upload_source = Some(source.clone());
            let selected = source.clone();
            self.cells
                .upload
                .send_modify(|state| state.source = Some(selected));
            self.reconcile(&mut inner).await;
        }
        Ok(source)
    }

    /// Close every session and stop every schedule. Later calls are no-ops.
    pub async fn dispose(&self) {
        let mut inner = self.inner.lock().await;
        if inner.disposed {
            return;
        }
        inner.disposed = true;

        let Inner { live, upload, .. } = &mut *inner;
        futures::join!(self.scheduler.shutdown(), live.close(), upload.close());
        tracing::info!("Dashboard disposed");
    }

    /// Receivers for every published cell.
    pub fn subscribe(&self) -> DashboardWatch {
        self.cells.subscribe()
    }

    pub fn active_view(&self) -> View {
        *self.cells.view.borrow()
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled.load(Ordering::SeqCst)
    }

    pub fn live_state(&self) -> SlotState {
        self.cells.live.borrow().clone()
    }

    pub fn upload_state(&self) -> SlotState {
        self.cells.upload.borrow().clone()
    }

    pub fn live_stats(&self) -> Option<StatsSnapshot> {
        self.cells.live.borrow().stats().cloned()
    }

    pub fn upload_stats(&self) -> Option<StatsSnapshot> {
        self.cells.upload.borrow().stats().cloned()
    }

    pub fn image_result(&self) -> Option<AnalysisResult> {
        self.cells.image_result.borrow().clone()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.cells.logs.borrow().clone()
    }

    pub fn analytics_summary(&self) -> Option<DailyAnalytics> {
        self.cells.analytics.borrow().clone()
    }

    /// Resources with a running schedule.
    pub fn active_resources(&self) -> Vec<String> {
        self.scheduler.active_resources()
    }

    /// Stop what the view does not need, then start what it does.
    async fn reconcile(&self, inner: &mut Inner) {
        let wanted_resources = inner.view.polled_resources();
        for resource in Resource::ALL {
            if !wanted_resources.contains(&resource) {
                self.scheduler.stop(resource.id());
            }
        }

        let wanted_slot = inner.view.slot();
        for slot in [Slot::Live, Slot::Upload] {
            if wanted_slot != Some(slot) && inner.slot_mut(slot).is_bound() {
                inner.slot_mut(slot).close().await;
                tracing::debug!(slot = slot.name(), "Slot closed for inactive view");
            }
        }

        for resource in wanted_resources {
            if !self.scheduler.is_active(resource.id()) {
                self.start_polling(*resource);
            }
        }

        if let Some(slot) = wanted_slot {
            if let Some(source) = inner.selected_source(slot) {
                self.bind_slot(inner.slot_mut(slot), slot, source).await;
            }
        }
    }

    /// Open `source` on `slot` unless a live session for it already exists.
    async fn bind_slot(&self, stream_slot: &mut StreamSlot, slot: Slot, source: SourceRef) {
        let current = stream_slot
            .session()
            .map(|s| s.source() == &source && s.status() != ConnectionStatus::Closed)
            .unwrap_or(false);
        if current {
            return;
        }

        stream_slot.close().await;

        self.cells.slot(slot).send_replace(SlotState {
            source: Some(source.clone()),
            status: ConnectionStatus::Connecting,
            latest: None,
        });

        let sink = SlotSink {
            slot,
            cells: Arc::clone(&self.cells),
            alerts: Arc::clone(&self.alerts),
            speech: Arc::clone(&self.speech),
            voice_enabled: Arc::clone(&self.voice_enabled),
        };
        let status_sink = sink.clone();
        stream_slot
            .open(
                source,
                move |update| sink.on_update(update),
                move |status| status_sink.on_status(status),
            )
            .await;
    }

    fn start_polling(&self, resource: Resource) {
        let api = Arc::clone(&self.api);
        let cells = Arc::clone(&self.cells);

        match resource {
            Resource::Logs => {
                let limit = self.polling.logs_limit;
                self.scheduler.start(
                    resource.id(),
                    self.polling.logs_interval(),
                    move || {
                        let api = Arc::clone(&api);
                        async move { api.fetch_logs(limit).await }
                    },
                    move |records| {
                        cells.logs.send_replace(records);
                    },
                );
            }
            Resource::Analytics => {
                self.scheduler.start(
                    resource.id(),
                    self.polling.analytics_interval(),
                    move || {
                        let api = Arc::clone(&api);
                        async move { api.fetch_daily_analytics().await }
                    },
                    move |analytics| {
                        cells.analytics.send_replace(Some(analytics));
                    },
                );
            }
        }
    }
}
