//! Published dashboard state.
//!
//! Every cell is a `watch` channel: presentation subscribes and always sees
//! the latest value, never a backlog.

use super::view::{Slot, View};
use crate::client::{AnalysisResult, DailyAnalytics, LogRecord};
use crate::stream::{ConnectionStatus, FramePayload, SourceRef, StatsSnapshot, StreamUpdate};
use tokio::sync::watch;

/// What one video slot shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotState {
    /// Source selected for the slot, whether or not it is connected
    pub source: Option<SourceRef>,
    pub status: ConnectionStatus,
    /// Last frame and stats pair received by the current session
    pub latest: Option<StreamUpdate>,
}

impl SlotState {
    pub fn stats(&self) -> Option<&StatsSnapshot> {
        self.latest.as_ref().map(|u| &u.stats)
    }

    pub fn frame(&self) -> Option<&FramePayload> {
        self.latest.as_ref().map(|u| &u.frame)
    }
}

impl Default for SlotState {
    fn default() -> Self {
        Self {
            source: None,
            status: ConnectionStatus::Closed,
            latest: None,
        }
    }
}

/// Sending halves of the published cells.
pub(crate) struct Cells {
    pub view: watch::Sender<View>,
    pub voice_enabled: watch::Sender<bool>,
    pub live: watch::Sender<SlotState>,
    pub upload: watch::Sender<SlotState>,
    pub image_result: watch::Sender<Option<AnalysisResult>>,
    pub logs: watch::Sender<Vec<LogRecord>>,
    pub analytics: watch::Sender<Option<DailyAnalytics>>,
}

impl Cells {
    pub fn new(view: View, voice_enabled: bool) -> Self {
        Self {
            view: watch::Sender::new(view),
            voice_enabled: watch::Sender::new(voice_enabled),
            live: watch::Sender::new(SlotState::default()),
            upload: watch::Sender::new(SlotState::default()),
            image_result: watch::Sender::new(None),
            logs: watch::Sender::new(Vec::new()),
            analytics: watch::Sender::new(None),
        }
    }

    pub fn slot(&self, slot: Slot) -> &watch::Sender<SlotState> {
        match slot {
            Slot::Live => &self.live,
            Slot::Upload => &self.upload,
        }
    }

    pub fn subscribe(&self) -> DashboardWatch {
        DashboardWatch {
            view: self.view.subscribe(),
            voice_enabled: self.voice_enabled.subscribe(),
            live: self.live.subscribe(),
            upload: self.upload.subscribe(),
            image_result: self.image_result.subscribe(),
            logs: self.logs.subscribe(),
            analytics: self.analytics.subscribe(),
        }
    }
}

/// Read-only handles to the published state, for presentation.
#[derive(Debug, Clone)]
pub struct DashboardWatch {
    pub view: watch::Receiver<View>,
    pub voice_enabled: watch::Receiver<bool>,
    pub live: watch::Receiver<SlotState>,
    pub upload: watch::Receiver<SlotState>,
    pub image_result: watch::Receiver<Option<AnalysisResult>>,
    pub logs: watch::Receiver<Vec<LogRecord>>,
    pub analytics: watch::Receiver<Option<DailyAnalytics>>,
}
