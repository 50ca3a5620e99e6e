//! View-scoped background polling.
//!
//! [`PollingScheduler`] runs one periodic fetch-and-publish loop per resource.
//! At most one fetch per resource is outstanding at any time: a tick that
//! arrives while the previous fetch is still running is skipped, never
//! queued. Stopping a resource is immediate from the caller's point of view;
//! a fetch that was in flight is dropped and its result never published.


use crate::client::ClientError;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Shortest accepted polling period; `tokio::time::interval` rejects zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Receives fetch failures; the schedule keeps running afterwards.
pub type ErrorSink = Arc<dyn Fn(&str, &ClientError) + Send + Sync>;

/// State shared between a schedule's owner and its task.
struct ScheduleShared {
    active: Mutex<bool>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
}

impl ScheduleShared {
    fn new() -> Self {
        Self {
            active: Mutex::new(true),
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    fn active(&self) -> std::sync::MutexGuard<'_, bool> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn halt(&self) {
        let mut active = self.active();
        *active = false;
        self.cancel.cancel();
    }

    /// Run `f` only while the schedule is still active.
    fn while_active(&self, f: impl FnOnce()) -> bool {
        let active = self.active();
        if !*active {
            return false;
        }
        f();
        true
    }
}

struct Schedule {
    interval: Duration,
    shared: Arc<ScheduleShared>,
    task: JoinHandle<()>,
}

/// Periodic fetch-and-publish loops keyed by resource id.
pub struct PollingScheduler {
    schedules: DashMap<String, Schedule>,
    error_sink: ErrorSink,
}

impl PollingScheduler {
    pub fn new() -> Self {
        Self {
            schedules: DashMap::new(),
            error_sink: Arc::new(|resource, error| {
                tracing::warn!(resource = resource, error = %error, "Polling fetch failed");
            }),
        }
    }

    /// Route fetch failures to `sink` instead of the log.
    pub fn with_error_sink<E>(mut self, sink: E) -> Self
    where
        E: Fn(&str, &ClientError) + Send + Sync + 'static,
    {
        self.error_sink = Arc::new(sink);
        self
    }

    /// Start polling `resource_id`: fetch immediately, then every `interval`.
    ///
    /// An existing schedule for the same resource is stopped first, so the
    /// new one always begins with a fresh immediate fetch. An interval below
    /// [`MIN_INTERVAL`] is raised to it. Must be called from within a tokio
    /// runtime.
    pub fn start<T, F, Fut, P>(
        &self,
        resource_id: impl Into<String>,
        interval: Duration,
        fetch: F,
        publish: P,
    ) where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
        P: Fn(T) + Send + Sync + 'static,
    {
        let resource_id = resource_id.into();
        self.stop(&resource_id);

        if interval < MIN_INTERVAL {
            tracing::warn!(
                resource = %resource_id,
                interval_ms = interval.as_millis() as u64,
                "Polling interval too short, using minimum"
            );
        }
        let interval = interval.max(MIN_INTERVAL);

        let shared = Arc::new(ScheduleShared::new());
        let task = tokio::spawn(run_schedule(
            resource_id.clone(),
            interval,
            fetch,
            publish,
            Arc::clone(&shared),
            Arc::clone(&self.error_sink),
        ));

        tracing::info!(
            resource = %resource_id,
            interval_ms = interval.as_millis() as u64,
            "Polling started"
        );

        let schedule = Schedule {
            interval,
            shared,
            task,
        };
        if let Some(previous) = self.schedules.insert(resource_id, schedule) {
            previous.shared.halt();
        }
    }

    /// Stop polling `resource_id`. Returns false if it was not active.
    ///
    /// No `publish` call for this resource begins after this returns.
    pub fn stop(&self, resource_id: &str) -> bool {
        match self.schedules.remove(resource_id) {
            Some((_, schedule)) => {
                schedule.shared.halt();
                tracing::info!(resource = resource_id, "Polling stopped");
                true
            }
            None => false,
        }
    }

    /// Stop every schedule.
    pub fn stop_all(&self) {
        for resource_id in self.active_resources() {
            self.stop(&resource_id);
        }
    }

    /// Stop every schedule and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        let mut tasks = Vec::new();
        for resource_id in self.active_resources() {
            if let Some((_, schedule)) = self.schedules.remove(&resource_id) {
                schedule.shared.halt();
                tasks.push(schedule.task);
            }
        }
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Polling task ended abnormally");
            }
        }
    }

    pub fn is_active(&self, resource_id: &str) -> bool {
        self.schedules.contains_key(resource_id)
    }

    /// Whether a fetch for `resource_id` is outstanding right now.
    pub fn is_in_flight(&self, resource_id: &str) -> bool {
        self.schedules
            .get(resource_id)
            .map(|s| s.shared.in_flight.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn interval(&self, resource_id: &str) -> Option<Duration> {
        self.schedules.get(resource_id).map(|s| s.interval)
    }

    /// Resource ids with a running schedule, sorted.
    pub fn active_resources(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.schedules.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        for entry in self.schedules.iter() {
            entry.value().shared.halt();
        }
    }
}

async fn run_schedule<T, F, Fut, P>(
    resource_id: String,
    interval: Duration,
    fetch: F,
    publish: P,
    shared: Arc<ScheduleShared>,
    error_sink: ErrorSink,
) where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    P: Fn(T) + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut pending: Option<Pin<Box<Fut>>> = None;

    loop {
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            result = async { pending.as_mut().unwrap().await }, if pending.is_some() => {
                pending = None;
                shared.in_flight.store(false, Ordering::SeqCst);
                match result {
                    Ok(value) => {
                        if !shared.while_active(|| publish(value)) {
                            break;
                        }
                    }
                    Err(error) => {
                        shared.while_active(|| error_sink(&resource_id, &error));
                    }
                }
            }
            _ = ticker.tick() => {
                if pending.is_some() {
                    tracing::debug!(resource = %resource_id, "Previous fetch still in flight, skipping tick");
                } else {
                    shared.in_flight.store(true, Ordering::SeqCst);
                    pending = Some(Box::pin(fetch()));
                }
            }
        }
    }

    shared.in_flight.store(false, Ordering::SeqCst);
    tracing::debug!(resource = %resource_id, "Polling task finished");
}
