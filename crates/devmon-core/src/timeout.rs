// ── Outage timers ──
//
// One lightweight task per offline device. Each task waits for the device
// timeout or its own cancellation token, whichever comes first. Active
// tasks are tracked in a mutex-guarded map keyed by device id; the lock is
// never held across an `.await`.
//
// A cancellation requested strictly before the deadline wins. Once the
// deadline has passed the fire wins and the report is emitted, so every
// outage produces at most one report.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::model::{Device, ErrorReport};

/// Result of [`TimeoutManager::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The task was stopped before its deadline; no report will be sent.
    Canceled,
    /// The deadline had already passed; the report stands.
    Expired,
    /// No task was active for this device.
    NotActive,
}

struct ActiveTimeout {
    generation: u64,
    deadline: Instant,
    device_name: String,
    offline_since: DateTime<Utc>,
    cancel: CancellationToken,
}

struct TimeoutInner {
    timeout: Duration,
    active: Mutex<HashMap<String, ActiveTimeout>>,
    next_generation: AtomicU64,
    reports: mpsc::Sender<ErrorReport>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

/// Registry of running outage timers.
///
/// Cheaply cloneable; every clone shares the same registry.
#[derive(Clone)]
pub struct TimeoutManager {
    inner: Arc<TimeoutInner>,
}

impl TimeoutManager {
    /// Create a manager whose tasks report into `reports`.
    ///
    /// Tasks are spawned on `tracker` and hold a child of `shutdown`.
    pub fn new(
        timeout: Duration,
        reports: mpsc::Sender<ErrorReport>,
        tracker: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(TimeoutInner {
                timeout,
                active: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                reports,
                tracker,
                shutdown,
            }),
        }
    }

    /// Start an outage timer for `device`.
    ///
    /// Returns `false` if one is already running; the existing outage keeps
    /// its original deadline.
    pub fn start(&self, device: &Device) -> bool {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.inner.timeout;
        let cancel = self.inner.shutdown.child_token();

        {
            let mut active = self.lock();
            if active.contains_key(&device.id) {
                return false;
            }
            active.insert(
                device.id.clone(),
                ActiveTimeout {
                    generation,
                    deadline,
                    device_name: device.name.clone(),
                    offline_since: Utc::now(),
                    cancel: cancel.clone(),
                },
            );
        }

        info!(
            device_id = %device.id,
            device_name = %device.name,
            timeout = %humantime::format_duration(self.inner.timeout),
            "device offline, outage timer started"
        );

        self.inner.tracker.spawn(run_timeout(
            self.clone(),
            device.id.clone(),
            generation,
            deadline,
            cancel,
        ));
        true
    }

    /// Record a newer name for a device with a running timer.
    pub fn refresh_name(&self, device: &Device) {
        if device.name.is_empty() {
            return;
        }
        if let Some(entry) = self.lock().get_mut(&device.id) {
            entry.device_name.clone_from(&device.name);
        }
    }

    /// Stop the timer for `device_id` if its deadline has not passed.
    pub fn cancel(&self, device_id: &str) -> CancelOutcome {
        self.cancel_at(device_id, Instant::now())
    }

    fn cancel_at(&self, device_id: &str, now: Instant) -> CancelOutcome {
        let removed = {
            let mut active = self.lock();
            match active.get(device_id) {
                None => return CancelOutcome::NotActive,
                Some(entry) if now >= entry.deadline => return CancelOutcome::Expired,
                Some(_) => active.remove(device_id),
            }
        };

        if let Some(entry) = removed {
            entry.cancel.cancel();
            debug!(device_id, generation = entry.generation, "outage timer canceled");
        }
        CancelOutcome::Canceled
    }

    /// Stop every running timer regardless of deadline. Used at shutdown.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<ActiveTimeout> = self.lock().drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.cancel.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "canceled all outage timers");
        }
        drained.len()
    }

    pub fn is_active(&self, device_id: &str) -> bool {
        self.lock().contains_key(device_id)
    }

    /// Deadline of the running timer for `device_id`.
    pub fn deadline(&self, device_id: &str) -> Option<Instant> {
        self.lock().get(device_id).map(|entry| entry.deadline)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ids with a running timer, sorted.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveTimeout>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the entry for `device_id` only if it still belongs to
    /// `generation`. Returns the removed entry.
    fn claim(&self, device_id: &str, generation: u64) -> Option<ActiveTimeout> {
        let mut active = self.lock();
        if active
            .get(device_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            active.remove(device_id)
        } else {
            None
        }
    }
}

// ── Timer task ───────────────────────────────────────────────────────

async fn run_timeout(
    manager: TimeoutManager,
    device_id: String,
    generation: u64,
    deadline: Instant,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;

        () = cancel.cancelled() => {
            if manager.claim(&device_id, generation).is_some() {
                debug!(device_id = %device_id, "outage timer stopped by shutdown");
            }
        }
        () = tokio::time::sleep_until(deadline) => {
            let Some(entry) = manager.claim(&device_id, generation) else {
                return;
            };

            let report = ErrorReport {
                device_id,
                device_name: entry.device_name,
                offline_since: entry.offline_since,
            };
            warn!(
                device_id = %report.device_id,
                device_name = %report.device_name,
                "device offline past timeout"
            );

            tokio::select! {
                biased;

                sent = manager.inner.reports.send(report) => {
                    if let Err(mpsc::error::SendError(report)) = sent {
                        warn!(device_id = %report.device_id, "report queue closed, dropping report");
                    }
                }
                () = cancel.cancelled() => {
                    warn!("shutdown while report queue full, dropping report");
                }
            }
        }
    }
}
