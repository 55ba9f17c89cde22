// ── Monitor facade ──
//
// Owns the lifecycle of the three kinds of background work: the
// reconciliation loop, one outage timer per offline device, and the error
// sink. Every task holds a child of the root shutdown token and is spawned
// on a shared `TaskTracker`, which doubles as the outstanding-work counter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::alert::AlertSink;
use crate::config::{MonitorConfig, REPORT_QUEUE_CAPACITY};
use crate::error::CoreError;
use crate::model::ErrorReport;
use crate::reconciler::{ReconcileSummary, Reconciler};
use crate::sink::error_sink_task;
use crate::source::DeviceSource;
use crate::timeout::TimeoutManager;

// ── Monitor ─────────────────────────────────────────────────────────

/// The device liveness monitor.
///
/// Cheaply cloneable via `Arc<MonitorInner>`.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    timeouts: TimeoutManager,
    /// Taken by `start()`; its absence means the monitor already ran.
    reports_rx: Mutex<Option<mpsc::Receiver<ErrorReport>>>,
}

impl Monitor {
    /// Validate `config` and build an idle monitor.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let (reports_tx, reports_rx) = mpsc::channel(REPORT_QUEUE_CAPACITY);
        let timeouts = TimeoutManager::new(
            config.device_timeout,
            reports_tx,
            tracker.clone(),
            shutdown.clone(),
        );

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                shutdown,
                tracker,
                timeouts,
                reports_rx: Mutex::new(Some(reports_rx)),
            }),
        })
    }

    /// Registry of running outage timers.
    pub fn timeouts(&self) -> &TimeoutManager {
        &self.inner.timeouts
    }

    /// Number of background tasks still running.
    pub fn outstanding_tasks(&self) -> usize {
        self.inner.tracker.len()
    }

    /// A token cancelled when the monitor shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    /// Spawn the error sink and the reconciliation loop.
    ///
    /// The loop performs one fetch-and-reconcile immediately, then one per
    /// poll interval. Can only be called once.
    pub async fn start<S, A>(&self, source: S, sink: A) -> Result<(), CoreError>
    where
        S: DeviceSource,
        A: AlertSink,
    {
        let Some(reports_rx) = self.inner.reports_rx.lock().await.take() else {
            return Err(CoreError::AlreadyStarted);
        };

        let config = &self.inner.config;
        info!(
            poll_interval = %humantime::format_duration(config.poll_interval),
            device_timeout = %humantime::format_duration(config.device_timeout),
            allow_list = config.allow_list.len(),
            "starting device monitor"
        );

        self.inner.tracker.spawn(error_sink_task(
            sink,
            reports_rx,
            self.inner.shutdown.child_token(),
            config.alert_timeout,
        ));

        let reconciler = Reconciler::new(
            source,
            self.inner.timeouts.clone(),
            config.allow_list.clone(),
        );
        self.inner.tracker.spawn(reconcile_task(
            reconciler,
            config.poll_interval,
            self.inner.shutdown.child_token(),
        ));

        Ok(())
    }

    /// Stop polling, cancel every outage timer, drain the report queue, and
    /// wait until no background work remains.
    pub async fn shutdown(&self) {
        let pending = self.inner.timeouts.active_ids();
        if pending.is_empty() {
            debug!("shutting down device monitor");
        } else {
            info!(devices = ?pending, "shutting down device monitor, abandoning outage timers");
        }
        self.inner.shutdown.cancel();
        self.inner.timeouts.cancel_all();

        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        info!("device monitor stopped");
    }
}

// ── Background tasks ────────────────────────────────────────────────

/// Initial fetch, then one tick per `poll_interval` until cancelled.
///
/// An in-flight fetch is abandoned on shutdown.
async fn reconcile_task<S: DeviceSource>(
    mut reconciler: Reconciler<S>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::select! {
        biased;
        () = cancel.cancelled() => {}
        result = reconciler.tick() => log_tick(&result),
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = reconciler.tick() => log_tick(&result),
                }
            }
        }
    }

    let canceled = reconciler.timeouts().cancel_all();
    debug!(canceled, "reconciler stopped");
}

fn log_tick(result: &Result<ReconcileSummary, CoreError>) {
    match result {
        Ok(summary) if !summary.is_quiet() => info!(
            started = summary.started.len(),
            canceled = summary.canceled.len(),
            "device states changed"
        ),
        Ok(_) => {}
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "registry poll failed, keeping previous snapshot");
        }
        Err(e) => error!(error = %e, "registry poll cannot succeed until reconfigured"),
    }
}
