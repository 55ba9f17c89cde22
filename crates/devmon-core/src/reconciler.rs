// ── Snapshot reconciliation ──
//
// Diffs each fetched snapshot against the previous one and drives the
// outage timers. Decisions are applied in device-list order; devices that
// vanished from the registry are handled afterwards, in the order they
// appeared in the previous snapshot.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::AllowList;
use crate::error::CoreError;
use crate::model::{Device, Snapshot};
use crate::source::DeviceSource;
use crate::timeout::{CancelOutcome, TimeoutManager};

/// What a single reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Devices in the snapshot that pass the allow-list.
    pub monitored: usize,
    /// Ids whose outage timer was started this pass.
    pub started: Vec<String>,
    /// Ids whose outage timer was canceled before its deadline.
    pub canceled: Vec<String>,
    /// Monitored ids present last time but missing now.
    pub vanished: Vec<String>,
}

impl ReconcileSummary {
    /// `true` when no timer was started or canceled.
    pub fn is_quiet(&self) -> bool {
        self.started.is_empty() && self.canceled.is_empty()
    }
}

/// Owns the previous snapshot and turns transitions into timer actions.
pub struct Reconciler<S> {
    source: S,
    timeouts: TimeoutManager,
    allow_list: AllowList,
    previous: Snapshot,
}

impl<S> Reconciler<S> {
    pub fn new(source: S, timeouts: TimeoutManager, allow_list: AllowList) -> Self {
        Self {
            source,
            timeouts,
            allow_list,
            previous: Snapshot::default(),
        }
    }

    pub fn timeouts(&self) -> &TimeoutManager {
        &self.timeouts
    }

    /// The last successfully fetched snapshot.
    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Apply `snapshot` and make it the new baseline.
    pub fn reconcile(&mut self, snapshot: Snapshot) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let previous: HashMap<&str, &Device> = self
            .previous
            .iter()
            .map(|device| (device.id.as_str(), device))
            .collect();

        for device in &snapshot {
            if !self.allow_list.monitors(&device.id) {
                continue;
            }
            summary.monitored += 1;

            if device.connected {
                match self.timeouts.cancel(&device.id) {
                    CancelOutcome::Canceled => {
                        info!(
                            device_id = %device.id,
                            device_name = %device.name,
                            "device back online"
                        );
                        summary.canceled.push(device.id.clone());
                    }
                    CancelOutcome::Expired => {
                        info!(
                            device_id = %device.id,
                            device_name = %device.name,
                            "device back online, outage already reported"
                        );
                    }
                    CancelOutcome::NotActive => {}
                }
                continue;
            }

            let was_online = previous
                .get(device.id.as_str())
                .is_none_or(|prev| prev.connected);
            if was_online {
                if self.timeouts.start(device) {
                    summary.started.push(device.id.clone());
                }
            } else {
                self.timeouts.refresh_name(device);
            }
        }

        let current: HashSet<&str> = snapshot.iter().map(|device| device.id.as_str()).collect();
        for prev in self.previous.iter() {
            if !self.allow_list.monitors(&prev.id) || current.contains(prev.id.as_str()) {
                continue;
            }
            summary.vanished.push(prev.id.clone());

            if prev.connected {
                info!(
                    device_id = %prev.id,
                    device_name = %prev.name,
                    "device vanished from registry, treating as offline"
                );
                let implicit = Device {
                    connected: false,
                    ..prev.clone()
                };
                if self.timeouts.start(&implicit) {
                    summary.started.push(prev.id.clone());
                }
            } else {
                debug!(device_id = %prev.id, "offline device vanished from registry");
            }
        }

        debug!(
            monitored = summary.monitored,
            started = summary.started.len(),
            canceled = summary.canceled.len(),
            vanished = summary.vanished.len(),
            active = self.timeouts.len(),
            "snapshot reconciled"
        );

        self.previous = snapshot;
        summary
    }
}

impl<S: DeviceSource> Reconciler<S> {
    /// Fetch a snapshot and reconcile it.
    ///
    /// On failure nothing changes: the previous snapshot stays the baseline.
    pub async fn tick(&mut self) -> Result<ReconcileSummary, CoreError> {
        let snapshot = self.source.fetch().await?;
        Ok(self.reconcile(snapshot))
    }
}
