//! Liveness monitoring for a fleet of remote devices.
//!
//! This crate owns the domain model and the concurrent machinery that turns
//! periodic registry snapshots into outage reports:
//!
//! - **[`Monitor`]**: Facade managing the full lifecycle:
//!   [`start()`](Monitor::start) runs one immediate fetch-and-reconcile, then
//!   spawns the polling loop and the error sink;
//!   [`shutdown()`](Monitor::shutdown) cancels everything and waits for the
//!   work counter to drain.
//!
//! - **[`Reconciler`]**: Diffs each new [`Snapshot`] against the previous
//!   one and drives the outage timers, honoring the [`AllowList`].
//!
//! - **[`TimeoutManager`]**: One deferred task per offline device, with a
//!   deterministic fire-versus-cancel rule and a mutex-guarded registry.
//!
//! - **[`DeviceSource`] / [`AlertSink`]**: Seams to the registry and the
//!   alerting service. Implemented for the `devmon-api` clients.

pub mod alert;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod monitor;
pub mod reconciler;
pub mod sink;
pub mod source;
pub mod timeout;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alert::{AlertSink, LogSink};
pub use config::{AllowList, MonitorConfig, RegistryConfig, ReportingConfig};
pub use error::CoreError;
pub use model::{Device, ErrorReport, Snapshot};
pub use monitor::Monitor;
pub use reconciler::{ReconcileSummary, Reconciler};
pub use source::DeviceSource;
pub use timeout::{CancelOutcome, TimeoutManager};
