// ── Domain model ──
//
// Canonical types shared by the reconciler, the outage timers, and the
// error sink.

pub mod device;
pub mod report;

pub use device::{Device, Snapshot};
pub use report::ErrorReport;
