// ── Device source seam ──
//
// The reconciler reads snapshots through this trait so tests can script
// registry responses without HTTP.

use std::future::Future;

use devmon_api::RegistryClient;

use crate::error::CoreError;
use crate::model::{Device, Snapshot};

/// Anything that can produce a full device snapshot.
pub trait DeviceSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, CoreError>> + Send;
}

impl DeviceSource for RegistryClient {
    async fn fetch(&self) -> Result<Snapshot, CoreError> {
        let records = self.list_devices().await?;
        Ok(records.into_iter().map(Device::from).collect())
    }
}
