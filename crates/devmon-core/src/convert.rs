// ── API → domain conversions ──

use devmon_api::DeviceRecord;

use crate::model::Device;

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            connected: record.connected,
            last_heard: record.last_heard,
        }
    }
}
