// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored device as seen in one registry snapshot.
///
/// Identity is the `id` alone; `name` is informational and may be empty
/// until a later snapshot supplies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub connected: bool,
    pub last_heard: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, connected: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            connected,
            last_heard: None,
        }
    }

    /// Shorthand for an offline device.
    pub fn offline(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, false)
    }
}

/// The full, ordered device list returned by one registry fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    devices: Vec<Device>,
}

impl Snapshot {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of devices reported offline.
    pub fn offline_count(&self) -> usize {
        self.devices.iter().filter(|d| !d.connected).count()
    }
}

impl From<Vec<Device>> for Snapshot {
    fn from(devices: Vec<Device>) -> Self {
        Self::new(devices)
    }
}

impl FromIterator<Device> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
