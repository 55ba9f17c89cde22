use chrono::{DateTime, Utc};
use serde::Serialize;

/// One sustained outage, produced only when an outage timer fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub device_id: String,
    pub device_name: String,
    /// When the device was first observed offline for this outage.
    pub offline_since: DateTime<Utc>,
}

impl ErrorReport {
    /// Human-readable alert text.
    pub fn message(&self) -> String {
        format!("Device is offline: {} ({})", self.device_name, self.device_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::ErrorReport;

    #[test]
    fn message_names_the_device() {
        let report = ErrorReport {
            device_id: "3a0029".into(),
            device_name: "greenhouse-north".into(),
            offline_since: Utc::now(),
        };
        assert_eq!(report.message(), "Device is offline: greenhouse-north (3a0029)");
    }
}
