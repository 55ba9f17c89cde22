use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// One device as listed by the registry.
///
/// The registry returns many more fields per device; only the ones the
/// monitor acts on are decoded and the rest are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    /// Blank until the device has been named; the registry sends `null`
    /// for unnamed devices.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    pub connected: bool,
    #[serde(default)]
    pub last_heard: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::DeviceRecord;

    #[test]
    fn null_and_missing_names_decode_as_empty() {
        let records: Vec<DeviceRecord> = serde_json::from_str(
            r#"[
                {"id": "a1", "name": null, "connected": true},
                {"id": "b2", "connected": false, "product_id": 6}
            ]"#,
        )
        .expect("valid payload");

        assert_eq!(records[0].name, "");
        assert_eq!(records[1].name, "");
        assert!(!records[1].connected);
    }

    #[test]
    fn missing_connected_flag_is_rejected() {
        let result: Result<Vec<DeviceRecord>, _> =
            serde_json::from_str(r#"[{"id": "a1", "name": "pump"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn last_heard_is_parsed() {
        let record: DeviceRecord = serde_json::from_str(
            r#"{"id": "a1", "name": "pump", "connected": true,
                "last_heard": "2024-06-15T10:30:00.000Z"}"#,
        )
        .expect("valid record");
        let heard = record.last_heard.expect("last_heard present");
        assert_eq!(heard.to_rfc3339(), "2024-06-15T10:30:00+00:00");
    }
}
