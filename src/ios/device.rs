//! Device records reported by the iOS companion app.
//!
//! Records arrive as JSON and are decoded once, at the boundary, into
//! [`DeviceRecord`]. Everything downstream works on the typed struct.

use crate::error::{IosError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::EnumString;

/// Battery charging state as reported by the device.
///
/// Unrecognised strings are kept verbatim in [`BatteryState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
pub enum BatteryState {
    #[strum(serialize = "Full")]
    Full,
    /// Not connected to power.
    #[strum(serialize = "Not Charging")]
    Unplugged,
    #[strum(serialize = "Charging")]
    Charging,
    #[strum(serialize = "Unknown")]
    Unknown,
    #[strum(default)]
    Other(String),
}

impl BatteryState {
    /// Wire string for this state.
    pub fn as_str(&self) -> &str {
        match self {
            BatteryState::Full => "Full",
            BatteryState::Unplugged => "Not Charging",
            BatteryState::Charging => "Charging",
            BatteryState::Unknown => "Unknown",
            BatteryState::Other(s) => s,
        }
    }

    /// Parse a wire string. Never fails: unknown strings become `Other`.
    pub fn parse(s: &str) -> Self {
        BatteryState::from_str(s).unwrap_or_else(|_| BatteryState::Other(s.to_string()))
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BatteryState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BatteryState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(BatteryState::parse(&s))
    }
}

/// Battery sub-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    /// Charge in percent.
    pub level: i32,
    pub state: BatteryState,
}

/// Device identity sub-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDetails {
    pub name: String,
    /// Hardware type, e.g. `iPhone10,6`.
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(rename = "permanentID")]
    pub permanent_id: String,
    #[serde(rename = "systemVersion")]
    pub system_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        rename = "localizedModel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub localized_model: Option<String>,
    #[serde(rename = "systemName", default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
}

/// Latest report from one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub device: DeviceDetails,
    pub battery: Battery,
}

impl DeviceRecord {
    /// Decode a raw record. `key` names the record in errors.
    pub fn from_value(key: &str, value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|source| IosError::DeviceDecode {
            key: key.to_string(),
            source,
        })
    }

    /// Decode a raw record from a JSON string.
    pub fn from_json(key: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| IosError::DeviceDecode {
            key: key.to_string(),
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.device.name
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{raw_record, record};
    use super::*;

    #[test]
    fn test_decode_record() {
        let rec = record("abc", "Tim's iPhone", 87, "Charging");
        assert_eq!(rec.device_id, "abc");
        assert_eq!(rec.name(), "Tim's iPhone");
        assert_eq!(rec.device.device_type, "iPhone10,6");
        assert_eq!(rec.device.permanent_id, "perm-abc");
        assert_eq!(rec.device.system_version, "17.4");
        assert_eq!(rec.device.system_name.as_deref(), Some("iOS"));
        assert_eq!(rec.battery.level, 87);
        assert_eq!(rec.battery.state, BatteryState::Charging);
    }

    #[test]
    fn test_battery_state_wire_strings() {
        assert_eq!(BatteryState::parse("Full"), BatteryState::Full);
        assert_eq!(BatteryState::parse("Not Charging"), BatteryState::Unplugged);
        assert_eq!(BatteryState::parse("Charging"), BatteryState::Charging);
        assert_eq!(BatteryState::parse("Unknown"), BatteryState::Unknown);
        assert_eq!(
            BatteryState::parse("Overheated"),
            BatteryState::Other("Overheated".to_string())
        );
        assert_eq!(BatteryState::Unplugged.to_string(), "Not Charging");
        assert_eq!(BatteryState::Other("Weird".into()).to_string(), "Weird");
    }

    #[test]
    fn test_other_state_survives_reencoding() {
        let rec = record("abc", "Phone", 50, "Overheated");
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["battery"]["state"], "Overheated");
        assert_eq!(value["device"]["permanentID"], "perm-abc");
        assert!(value.get("app").is_none());
    }

    #[test]
    fn test_missing_battery_level_names_device_and_field() {
        let mut raw = raw_record("abc", "Phone", 50, "Full");
        raw["battery"].as_object_mut().unwrap().remove("level");

        let err = DeviceRecord::from_value("abc", raw).unwrap_err();
        assert!(matches!(err, IosError::DeviceDecode { ref key, .. } if key == "abc"));
        let message = err.to_string();
        assert!(message.contains("abc"), "{message}");
        assert!(message.contains("level"), "{message}");
    }

    #[test]
    fn test_missing_device_subrecord_is_rejected() {
        let raw = serde_json::json!({
            "deviceId": "abc",
            "battery": { "level": 10, "state": "Full" }
        });
        let err = DeviceRecord::from_value("abc", raw).unwrap_err();
        assert!(err.to_string().contains("device"));
    }

    #[test]
    fn test_from_json() {
        let json = raw_record("xyz", "iPad", 12, "Not Charging").to_string();
        let rec = DeviceRecord::from_json("xyz", &json).unwrap();
        assert_eq!(rec.battery.state, BatteryState::Unplugged);
        assert!(DeviceRecord::from_json("xyz", "{not json").is_err());
    }
}
