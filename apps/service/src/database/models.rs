use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device type applied when registration leaves it out
pub const DEFAULT_DEVICE_TYPE: &str = "PC";

/// Liveness of a device as of its last refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl DeviceStatus {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable { Self::Online } else { Self::Offline }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Unknown => "Unknown",
            DeviceStatus::Online => "Online",
            DeviceStatus::Offline => "Offline",
        }
    }

    /// Map a stored column value, anything unrecognised reads as `Unknown`
    pub fn from_db(value: &str) -> Self {
        match value {
            "Online" => DeviceStatus::Online,
            "Offline" => DeviceStatus::Offline,
            _ => DeviceStatus::Unknown,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored device record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub device_type: String,
    pub location: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastChecked")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl Device {
    /// Address to probe, `None` when the record has no usable ip
    pub fn probe_address(&self) -> Option<&str> {
        self.ip.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// Record about to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub ip: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub location: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastChecked")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl NewDevice {
    /// Build a fresh record, applying the `PC` / empty-location defaults
    pub fn new(
        name: String,
        ip: String,
        device_type: Option<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            name,
            ip,
            device_type: device_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_DEVICE_TYPE.to_string()),
            location: location.unwrap_or_default(),
            status: DeviceStatus::Unknown,
            created_at: Utc::now(),
            last_checked: None,
        }
    }

    pub fn into_device(self, id: String) -> Device {
        Device {
            id,
            name: self.name,
            ip: Some(self.ip),
            device_type: self.device_type,
            location: self.location,
            status: self.status,
            created_at: self.created_at,
            last_checked: self.last_checked,
        }
    }
}

/// One entry of a batched status write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: String,
    pub status: DeviceStatus,
    pub checked_at: DateTime<Utc>,
}

pub(crate) fn timestamp_to_i64(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn i64_to_timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
