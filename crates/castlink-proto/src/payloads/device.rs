//! Cast target payloads.

use serde::{Deserialize, Serialize};

/// A cast target known to the host.
///
/// Identity is `id`. Device lists are always replaced wholesale; entries are
/// never merged field-by-field across updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastDevice {
    /// Host-assigned device id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Device family (e.g. `chromecast`).
    #[serde(rename = "type")]
    pub device_type: String,
    /// Whether this device currently hosts our session.
    pub is_connected: bool,
}

impl CastDevice {
    /// Create a disconnected device.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type: device_type.into(),
            is_connected: false,
        }
    }
}

/// `DEVICES_UPDATED` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesUpdatedPayload {
    /// Full replacement device list.
    pub devices: Vec<CastDevice>,
}
