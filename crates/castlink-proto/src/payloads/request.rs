//! Request and acknowledgement payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CastDevice, CastError};

/// Error code used when the host declines without saying why.
pub const REQUEST_DECLINED: &str = "REQUEST_DECLINED";

fn accepted() -> bool {
    true
}

/// `READY` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    /// Game identifier.
    pub game_id: String,
    /// Room the player is in, when the game has rooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    /// URL the display should load, when the host streams a page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_url: Option<String>,
    /// Feature flags the game supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

impl ReadyPayload {
    /// Ready payload for a game with no optional fields.
    pub fn new(game_id: impl Into<String>) -> Self {
        Self { game_id: game_id.into(), ..Self::default() }
    }
}

/// `READY_RESPONSE`: casting availability and the initial device list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyResponsePayload {
    /// Whether casting is possible on this host.
    pub available: bool,
    /// Devices already known to the host.
    #[serde(default)]
    pub devices: Vec<CastDevice>,
    /// `false` when the host refused the request.
    #[serde(default = "accepted")]
    pub success: bool,
    /// Reason for a refusal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CastError>,
}

impl ReadyResponsePayload {
    /// Accepted response.
    pub fn new(available: bool, devices: Vec<CastDevice>) -> Self {
        Self { available, devices, success: true, error: None }
    }

    /// Refusal reason when the host declined the request.
    pub fn declined(&self) -> Option<CastError> {
        declined(self.success, self.error.as_ref())
    }
}

/// `START_SESSION` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionPayload {
    /// Target device id.
    pub device_id: String,
    /// State the display should start from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Value>,
}

/// `STATE_UPDATE` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdatePayload {
    /// Opaque game state forwarded to the display.
    pub state: Value,
    /// Sender wall clock in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Generic acknowledgement used by every `*_RESPONSE` except `READY_RESPONSE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckPayload {
    /// `false` when the host refused the request.
    #[serde(default = "accepted")]
    pub success: bool,
    /// Reason for a refusal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CastError>,
}

impl Default for AckPayload {
    fn default() -> Self {
        Self::ok()
    }
}

impl AckPayload {
    /// Successful acknowledgement.
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    /// Refusal with a reason.
    pub fn refused(error: CastError) -> Self {
        Self { success: false, error: Some(error) }
    }

    /// Refusal reason when the host declined the request.
    pub fn declined(&self) -> Option<CastError> {
        declined(self.success, self.error.as_ref())
    }
}

fn declined(success: bool, error: Option<&CastError>) -> Option<CastError> {
    if success {
        return None;
    }
    Some(
        error
            .cloned()
            .unwrap_or_else(|| CastError::new(REQUEST_DECLINED, "host declined the request")),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ack_defaults_to_success() {
        let ack: AckPayload = serde_json::from_value(json!({})).unwrap();
        assert!(ack.success);
        assert!(ack.declined().is_none());
    }

    #[test]
    fn refusal_without_reason_gets_default_code() {
        let ack: AckPayload = serde_json::from_value(json!({ "success": false })).unwrap();
        let error = ack.declined().unwrap();
        assert_eq!(error.code, REQUEST_DECLINED);
    }

    #[test]
    fn refusal_keeps_host_reason() {
        let ack: AckPayload = serde_json::from_value(json!({
            "success": false,
            "error": { "code": "DEVICE_BUSY", "message": "in use" }
        }))
        .unwrap();
        assert_eq!(ack.declined().unwrap().code, "DEVICE_BUSY");
    }

    #[test]
    fn ready_payload_omits_absent_optionals() {
        let value = serde_json::to_value(ReadyPayload::new("g1")).unwrap();
        assert_eq!(value, json!({ "gameId": "g1" }));
    }

    #[test]
    fn ready_response_devices_default_empty() {
        let response: ReadyResponsePayload =
            serde_json::from_value(json!({ "available": false })).unwrap();
        assert!(response.devices.is_empty());
        assert!(response.declined().is_none());
    }
}
