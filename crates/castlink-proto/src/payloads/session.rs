//! Session status and error payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error code for session failures reported without a code of their own.
pub const SESSION_ERROR: &str = "SESSION_ERROR";

/// Host-reported or locally recorded failure.
///
/// Lives in state until explicitly reset; it never expires on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastError {
    /// Stable machine-readable code (e.g. `BRIDGE_TIMEOUT`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Free-form context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl CastError {
    /// Error without details.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), details: None }
    }

    /// Attach a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.get_or_insert_with(Map::new).insert(key.into(), value.into());
        self
    }
}

/// Session lifecycle reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Host is opening a session.
    Connecting,
    /// Session is live on the device.
    Connected,
    /// Session ended normally.
    Terminated,
    /// Session failed.
    Error,
}

/// `SESSION_UPDATED` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdatedPayload {
    /// New session status.
    pub status: SessionStatus,
    /// Device the session runs on.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Device display name.
    #[serde(default)]
    pub device_name: Option<String>,
    /// Host session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Failure details for [`SessionStatus::Error`].
    #[serde(default)]
    pub error: Option<CastError>,
}

impl SessionUpdatedPayload {
    /// Event with only a status.
    pub fn new(status: SessionStatus) -> Self {
        Self { status, device_id: None, device_name: None, session_id: None, error: None }
    }

    /// `connected` event for a device and session.
    pub fn connected(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            status: SessionStatus::Connected,
            device_id: Some(device_id.into()),
            device_name: Some(device_name.into()),
            session_id: Some(session_id.into()),
            error: None,
        }
    }

    /// Semantic checks serde cannot express.
    ///
    /// A `connected` event must name both the device and the session,
    /// otherwise it would produce a casting state without a session.
    pub fn check(&self) -> Result<(), String> {
        if self.status == SessionStatus::Connected {
            if self.session_id.as_deref().is_none_or(str::is_empty) {
                return Err("connected status requires sessionId".into());
            }
            if self.device_id.as_deref().is_none_or(str::is_empty) {
                return Err("connected status requires deviceId".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_uses_lowercase_names() {
        let payload: SessionUpdatedPayload =
            serde_json::from_value(json!({ "status": "terminated" })).unwrap();
        assert_eq!(payload.status, SessionStatus::Terminated);
        assert!(payload.check().is_ok());
    }

    #[test]
    fn status_outside_enum_is_rejected() {
        let result = serde_json::from_value::<SessionUpdatedPayload>(json!({ "status": "paused" }));
        assert!(result.is_err());
    }

    #[test]
    fn connected_requires_session_id() {
        let mut payload = SessionUpdatedPayload::connected("d1", "TV", "s1");
        assert!(payload.check().is_ok());

        payload.session_id = None;
        assert!(payload.check().is_err());
    }

    #[test]
    fn error_details_are_preserved() {
        let error = CastError::new("X", "y").with_detail("attempt", 2);
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["details"]["attempt"], json!(2));
    }
}
