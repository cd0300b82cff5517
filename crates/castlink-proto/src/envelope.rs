//! Typed messages and their JSON envelope.
//!
//! The `type` field selects a [`MessageKind`]; the `payload` object is then
//! decoded into the struct for that kind. Decoding is the validator: a value
//! that decodes is a valid message, anything else is rejected with a
//! [`ProtocolError`].
//!
//! # Invariants
//!
//! - Kind uniqueness: each [`Message`] variant reports exactly one kind via
//!   [`Message::kind`], and [`Envelope::from_value`] only ever builds the
//!   variant named by `type`.
//! - Response kinds carry a request id; decoding rejects them otherwise.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    MessageKind, RequestId,
    errors::{ProtocolError, Result},
    payloads::{
        AckPayload, CastError, DevicesUpdatedPayload, ReadyPayload, ReadyResponsePayload,
        SessionUpdatedPayload, StartSessionPayload, StateUpdatePayload,
    },
};

/// Typed payload for every message kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `READY`
    Ready(ReadyPayload),
    /// `READY_RESPONSE`
    ReadyResponse(ReadyResponsePayload),
    /// `SCAN_DEVICES` (empty payload)
    ScanDevices,
    /// `SCAN_DEVICES_RESPONSE`
    ScanDevicesResponse(AckPayload),
    /// `START_SESSION`
    StartSession(StartSessionPayload),
    /// `START_SESSION_RESPONSE`
    StartSessionResponse(AckPayload),
    /// `END_SESSION` (empty payload)
    EndSession,
    /// `END_SESSION_RESPONSE`
    EndSessionResponse(AckPayload),
    /// `STATE_UPDATE`
    StateUpdate(StateUpdatePayload),
    /// `STATE_UPDATE_RESPONSE`
    StateUpdateResponse(AckPayload),
    /// `DEVICES_UPDATED`
    DevicesUpdated(DevicesUpdatedPayload),
    /// `SESSION_UPDATED`
    SessionUpdated(SessionUpdatedPayload),
    /// `ERROR`
    Error(CastError),
}

impl Message {
    /// Kind corresponding to this payload.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Ready(_) => MessageKind::Ready,
            Self::ReadyResponse(_) => MessageKind::ReadyResponse,
            Self::ScanDevices => MessageKind::ScanDevices,
            Self::ScanDevicesResponse(_) => MessageKind::ScanDevicesResponse,
            Self::StartSession(_) => MessageKind::StartSession,
            Self::StartSessionResponse(_) => MessageKind::StartSessionResponse,
            Self::EndSession => MessageKind::EndSession,
            Self::EndSessionResponse(_) => MessageKind::EndSessionResponse,
            Self::StateUpdate(_) => MessageKind::StateUpdate,
            Self::StateUpdateResponse(_) => MessageKind::StateUpdateResponse,
            Self::DevicesUpdated(_) => MessageKind::DevicesUpdated,
            Self::SessionUpdated(_) => MessageKind::SessionUpdated,
            Self::Error(_) => MessageKind::Error,
        }
    }

    /// Refusal carried by an acknowledgement. `None` for accepted acks and
    /// for every non-response message.
    pub fn declined(&self) -> Option<CastError> {
        match self {
            Self::ReadyResponse(ack) => ack.declined(),
            Self::ScanDevicesResponse(ack)
            | Self::StartSessionResponse(ack)
            | Self::EndSessionResponse(ack)
            | Self::StateUpdateResponse(ack) => ack.declined(),
            Self::Ready(_)
            | Self::ScanDevices
            | Self::StartSession(_)
            | Self::EndSession
            | Self::StateUpdate(_)
            | Self::DevicesUpdated(_)
            | Self::SessionUpdated(_)
            | Self::Error(_) => None,
        }
    }

    /// Payload as a JSON object.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if a payload fails to serialize
    pub fn payload_value(&self) -> Result<Value> {
        match self {
            Self::Ready(inner) => to_value(inner),
            Self::ReadyResponse(inner) => to_value(inner),
            Self::ScanDevices | Self::EndSession => Ok(Value::Object(Map::new())),
            Self::ScanDevicesResponse(inner)
            | Self::StartSessionResponse(inner)
            | Self::EndSessionResponse(inner)
            | Self::StateUpdateResponse(inner) => to_value(inner),
            Self::StartSession(inner) => to_value(inner),
            Self::StateUpdate(inner) => to_value(inner),
            Self::DevicesUpdated(inner) => to_value(inner),
            Self::SessionUpdated(inner) => to_value(inner),
            Self::Error(inner) => to_value(inner),
        }
    }

    /// Decode a payload object for a known kind.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPayload` if the payload does not match the
    ///   shape for `kind`
    pub fn decode(kind: MessageKind, payload: &Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(invalid(kind, "payload is not an object"));
        }

        let message = match kind {
            MessageKind::Ready => Self::Ready(from_value(kind, payload)?),
            MessageKind::ReadyResponse => Self::ReadyResponse(from_value(kind, payload)?),
            MessageKind::ScanDevices => Self::ScanDevices,
            MessageKind::ScanDevicesResponse => {
                Self::ScanDevicesResponse(from_value(kind, payload)?)
            },
            MessageKind::StartSession => Self::StartSession(from_value(kind, payload)?),
            MessageKind::StartSessionResponse => {
                Self::StartSessionResponse(from_value(kind, payload)?)
            },
            MessageKind::EndSession => Self::EndSession,
            MessageKind::EndSessionResponse => Self::EndSessionResponse(from_value(kind, payload)?),
            MessageKind::StateUpdate => Self::StateUpdate(from_value(kind, payload)?),
            MessageKind::StateUpdateResponse => {
                Self::StateUpdateResponse(from_value(kind, payload)?)
            },
            MessageKind::DevicesUpdated => Self::DevicesUpdated(from_value(kind, payload)?),
            MessageKind::SessionUpdated => {
                let inner: SessionUpdatedPayload = from_value(kind, payload)?;
                inner.check().map_err(|reason| invalid(kind, reason))?;
                Self::SessionUpdated(inner)
            },
            MessageKind::Error => Self::Error(from_value(kind, payload)?),
        };

        Ok(message)
    }
}

/// A message plus its optional correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Typed payload.
    pub message: Message,
    /// Correlation id; present on requests expecting a response and on the
    /// response itself.
    pub request_id: Option<RequestId>,
}

impl Envelope {
    /// Uncorrelated envelope.
    pub fn new(message: Message) -> Self {
        Self { message, request_id: None }
    }

    /// Envelope with a correlation id.
    pub fn with_request_id(message: Message, request_id: RequestId) -> Self {
        Self { message, request_id: Some(request_id) }
    }

    /// Message kind.
    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    /// Assign a fresh id if none is set, returning the id now in place.
    pub fn ensure_request_id(&mut self, generate: impl FnOnce() -> RequestId) -> &RequestId {
        self.request_id.get_or_insert_with(generate)
    }

    /// Build the JSON value sent over the channel.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if the payload fails to serialize
    pub fn to_value(&self) -> Result<Value> {
        let mut object = Map::new();
        object.insert("type".into(), Value::String(self.kind().as_str().into()));
        object.insert("payload".into(), self.message.payload_value()?);
        if let Some(id) = &self.request_id {
            object.insert("requestId".into(), Value::String(id.as_str().into()));
        }
        Ok(Value::Object(object))
    }

    /// Serialize to JSON text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if the payload fails to serialize
    pub fn encode(&self) -> Result<String> {
        let value = self.to_value()?;
        serde_json::to_string(&value).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse and validate an untrusted JSON value.
    ///
    /// A missing `payload` is treated as an empty object so that bare acks
    /// such as `{"type": "END_SESSION_RESPONSE", "requestId": "r1"}` are
    /// accepted.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::NotAnObject` if `value` is not an object
    /// - `ProtocolError::MissingType` / `UnknownType` for a bad discriminant
    /// - `ProtocolError::InvalidRequestId` for a non-string or empty id
    /// - `ProtocolError::MissingRequestId` for a response without an id
    /// - `ProtocolError::InvalidPayload` if the payload fails shape checks
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let name = object.get("type").and_then(Value::as_str).ok_or(ProtocolError::MissingType)?;
        let kind =
            MessageKind::from_wire(name).ok_or_else(|| ProtocolError::UnknownType(name.into()))?;

        let request_id = match object.get("requestId") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if !id.is_empty() => Some(RequestId::new(id.clone())),
            Some(_) => return Err(ProtocolError::InvalidRequestId),
        };

        if kind.is_response() && request_id.is_none() {
            return Err(ProtocolError::MissingRequestId { kind: kind.as_str() });
        }

        let empty = Value::Object(Map::new());
        let payload = object.get("payload").unwrap_or(&empty);
        let message = Message::decode(kind, payload)?;

        Ok(Self { message, request_id })
    }

    /// Parse and validate untrusted JSON text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if `text` is not JSON
    /// - any error of [`Envelope::from_value`]
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Json(e.to_string()))?;
        Self::from_value(&value)
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

fn to_value<T: Serialize>(inner: &T) -> Result<Value> {
    serde_json::to_value(inner).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn from_value<T: DeserializeOwned>(kind: MessageKind, payload: &Value) -> Result<T> {
    T::deserialize(payload).map_err(|e| invalid(kind, e.to_string()))
}

fn invalid(kind: MessageKind, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidPayload { kind: kind.as_str(), reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::payloads::{CastDevice, SessionStatus};

    #[test]
    fn ready_request_encodes_with_camel_case_keys() {
        let mut ready = ReadyPayload::new("g1");
        ready.room_code = Some("ABCD".into());
        let envelope = Envelope::with_request_id(Message::Ready(ready), "r1".into());

        let value = envelope.to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "type": "READY",
                "payload": { "gameId": "g1", "roomCode": "ABCD" },
                "requestId": "r1"
            })
        );
    }

    #[test]
    fn empty_payload_kinds_encode_empty_object() {
        let value = Envelope::new(Message::ScanDevices).to_value().unwrap();
        assert_eq!(value, json!({ "type": "SCAN_DEVICES", "payload": {} }));
    }

    #[test]
    fn devices_updated_decodes() {
        let envelope = Envelope::from_value(&json!({
            "type": "DEVICES_UPDATED",
            "payload": { "devices": [
                { "id": "d1", "name": "Living room", "type": "chromecast", "isConnected": false }
            ]}
        }))
        .unwrap();

        assert_eq!(
            envelope.message,
            Message::DevicesUpdated(DevicesUpdatedPayload {
                devices: vec![CastDevice::new("d1", "Living room", "chromecast")],
            })
        );
        assert!(envelope.request_id.is_none());
    }

    #[test]
    fn missing_type_is_rejected() {
        let result = Envelope::from_value(&json!({ "payload": {} }));
        assert_eq!(result, Err(ProtocolError::MissingType));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = Envelope::from_value(&json!({ "type": "HELLO", "payload": {} }));
        assert_eq!(result, Err(ProtocolError::UnknownType("HELLO".into())));
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(Envelope::from_value(&json!("READY")), Err(ProtocolError::NotAnObject));
        assert_eq!(Envelope::from_value(&json!([1, 2])), Err(ProtocolError::NotAnObject));
    }

    #[test]
    fn response_without_request_id_is_rejected() {
        let result = Envelope::from_value(&json!({ "type": "SCAN_DEVICES_RESPONSE" }));
        assert!(matches!(result, Err(ProtocolError::MissingRequestId { .. })));
    }

    #[test]
    fn bare_ack_with_request_id_is_accepted() {
        let envelope = Envelope::from_value(&json!({
            "type": "END_SESSION_RESPONSE",
            "requestId": "r9"
        }))
        .unwrap();
        assert_eq!(envelope.message, Message::EndSessionResponse(AckPayload::ok()));
        assert_eq!(envelope.request_id, Some("r9".into()));
    }

    #[test]
    fn numeric_request_id_is_rejected() {
        let result = Envelope::from_value(&json!({
            "type": "ERROR",
            "payload": { "code": "X", "message": "y" },
            "requestId": 7
        }));
        assert_eq!(result, Err(ProtocolError::InvalidRequestId));
    }

    #[test]
    fn wrong_primitive_type_is_rejected() {
        let result = Envelope::from_value(&json!({
            "type": "READY_RESPONSE",
            "payload": { "available": "yes" },
            "requestId": "r1"
        }));
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { kind: "READY_RESPONSE", .. })));
    }

    #[test]
    fn device_missing_required_key_is_rejected() {
        let result = Envelope::from_value(&json!({
            "type": "DEVICES_UPDATED",
            "payload": { "devices": [{ "id": "d1", "name": "TV" }] }
        }));
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
    }

    #[test]
    fn connected_without_session_is_rejected() {
        let result = Envelope::from_value(&json!({
            "type": "SESSION_UPDATED",
            "payload": { "status": "connected", "deviceId": "d1" }
        }));
        assert!(matches!(result, Err(ProtocolError::InvalidPayload { .. })));
    }

    #[test]
    fn session_error_event_decodes_with_nulls() {
        let envelope = Envelope::from_value(&json!({
            "type": "SESSION_UPDATED",
            "payload": {
                "status": "error",
                "deviceId": null,
                "deviceName": null,
                "sessionId": null,
                "error": { "code": "SESSION_ERROR", "message": "device unreachable" }
            }
        }))
        .unwrap();

        let Message::SessionUpdated(payload) = envelope.message else {
            panic!("expected SessionUpdated");
        };
        assert_eq!(payload.status, SessionStatus::Error);
        assert_eq!(payload.error.map(|e| e.message), Some("device unreachable".into()));
    }

    #[test]
    fn declined_ack_is_reported() {
        let message = Message::StartSessionResponse(AckPayload::refused(CastError::new(
            "DEVICE_BUSY",
            "busy",
        )));
        assert_eq!(message.declined().map(|e| e.code), Some("DEVICE_BUSY".into()));
        assert!(Message::ScanDevices.declined().is_none());
    }

    #[test]
    fn ensure_request_id_keeps_existing() {
        let mut envelope = Envelope::with_request_id(Message::EndSession, "keep".into());
        let id = envelope.ensure_request_id(|| RequestId::new("fresh")).clone();
        assert_eq!(id.as_str(), "keep");

        let mut bare = Envelope::new(Message::EndSession);
        let id = bare.ensure_request_id(|| RequestId::new("fresh")).clone();
        assert_eq!(id.as_str(), "fresh");
    }

    #[test]
    fn decode_rejects_malformed_text() {
        assert!(matches!(Envelope::decode("{not json"), Err(ProtocolError::Json(_))));
    }
}
