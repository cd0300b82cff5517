//! Protocol decode and encode errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Reasons a value is rejected as a protocol message.
///
/// Inbound rejections are expected on a shared channel (foreign traffic), so
/// callers usually log these at debug level and drop the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input text is not JSON.
    #[error("malformed json: {0}")]
    Json(String),

    /// Top-level value is not a JSON object.
    #[error("message is not an object")]
    NotAnObject,

    /// The `type` discriminant is absent or not a string.
    #[error("message has no string `type` field")]
    MissingType,

    /// The `type` discriminant is not part of the catalogue.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The `payload` failed shape checking for its kind.
    #[error("invalid payload for {kind}: {reason}")]
    InvalidPayload {
        /// Wire name of the message kind.
        kind: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// `requestId` is present but not a non-empty string.
    #[error("requestId must be a non-empty string")]
    InvalidRequestId,

    /// A response kind arrived without a `requestId`.
    #[error("{kind} requires a requestId")]
    MissingRequestId {
        /// Wire name of the message kind.
        kind: &'static str,
    },

    /// Serializing an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(String),
}
