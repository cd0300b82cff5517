//! Error types for the bridge and the session controller.
//!
//! Every error carries a stable string code. The controller mirrors failures
//! into `CastState::error` through [`ClientError::to_cast_error`], so UI code
//! only ever sees [`CastError`] values.

use std::time::Duration;

use castlink_proto::{CastError, MessageKind, RequestId};
use thiserror::Error;

/// Errors raised by [`Bridge`](crate::Bridge).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A correlated send was attempted without a request id
    #[error("{kind} has no request id")]
    MissingRequestId {
        /// Kind of the message that lacked an id
        kind: MessageKind,
    },

    /// No response arrived in time
    #[error("{kind} request {request_id} timed out after {after:?}")]
    Timeout {
        /// Kind of the request
        kind: MessageKind,
        /// Correlation id of the request
        request_id: RequestId,
        /// Configured timeout
        after: Duration,
    },

    /// The bridge was disposed before the request settled
    #[error("bridge disposed")]
    Disposed,

    /// A later request reused this request's id before a response arrived
    #[error("{kind} request {request_id} superseded by a later request with the same id")]
    Superseded {
        /// Kind of the superseded request
        kind: MessageKind,
        /// The shared correlation id
        request_id: RequestId,
    },

    /// An outbound message failed to serialize
    #[error("failed to encode {kind}: {reason}")]
    Encode {
        /// Kind of the message
        kind: MessageKind,
        /// Serializer message
        reason: String,
    },
}

impl BridgeError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequestId { .. } => "MISSING_REQUEST_ID",
            Self::Timeout { .. } => "BRIDGE_TIMEOUT",
            Self::Disposed => "BRIDGE_DISPOSED",
            Self::Superseded { .. } => "REQUEST_SUPERSEDED",
            Self::Encode { .. } => "ENCODE_FAILED",
        }
    }

    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only timeouts qualify: the host may simply have been slow. Nothing
    /// retries automatically.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors returned by [`CastClient`](crate::CastClient) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Transport failure
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Operation requires a session and none is active
    #[error("no active session")]
    NoActiveSession,

    /// A session is already established
    #[error("already casting to {device_id}")]
    SessionActive {
        /// Device currently hosting the session
        device_id: String,
    },

    /// Host acknowledged with `success: false`
    #[error("host declined {kind}: {}", error.message)]
    Declined {
        /// Kind of the declined request
        kind: MessageKind,
        /// Reason reported by the host
        error: CastError,
    },

    /// Host answered the request with an `ERROR` message
    #[error("host error {}: {}", .0.code, .0.message)]
    Host(CastError),

    /// Host answered with a response of the wrong kind
    #[error("{request} answered with {received}")]
    UnexpectedResponse {
        /// Kind of the request
        request: MessageKind,
        /// Kind that came back
        received: MessageKind,
    },
}

impl ClientError {
    /// Stable error code. Host-originated errors keep the host's code.
    pub fn code(&self) -> &str {
        match self {
            Self::Bridge(e) => e.code(),
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::SessionActive { .. } => "SESSION_ACTIVE",
            Self::Declined { error, .. } | Self::Host(error) => &error.code,
            Self::UnexpectedResponse { .. } => "UNEXPECTED_RESPONSE",
        }
    }

    /// Returns true if this error is transient and may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Bridge(e) if e.is_transient())
    }

    /// The [`CastError`] recorded into state for this failure.
    pub fn to_cast_error(&self) -> CastError {
        match self {
            Self::Declined { error, .. } | Self::Host(error) => error.clone(),
            Self::Bridge(BridgeError::Timeout { kind, request_id, after }) => {
                CastError::new(self.code(), self.to_string())
                    .with_detail("type", kind.as_str())
                    .with_detail("requestId", request_id.as_str())
                    .with_detail("timeoutMs", after.as_millis() as u64)
            },
            Self::Bridge(_)
            | Self::NoActiveSession
            | Self::SessionActive { .. }
            | Self::UnexpectedResponse { .. } => CastError::new(self.code(), self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_transient() {
        let timeout = BridgeError::Timeout {
            kind: MessageKind::Ready,
            request_id: RequestId::new("r1"),
            after: Duration::from_secs(5),
        };
        assert!(timeout.is_transient());
        assert!(ClientError::from(timeout).is_transient());
        assert!(!BridgeError::Disposed.is_transient());
        assert!(!ClientError::NoActiveSession.is_transient());
    }

    #[test]
    fn host_errors_keep_host_code() {
        let error = ClientError::Declined {
            kind: MessageKind::StartSession,
            error: CastError::new("DEVICE_BUSY", "busy"),
        };
        assert_eq!(error.code(), "DEVICE_BUSY");
        assert_eq!(error.to_cast_error(), CastError::new("DEVICE_BUSY", "busy"));
    }

    #[test]
    fn timeout_details_name_the_request() {
        let error = ClientError::from(BridgeError::Timeout {
            kind: MessageKind::ScanDevices,
            request_id: RequestId::new("r9"),
            after: Duration::from_millis(250),
        });
        let cast = error.to_cast_error();
        assert_eq!(cast.code, "BRIDGE_TIMEOUT");
        let details = cast.details.expect("details");
        assert_eq!(details["requestId"], "r9");
        assert_eq!(details["timeoutMs"], 250);
    }
}
