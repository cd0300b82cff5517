//! Operations for model-based testing.
//!
//! Operations represent everything the game or the host can do to a client.
//! They are generated randomly by proptest and applied to both the reference
//! model and the real client.

use arbitrary::Arbitrary;
use castlink_client::ClientError;
use castlink_proto::{CastDevice, MessageKind};

use crate::sim_host::sim_devices;

/// Device selector: `0..=2` pick a simulated device, anything else maps to
/// an id the host does not know.
pub type DeviceSlot = u8;

/// Code of the `ERROR` event sent by [`Operation::HostError`].
pub const HOST_FAILURE: &str = "HOST_FAILURE";

/// Operations that can be applied to the system.
///
/// Each operation completes before the next one starts, so withheld replies
/// surface as timeouts and reach the client only on [`Operation::Release`].
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Game calls `signal_ready`.
    Ready,

    /// Game calls `scan_for_devices`.
    Scan,

    /// Game calls `start_casting`.
    Start {
        /// Target device.
        device: DeviceSlot,
    },

    /// Game calls `stop_casting`.
    Stop,

    /// Game calls `start_casting` and `stop_casting` concurrently.
    StartThenStop {
        /// Target device.
        device: DeviceSlot,
    },

    /// Game calls `send_state_update`.
    PushState {
        /// Value stored under `turn` in the state object.
        turn: u8,
    },

    /// Game calls `reset_error`.
    ResetError,

    /// Host announces a new device list.
    HostDevices {
        /// How many simulated devices (mod 4) the list holds.
        count: u8,
    },

    /// Host ends its session.
    HostTerminate,

    /// Host fails its session without a reason.
    HostSessionError,

    /// Host sends an unsolicited `ERROR`.
    HostError,

    /// Channel carries text that is not a valid message.
    Garbage {
        /// Which malformed text to deliver.
        variant: u8,
    },

    /// Host starts or stops withholding replies.
    Withhold {
        /// New setting.
        enabled: bool,
    },

    /// Host delivers every withheld reply.
    Release,

    /// Host starts or stops dropping request-caused events.
    DropEvents {
        /// New setting.
        enabled: bool,
    },

    /// Host sends caused events before or after the acknowledgement.
    EventsBeforeAck {
        /// New setting.
        enabled: bool,
    },

    /// Host starts or stops declining one request kind.
    Decline {
        /// Request kind affected.
        request: RequestSlot,
        /// New setting.
        enabled: bool,
    },
}

/// Request kinds the host can be scripted to decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Arbitrary)]
pub enum RequestSlot {
    /// `READY`
    Ready,
    /// `SCAN_DEVICES`
    Scan,
    /// `START_SESSION`
    Start,
    /// `END_SESSION`
    Stop,
    /// `STATE_UPDATE`
    StateUpdate,
}

impl RequestSlot {
    /// Wire kind of the request.
    pub fn kind(self) -> MessageKind {
        match self {
            Self::Ready => MessageKind::Ready,
            Self::Scan => MessageKind::ScanDevices,
            Self::Start => MessageKind::StartSession,
            Self::Stop => MessageKind::EndSession,
            Self::StateUpdate => MessageKind::StateUpdate,
        }
    }
}

/// Device id addressed by `slot`.
pub fn device_id(slot: DeviceSlot) -> String {
    match slot % 4 {
        3 => "sim-tv-missing".to_owned(),
        index => format!("sim-tv-{}", index + 1),
    }
}

/// First `count % 4` simulated devices.
pub fn device_list(count: u8) -> Vec<CastDevice> {
    sim_devices().into_iter().take(usize::from(count % 4)).collect()
}

/// Malformed inbound text selected by `variant`.
pub fn garbage(variant: u8) -> &'static str {
    const TEXTS: [&str; 7] = [
        "not json at all",
        "[1, 2, 3]",
        r#"{"payload":{"devices":[]}}"#,
        r#"{"type":"DEVICE_EXPLODED","payload":{}}"#,
        r#"{"type":"SESSION_UPDATED","payload":{"status":"paused"}}"#,
        r#"{"type":"SESSION_UPDATED","payload":{"status":"connected","deviceId":"sim-tv-1"}}"#,
        r#"{"type":"START_SESSION_RESPONSE","payload":{"success":true}}"#,
    ];
    TEXTS[usize::from(variant) % TEXTS.len()]
}

/// Outcome of applying an operation.
///
/// Used to compare model and real system behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded (or was a host action).
    Ok,

    /// Operation failed with this error code.
    Error(String),
}

impl OperationResult {
    /// Failure with `code`.
    pub fn error(code: impl Into<String>) -> Self {
        Self::Error(code.into())
    }

    /// Collapse a client call result.
    pub fn from_client(result: Result<(), ClientError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(error) => Self::Error(error.code().to_owned()),
        }
    }

    /// First failure of two consecutive results.
    #[must_use]
    pub fn and(self, next: Self) -> Self {
        match self {
            Self::Ok => next,
            failed @ Self::Error(_) => failed,
        }
    }
}
