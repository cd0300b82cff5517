//! Message discriminants.
//!
//! [`MessageKind`] plays the role an opcode plays in a binary protocol: the
//! wire `type` string is parsed into it once, and everything downstream
//! matches on the enum.

use std::fmt;

/// Which side of the bridge originates a message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by the web game to the host app.
    WebToHost,
    /// Sent by the host app to the web game.
    HostToWeb,
}

/// Every message type in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    /// Web game is loaded and wants casting availability.
    Ready,
    /// Answer to [`MessageKind::Ready`].
    ReadyResponse,
    /// Ask the host to scan for cast targets.
    ScanDevices,
    /// Acknowledgement of [`MessageKind::ScanDevices`].
    ScanDevicesResponse,
    /// Ask the host to open a session on a device.
    StartSession,
    /// Acknowledgement of [`MessageKind::StartSession`].
    StartSessionResponse,
    /// Ask the host to close the current session.
    EndSession,
    /// Acknowledgement of [`MessageKind::EndSession`].
    EndSessionResponse,
    /// Push game state to the cast display.
    StateUpdate,
    /// Acknowledgement of [`MessageKind::StateUpdate`].
    StateUpdateResponse,
    /// Host's device list changed.
    DevicesUpdated,
    /// Host's session status changed.
    SessionUpdated,
    /// Host-side failure not tied to a request.
    Error,
}

impl MessageKind {
    /// All kinds in catalogue order.
    pub const ALL: [Self; 13] = [
        Self::Ready,
        Self::ReadyResponse,
        Self::ScanDevices,
        Self::ScanDevicesResponse,
        Self::StartSession,
        Self::StartSessionResponse,
        Self::EndSession,
        Self::EndSessionResponse,
        Self::StateUpdate,
        Self::StateUpdateResponse,
        Self::DevicesUpdated,
        Self::SessionUpdated,
        Self::Error,
    ];

    /// Wire name used in the `type` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::ReadyResponse => "READY_RESPONSE",
            Self::ScanDevices => "SCAN_DEVICES",
            Self::ScanDevicesResponse => "SCAN_DEVICES_RESPONSE",
            Self::StartSession => "START_SESSION",
            Self::StartSessionResponse => "START_SESSION_RESPONSE",
            Self::EndSession => "END_SESSION",
            Self::EndSessionResponse => "END_SESSION_RESPONSE",
            Self::StateUpdate => "STATE_UPDATE",
            Self::StateUpdateResponse => "STATE_UPDATE_RESPONSE",
            Self::DevicesUpdated => "DEVICES_UPDATED",
            Self::SessionUpdated => "SESSION_UPDATED",
            Self::Error => "ERROR",
        }
    }

    /// Parse a wire name. `None` for anything outside the catalogue.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Originating side.
    pub const fn direction(self) -> Direction {
        match self {
            Self::Ready
            | Self::ScanDevices
            | Self::StartSession
            | Self::EndSession
            | Self::StateUpdate => Direction::WebToHost,
            Self::ReadyResponse
            | Self::ScanDevicesResponse
            | Self::StartSessionResponse
            | Self::EndSessionResponse
            | Self::StateUpdateResponse
            | Self::DevicesUpdated
            | Self::SessionUpdated
            | Self::Error => Direction::HostToWeb,
        }
    }

    /// Response kind the host answers this request with. `None` for kinds
    /// that are not requests.
    pub const fn response_kind(self) -> Option<Self> {
        match self {
            Self::Ready => Some(Self::ReadyResponse),
            Self::ScanDevices => Some(Self::ScanDevicesResponse),
            Self::StartSession => Some(Self::StartSessionResponse),
            Self::EndSession => Some(Self::EndSessionResponse),
            Self::StateUpdate => Some(Self::StateUpdateResponse),
            Self::ReadyResponse
            | Self::ScanDevicesResponse
            | Self::StartSessionResponse
            | Self::EndSessionResponse
            | Self::StateUpdateResponse
            | Self::DevicesUpdated
            | Self::SessionUpdated
            | Self::Error => None,
        }
    }

    /// True for the `*_RESPONSE` kinds, which must carry a request id.
    pub const fn is_response(self) -> bool {
        matches!(
            self,
            Self::ReadyResponse
                | Self::ScanDevicesResponse
                | Self::StartSessionResponse
                | Self::EndSessionResponse
                | Self::StateUpdateResponse
        )
    }

    /// True for unsolicited host events.
    pub const fn is_event(self) -> bool {
        matches!(self, Self::DevicesUpdated | Self::SessionUpdated | Self::Error)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
