//! The casting session aggregate.
//!
//! One [`CastState`] snapshot describes everything a UI needs: host
//! availability, the discovered devices, and the session lifecycle. All
//! changes arrive as a [`CastStatePatch`] through the store.
//!
//! # Invariants
//!
//! Every snapshot produced by the session controller satisfies:
//!
//! - `is_casting` implies `session_id` and `device_id` are set
//! - `is_connecting` and `is_casting` are never both true

use castlink_proto::{CastDevice, CastError};
use serde::Serialize;

use crate::store::Mergeable;

/// Casting session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastState {
    /// Host reported casting support.
    pub is_available: bool,
    /// A session is established and streaming.
    pub is_casting: bool,
    /// A session has been requested but not yet confirmed.
    pub is_connecting: bool,
    /// Device discovery is running.
    pub is_scanning: bool,
    /// Display name of the target device.
    pub device_name: Option<String>,
    /// Identifier of the target device.
    pub device_id: Option<String>,
    /// Host-assigned session identifier.
    pub session_id: Option<String>,
    /// Most recently reported devices.
    pub devices: Vec<CastDevice>,
    /// Last error. Persists until explicitly cleared with `reset_error`.
    pub error: Option<CastError>,
}

/// Coarse lifecycle position derived from the state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Nothing in flight.
    Idle,
    /// Discovering devices without a session.
    Scanning,
    /// Waiting for the host to confirm a session.
    Connecting,
    /// Session established.
    Casting,
    /// Idle with an unresolved error.
    Error,
}

impl CastState {
    /// Derived lifecycle phase. Session flags take precedence over scanning,
    /// and an error only defines the phase when nothing else is going on.
    pub fn phase(&self) -> SessionPhase {
        if self.is_casting {
            SessionPhase::Casting
        } else if self.is_connecting {
            SessionPhase::Connecting
        } else if self.is_scanning {
            SessionPhase::Scanning
        } else if self.error.is_some() {
            SessionPhase::Error
        } else {
            SessionPhase::Idle
        }
    }

    /// Look up a discovered device.
    pub fn device(&self, id: &str) -> Option<&CastDevice> {
        self.devices.iter().find(|d| d.id == id)
    }
}

/// Partial update for [`CastState`].
///
/// `None` leaves a field untouched. Optional fields use `Option<Option<_>>`
/// so a patch can distinguish "keep" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CastStatePatch {
    /// New `is_available`.
    pub is_available: Option<bool>,
    /// New `is_casting`.
    pub is_casting: Option<bool>,
    /// New `is_connecting`.
    pub is_connecting: Option<bool>,
    /// New `is_scanning`.
    pub is_scanning: Option<bool>,
    /// New `device_name`.
    pub device_name: Option<Option<String>>,
    /// New `device_id`.
    pub device_id: Option<Option<String>>,
    /// New `session_id`.
    pub session_id: Option<Option<String>>,
    /// Replacement device list.
    pub devices: Option<Vec<CastDevice>>,
    /// New `error`.
    pub error: Option<Option<CastError>>,
}

impl CastStatePatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `is_available`.
    #[must_use]
    pub fn available(mut self, value: bool) -> Self {
        self.is_available = Some(value);
        self
    }

    /// Set `is_casting`.
    #[must_use]
    pub fn casting(mut self, value: bool) -> Self {
        self.is_casting = Some(value);
        self
    }

    /// Set `is_connecting`.
    #[must_use]
    pub fn connecting(mut self, value: bool) -> Self {
        self.is_connecting = Some(value);
        self
    }

    /// Set `is_scanning`.
    #[must_use]
    pub fn scanning(mut self, value: bool) -> Self {
        self.is_scanning = Some(value);
        self
    }

    /// Set or clear `device_name`.
    #[must_use]
    pub fn device_name(mut self, value: Option<String>) -> Self {
        self.device_name = Some(value);
        self
    }

    /// Set or clear `device_id`.
    #[must_use]
    pub fn device_id(mut self, value: Option<String>) -> Self {
        self.device_id = Some(value);
        self
    }

    /// Set or clear `session_id`.
    #[must_use]
    pub fn session_id(mut self, value: Option<String>) -> Self {
        self.session_id = Some(value);
        self
    }

    /// Replace the device list.
    #[must_use]
    pub fn devices(mut self, value: Vec<CastDevice>) -> Self {
        self.devices = Some(value);
        self
    }

    /// Set or clear `error`.
    #[must_use]
    pub fn error(mut self, value: Option<CastError>) -> Self {
        self.error = Some(value);
        self
    }

    /// Leave the session entirely: not casting, not connecting, no
    /// device or session identifiers.
    #[must_use]
    pub fn clear_session(self) -> Self {
        self.casting(false)
            .connecting(false)
            .device_id(None)
            .device_name(None)
            .session_id(None)
    }
}

impl Mergeable for CastState {
    type Patch = CastStatePatch;

    fn merge(&mut self, patch: CastStatePatch) {
        let CastStatePatch {
            is_available,
            is_casting,
            is_connecting,
            is_scanning,
            device_name,
            device_id,
            session_id,
            devices,
            error,
        } = patch;

        if let Some(v) = is_available {
            self.is_available = v;
        }
        if let Some(v) = is_casting {
            self.is_casting = v;
        }
        if let Some(v) = is_connecting {
            self.is_connecting = v;
        }
        if let Some(v) = is_scanning {
            self.is_scanning = v;
        }
        if let Some(v) = device_name {
            self.device_name = v;
        }
        if let Some(v) = device_id {
            self.device_id = v;
        }
        if let Some(v) = session_id {
            self.session_id = v;
        }
        if let Some(v) = devices {
            self.devices = v;
        }
        if let Some(v) = error {
            self.error = v;
        }
    }
}
