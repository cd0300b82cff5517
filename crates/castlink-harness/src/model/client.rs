//! Reference model of the session controller's state.

use std::collections::BTreeSet;

use castlink_core::CastState;
use castlink_proto::CastDevice;

/// Client-side state the model tracks.
#[derive(Debug, Clone, Default)]
pub struct ModelClient {
    /// `is_available`
    pub available: bool,
    /// `is_casting`
    pub casting: bool,
    /// `is_connecting`
    pub connecting: bool,
    /// `is_scanning`
    pub scanning: bool,
    /// `device_id`
    pub device_id: Option<String>,
    /// `device_name`
    pub device_name: Option<String>,
    /// `session_id`
    pub session_id: Option<String>,
    /// Device ids with their connected flag.
    pub devices: Vec<(String, bool)>,
    /// Code of `error`.
    pub error: Option<String>,
    /// Devices whose connection attempts were abandoned and not restarted.
    pub abandoned: BTreeSet<String>,
}

impl ModelClient {
    /// Replace the device list as reported by the host.
    pub fn replace_devices(&mut self, devices: &[CastDevice]) {
        self.devices = devices.iter().map(|d| (d.id.clone(), d.is_connected)).collect();
    }

    /// Mark only `device_id` connected (`None` disconnects all).
    pub fn mark_connected(&mut self, device_id: Option<&str>) {
        for (id, connected) in &mut self.devices {
            *connected = Some(id.as_str()) == device_id;
        }
    }

    /// Forget the session and any connection attempt.
    pub fn clear_session(&mut self) {
        self.casting = false;
        self.connecting = false;
        self.device_id = None;
        self.device_name = None;
        self.session_id = None;
        self.mark_connected(None);
    }
}

/// State compared between the model and the real system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// `is_available`
    pub available: bool,
    /// `is_casting`
    pub casting: bool,
    /// `is_connecting`
    pub connecting: bool,
    /// `is_scanning`
    pub scanning: bool,
    /// `device_id`
    pub device_id: Option<String>,
    /// `device_name`
    pub device_name: Option<String>,
    /// `session_id`
    pub session_id: Option<String>,
    /// Device ids with their connected flag.
    pub devices: Vec<(String, bool)>,
    /// Code of `error`.
    pub error: Option<String>,
    /// Session id the host believes is running.
    pub host_session: Option<String>,
    /// Game states the host accepted.
    pub host_states: usize,
}

impl ObservableState {
    /// Observable part of a real client and host.
    pub fn capture(state: &CastState, host_session: Option<String>, host_states: usize) -> Self {
        Self {
            available: state.is_available,
            casting: state.is_casting,
            connecting: state.is_connecting,
            scanning: state.is_scanning,
            device_id: state.device_id.clone(),
            device_name: state.device_name.clone(),
            session_id: state.session_id.clone(),
            devices: state.devices.iter().map(|d| (d.id.clone(), d.is_connected)).collect(),
            error: state.error.as_ref().map(|e| e.code.clone()),
            host_session,
            host_states,
        }
    }
}

impl From<(&ModelClient, Option<String>, usize)> for ObservableState {
    fn from((client, host_session, host_states): (&ModelClient, Option<String>, usize)) -> Self {
        Self {
            available: client.available,
            casting: client.casting,
            connecting: client.connecting,
            scanning: client.scanning,
            device_id: client.device_id.clone(),
            device_name: client.device_name.clone(),
            session_id: client.session_id.clone(),
            devices: client.devices.clone(),
            error: client.error.clone(),
            host_session,
            host_states,
        }
    }
}
