//! Reference model of the scripted host.

use std::collections::{BTreeSet, VecDeque};

use castlink_app::DEVICE_NOT_FOUND;
use castlink_proto::{CastDevice, payloads::request::REQUEST_DECLINED};

use super::operation::RequestSlot;
use crate::sim_host::{HostSession, sim_devices};

/// Request as the model host sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRequest {
    /// `READY`
    Ready,
    /// `SCAN_DEVICES`
    Scan,
    /// `START_SESSION` for a device id.
    Start(String),
    /// `END_SESSION`
    Stop,
    /// `STATE_UPDATE`
    StateUpdate,
}

impl ModelRequest {
    fn slot(&self) -> RequestSlot {
        match self {
            Self::Ready => RequestSlot::Ready,
            Self::Scan => RequestSlot::Scan,
            Self::Start(_) => RequestSlot::Start,
            Self::Stop => RequestSlot::Stop,
            Self::StateUpdate => RequestSlot::StateUpdate,
        }
    }
}

/// Event the host sends as a consequence of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// `DEVICES_UPDATED`
    Devices(Vec<CastDevice>),
    /// `SESSION_UPDATED(connecting)`
    Connecting(String),
    /// `SESSION_UPDATED(connected)`
    Connected {
        /// Device id.
        device_id: String,
        /// Device name.
        device_name: String,
        /// Host session id.
        session_id: String,
    },
}

/// Successful acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAck {
    /// Availability and devices carried by `READY_RESPONSE`.
    pub ready: Option<(bool, Vec<CastDevice>)>,
}

/// Host bookkeeping mirrored from `SimHost`.
#[derive(Debug, Clone)]
pub struct ModelHost {
    /// Devices the host reports.
    pub devices: Vec<CastDevice>,
    /// Session the host believes is running.
    pub session: Option<HostSession>,
    /// Sessions started so far.
    pub sessions: u64,
    /// Replies are withheld.
    pub withhold: bool,
    /// Caused events are dropped.
    pub drop_events: bool,
    /// Declined request kinds.
    pub declined: BTreeSet<RequestSlot>,
    /// Withheld events, in delivery order. Withheld acks are omitted: they
    /// always arrive after their request timed out.
    pub queued: VecDeque<ModelEvent>,
    /// Game states accepted.
    pub states: usize,
}

impl Default for ModelHost {
    fn default() -> Self {
        Self {
            devices: sim_devices(),
            session: None,
            sessions: 0,
            withhold: false,
            drop_events: false,
            declined: BTreeSet::new(),
            queued: VecDeque::new(),
            states: 0,
        }
    }
}

impl ModelHost {
    /// Accept or refuse `request`, returning caused events and the ack.
    pub fn react(&mut self, request: &ModelRequest) -> (Vec<ModelEvent>, Result<ModelAck, String>) {
        if self.declined.contains(&request.slot()) {
            return (Vec::new(), Err(REQUEST_DECLINED.to_owned()));
        }

        match request {
            ModelRequest::Ready => {
                let ack = ModelAck { ready: Some((true, self.devices.clone())) };
                (Vec::new(), Ok(ack))
            },
            ModelRequest::Scan => (vec![ModelEvent::Devices(self.devices.clone())], Ok(ModelAck::default())),
            ModelRequest::Start(device_id) => {
                let Some(device) = self.devices.iter().find(|d| &d.id == device_id).cloned() else {
                    return (Vec::new(), Err(DEVICE_NOT_FOUND.to_owned()));
                };
                self.sessions += 1;
                let session_id = format!("sim-session-{}", self.sessions);
                self.session =
                    Some(HostSession { device_id: device.id.clone(), session_id: session_id.clone() });
                let events = vec![
                    ModelEvent::Connecting(device.id.clone()),
                    ModelEvent::Connected { device_id: device.id, device_name: device.name, session_id },
                ];
                (events, Ok(ModelAck::default()))
            },
            ModelRequest::Stop => {
                self.session = None;
                (Vec::new(), Ok(ModelAck::default()))
            },
            ModelRequest::StateUpdate => {
                self.states += 1;
                (Vec::new(), Ok(ModelAck::default()))
            },
        }
    }
}
