//! Reference model combining the client and the host.
//!
//! Every request completes before the next operation starts. A withheld
//! reply therefore means a timeout; its events are queued and reach the
//! client only when released, where stale events are handled like any other.

use castlink_proto::payloads::session::SESSION_ERROR;

use super::{
    client::{ModelClient, ObservableState},
    host::{ModelAck, ModelEvent, ModelHost, ModelRequest},
    operation::{HOST_FAILURE, Operation, OperationResult, device_id, device_list},
};

const SESSION_ACTIVE: &str = "SESSION_ACTIVE";
const NO_ACTIVE_SESSION: &str = "NO_ACTIVE_SESSION";
const BRIDGE_TIMEOUT: &str = "BRIDGE_TIMEOUT";

/// Model of one client talking to one scripted host.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    /// Client side.
    pub client: ModelClient,
    /// Host side.
    pub host: ModelHost,
}

impl ModelWorld {
    /// Fresh client and default host.
    pub fn new() -> Self {
        Self::default()
    }

    /// State to compare with the real system.
    pub fn observable(&self) -> ObservableState {
        let host_session = self.host.session.as_ref().map(|s| s.session_id.clone());
        ObservableState::from((&self.client, host_session, self.host.states))
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Ready => self.ready(),
            Operation::Scan => self.scan(),
            Operation::Start { device } => self.start(&device_id(*device), false),
            Operation::Stop => self.stop(),
            Operation::StartThenStop { device } => self.start(&device_id(*device), true),
            Operation::PushState { .. } => self.push_state(),
            Operation::ResetError => {
                self.client.error = None;
                OperationResult::Ok
            },
            Operation::HostDevices { count } => {
                let devices = device_list(*count);
                self.deliver(ModelEvent::Devices(devices.clone()));
                self.host.devices = devices;
                OperationResult::Ok
            },
            Operation::HostTerminate => {
                if self.host.session.take().is_some() {
                    self.client.clear_session();
                }
                OperationResult::Ok
            },
            Operation::HostSessionError => {
                if self.host.session.take().is_some() {
                    self.client.clear_session();
                    self.client.error = Some(SESSION_ERROR.to_owned());
                }
                OperationResult::Ok
            },
            Operation::HostError => {
                self.client.error = Some(HOST_FAILURE.to_owned());
                OperationResult::Ok
            },
            Operation::Garbage { .. } | Operation::EventsBeforeAck { .. } => OperationResult::Ok,
            Operation::Withhold { enabled } => {
                self.host.withhold = *enabled;
                OperationResult::Ok
            },
            Operation::Release => {
                while let Some(event) = self.host.queued.pop_front() {
                    self.deliver(event);
                }
                OperationResult::Ok
            },
            Operation::DropEvents { enabled } => {
                self.host.drop_events = *enabled;
                OperationResult::Ok
            },
            Operation::Decline { request, enabled } => {
                if *enabled {
                    self.host.declined.insert(*request);
                } else {
                    self.host.declined.remove(request);
                }
                OperationResult::Ok
            },
        }
    }

    fn ready(&mut self) -> OperationResult {
        match self.round_trip(&ModelRequest::Ready) {
            Ok(ack) => {
                if let Some((available, devices)) = ack.ready {
                    self.client.available = available;
                    self.client.replace_devices(&devices);
                }
                OperationResult::Ok
            },
            Err(code) => self.fail(code),
        }
    }

    fn scan(&mut self) -> OperationResult {
        self.client.scanning = true;
        let reply = self.round_trip(&ModelRequest::Scan);
        self.client.scanning = false;
        match reply {
            Ok(_) => OperationResult::Ok,
            Err(code) => self.fail(code),
        }
    }

    fn start(&mut self, device: &str, then_stop: bool) -> OperationResult {
        if self.client.casting {
            let start = self.fail(SESSION_ACTIVE.to_owned());
            return if then_stop { start.and(self.stop()) } else { start };
        }

        self.client.abandoned.remove(device);
        self.client.connecting = true;
        self.client.device_id = Some(device.to_owned());

        let withheld = self.host.withhold;
        let reply = self.round_trip(&ModelRequest::Start(device.to_owned()));

        // A withheld start is still waiting when the concurrent stop runs
        let early_stop = (then_stop && withheld).then(|| self.stop());

        let start = match reply {
            Ok(_) => OperationResult::Ok,
            Err(code) => {
                if self.client.connecting && self.client.device_id.as_deref() == Some(device) {
                    self.client.connecting = false;
                    self.client.device_id = None;
                }
                self.fail(code)
            },
        };

        match early_stop {
            Some(stop) => start.and(stop),
            None if then_stop => start.and(self.stop()),
            None => start,
        }
    }

    fn stop(&mut self) -> OperationResult {
        if self.client.session_id.is_none() {
            if self.client.connecting {
                if let Some(device_id) = self.client.device_id.take() {
                    self.client.abandoned.insert(device_id);
                }
                self.client.connecting = false;
            }
            return OperationResult::Ok;
        }

        match self.round_trip(&ModelRequest::Stop) {
            Ok(_) => {
                self.client.clear_session();
                OperationResult::Ok
            },
            Err(code) => self.fail(code),
        }
    }

    fn push_state(&mut self) -> OperationResult {
        if self.client.session_id.is_none() {
            return self.fail(NO_ACTIVE_SESSION.to_owned());
        }
        match self.round_trip(&ModelRequest::StateUpdate) {
            Ok(_) => OperationResult::Ok,
            Err(code) => self.fail(code),
        }
    }

    /// Host reacts; the client sees the events and the ack unless withheld.
    fn round_trip(&mut self, request: &ModelRequest) -> Result<ModelAck, String> {
        let (events, ack) = self.host.react(request);
        let events = if self.host.drop_events { Vec::new() } else { events };

        if self.host.withhold {
            self.host.queued.extend(events);
            return Err(BRIDGE_TIMEOUT.to_owned());
        }

        for event in events {
            self.deliver(event);
        }
        ack
    }

    fn deliver(&mut self, event: ModelEvent) {
        match event {
            ModelEvent::Devices(devices) => {
                self.client.replace_devices(&devices);
                self.client.scanning = false;
            },
            ModelEvent::Connecting(device_id) => {
                if !self.client.casting && !self.client.abandoned.contains(&device_id) {
                    self.client.connecting = true;
                    self.client.device_id = Some(device_id);
                }
            },
            ModelEvent::Connected { device_id, device_name, session_id } => {
                if self.client.abandoned.remove(&device_id) {
                    // The client ends the session without waiting for a reply
                    self.host.session = None;
                    return;
                }
                self.client.connecting = false;
                self.client.casting = true;
                self.client.device_name = Some(device_name);
                self.client.session_id = Some(session_id);
                self.client.mark_connected(Some(&device_id));
                self.client.device_id = Some(device_id);
            },
        }
    }

    fn fail(&mut self, code: String) -> OperationResult {
        self.client.error = Some(code.clone());
        OperationResult::Error(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestSlot;

    #[test]
    fn start_with_cooperative_host_casts() {
        let mut world = ModelWorld::new();
        assert_eq!(world.apply(&Operation::Ready), OperationResult::Ok);
        assert_eq!(world.apply(&Operation::Start { device: 1 }), OperationResult::Ok);

        let state = world.observable();
        assert!(state.casting);
        assert!(!state.connecting);
        assert_eq!(state.device_id.as_deref(), Some("sim-tv-2"));
        assert_eq!(state.session_id.as_deref(), Some("sim-session-1"));
        assert_eq!(state.host_session.as_deref(), Some("sim-session-1"));
    }

    #[test]
    fn withheld_start_then_stop_abandons() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Withhold { enabled: true });

        let result = world.apply(&Operation::StartThenStop { device: 0 });
        assert_eq!(result, OperationResult::error(BRIDGE_TIMEOUT));
        assert!(world.client.abandoned.contains("sim-tv-1"));

        world.apply(&Operation::Release);
        let state = world.observable();
        assert!(!state.casting);
        assert!(!state.connecting);
        assert!(state.host_session.is_none(), "abandoned session is ended");
    }

    #[test]
    fn starting_another_device_keeps_abandoned_refused() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Withhold { enabled: true });
        world.apply(&Operation::StartThenStop { device: 0 });
        world.apply(&Operation::Withhold { enabled: false });

        assert_eq!(world.apply(&Operation::Start { device: 1 }), OperationResult::Ok);
        assert!(world.client.abandoned.contains("sim-tv-1"));

        world.apply(&Operation::Release);
        let state = world.observable();
        assert!(state.casting);
        assert_eq!(state.device_id.as_deref(), Some("sim-tv-2"));
        assert!(world.client.abandoned.is_empty());
    }

    #[test]
    fn declined_stop_keeps_session() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Start { device: 0 });
        world.apply(&Operation::Decline { request: RequestSlot::Stop, enabled: true });

        assert_eq!(world.apply(&Operation::Stop), OperationResult::error("REQUEST_DECLINED"));
        assert!(world.observable().casting);
    }

    #[test]
    fn dropped_events_leave_connecting() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::DropEvents { enabled: true });
        world.apply(&Operation::Start { device: 2 });

        let state = world.observable();
        assert!(state.connecting);
        assert!(!state.casting);
        assert_eq!(state.host_session.as_deref(), Some("sim-session-1"));
    }
}
