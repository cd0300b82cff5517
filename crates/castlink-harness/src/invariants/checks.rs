//! Standard invariant checks.
//!
//! These capture what must be true of any cast state, not how a particular
//! scenario should end.

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Casting requires a session id and a device id.
///
/// A casting state without them would let the UI send updates nobody can
/// route.
pub struct CastingImpliesSession;

impl Invariant for CastingImpliesSession {
    fn name(&self) -> &'static str {
        "casting_implies_session"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let s = &session.state;
            if s.is_casting && (s.session_id.is_none() || s.device_id.is_none()) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: casting with session {:?} on device {:?}",
                        session.label, s.session_id, s.device_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A client is never connecting and casting at once.
pub struct ConnectingExcludesCasting;

impl Invariant for ConnectingExcludesCasting {
    fn name(&self) -> &'static str {
        "connecting_excludes_casting"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            if session.state.is_connecting && session.state.is_casting {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: connecting and casting on {:?}",
                        session.label, session.state.device_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// At most one device is marked connected, and only the casting one.
pub struct ConnectedDeviceIsSession;

impl Invariant for ConnectedDeviceIsSession {
    fn name(&self) -> &'static str {
        "connected_device_is_session"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let s = &session.state;
            let connected: Vec<&str> =
                s.devices.iter().filter(|d| d.is_connected).map(|d| d.id.as_str()).collect();

            let consistent = match connected.as_slice() {
                [] => true,
                [only] => s.is_casting && s.device_id.as_deref() == Some(*only),
                _ => false,
            };
            if !consistent {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: connected devices {connected:?} but casting={} on {:?}",
                        session.label, s.is_casting, s.device_id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Between operations no request is left waiting and no scan is running.
pub struct SettledWithoutPending;

impl Invariant for SettledWithoutPending {
    fn name(&self) -> &'static str {
        "settled_without_pending"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in state.sessions.iter().filter(|s| s.settled) {
            if session.pending_requests > 0 || session.state.is_scanning {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "{}: {} pending requests, scanning={}",
                        session.label, session.pending_requests, session.state.is_scanning
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use castlink_core::{CastDevice, CastState};

    use super::*;
    use crate::invariants::SessionSnapshot;

    fn snapshot(state: CastState) -> SystemSnapshot {
        SystemSnapshot::single(SessionSnapshot::new("client", state))
    }

    fn casting_on(device: &str) -> CastState {
        CastState {
            is_casting: true,
            device_id: Some(device.into()),
            session_id: Some("s-1".into()),
            ..CastState::default()
        }
    }

    fn device(id: &str, connected: bool) -> CastDevice {
        CastDevice { is_connected: connected, ..CastDevice::new(id, id, "chromecast") }
    }

    #[test]
    fn casting_without_session_is_caught() {
        let state = CastState { session_id: None, ..casting_on("a") };
        assert!(CastingImpliesSession.check(&snapshot(state)).is_err());
        assert!(CastingImpliesSession.check(&snapshot(casting_on("a"))).is_ok());
    }

    #[test]
    fn connecting_while_casting_is_caught() {
        let state = CastState { is_connecting: true, ..casting_on("a") };
        assert!(ConnectingExcludesCasting.check(&snapshot(state)).is_err());

        let connecting = CastState { is_connecting: true, ..CastState::default() };
        assert!(ConnectingExcludesCasting.check(&snapshot(connecting)).is_ok());
    }

    #[test]
    fn connected_device_must_be_the_session_device() {
        let ok = CastState { devices: vec![device("a", true), device("b", false)], ..casting_on("a") };
        assert!(ConnectedDeviceIsSession.check(&snapshot(ok)).is_ok());

        let wrong = CastState { devices: vec![device("a", false), device("b", true)], ..casting_on("a") };
        assert!(ConnectedDeviceIsSession.check(&snapshot(wrong)).is_err());

        let two = CastState { devices: vec![device("a", true), device("b", true)], ..casting_on("a") };
        assert!(ConnectedDeviceIsSession.check(&snapshot(two)).is_err());

        let idle = CastState { devices: vec![device("a", true)], ..CastState::default() };
        assert!(ConnectedDeviceIsSession.check(&snapshot(idle)).is_err());
    }

    #[test]
    fn pending_only_matters_when_settled() {
        let settled = SystemSnapshot::single(SessionSnapshot::new("c", CastState::default()).with_pending(1));
        assert!(SettledWithoutPending.check(&settled).is_err());

        let mid_flight = SystemSnapshot::single(
            SessionSnapshot::new("c", CastState { is_scanning: true, ..CastState::default() })
                .with_pending(1)
                .unsettled(),
        );
        assert!(SettledWithoutPending.check(&mid_flight).is_ok());
    }
}
