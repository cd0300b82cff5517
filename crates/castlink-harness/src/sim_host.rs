//! Scripted host for simulations.
//!
//! `SimHost` plays the native side of a [`LocalChannel`]: it decodes every
//! request the web side posts, updates its own session bookkeeping and
//! answers according to a [`HostScript`]. The script can withhold replies
//! (to exercise timeouts and late responses), drop events, reorder events
//! around the acknowledgement, and decline chosen request kinds.
//!
//! # Invariants
//!
//! - The host accepts a request before deciding how to deliver the reply, so
//!   withholding never changes what the host believes happened.
//! - No borrow is held while text is delivered: delivery re-enters the client,
//!   which may post again.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeSet, VecDeque},
    rc::{Rc, Weak},
};

use castlink_app::DEVICE_NOT_FOUND;
use castlink_client::LocalChannel;
use castlink_proto::{
    CastDevice, CastError, Envelope, Message, MessageKind, SessionStatus,
    payloads::{
        AckPayload, DevicesUpdatedPayload, ReadyResponsePayload, SessionUpdatedPayload, Value,
        request::REQUEST_DECLINED,
    },
};
use tracing::{debug, trace, warn};

/// Devices a fresh [`SimHost`] knows about.
pub fn sim_devices() -> Vec<CastDevice> {
    vec![
        CastDevice::new("sim-tv-1", "Kitchen TV", "chromecast"),
        CastDevice::new("sim-tv-2", "Lounge Projector", "chromecast"),
        CastDevice::new("sim-tv-3", "Office Display", "airplay"),
    ]
}

/// How the host answers requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScript {
    /// Availability reported in `READY_RESPONSE`.
    pub available: bool,
    /// Queue replies until [`SimHost::release`] instead of sending them.
    pub withhold: bool,
    /// Discard events caused by requests. Acknowledgements still go out.
    pub drop_events: bool,
    /// Send caused events before the acknowledgement.
    pub events_before_ack: bool,
    /// Request kinds answered with a refusal.
    pub declined: BTreeSet<MessageKind>,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            available: true,
            withhold: false,
            drop_events: false,
            events_before_ack: true,
            declined: BTreeSet::new(),
        }
    }
}

/// Session the host believes is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSession {
    /// Device the session runs on.
    pub device_id: String,
    /// Host-assigned session id.
    pub session_id: String,
}

/// Scripted native host attached to a [`LocalChannel`].
///
/// Clones share the same host.
#[derive(Clone)]
pub struct SimHost {
    inner: Rc<HostInner>,
}

struct HostInner {
    channel: LocalChannel,
    script: RefCell<HostScript>,
    devices: RefCell<Vec<CastDevice>>,
    session: RefCell<Option<HostSession>>,
    sessions: Cell<u64>,
    withheld: RefCell<VecDeque<String>>,
    received: RefCell<Vec<Envelope>>,
    states: RefCell<Vec<Value>>,
}

impl SimHost {
    /// Attach a host with the default script and [`sim_devices`].
    ///
    /// Replaces any host already attached to `channel`.
    pub fn attach(channel: &LocalChannel) -> Self {
        let inner = Rc::new(HostInner {
            channel: channel.clone(),
            script: RefCell::new(HostScript::default()),
            devices: RefCell::new(sim_devices()),
            session: RefCell::new(None),
            sessions: Cell::new(0),
            withheld: RefCell::new(VecDeque::new()),
            received: RefCell::new(Vec::new()),
            states: RefCell::new(Vec::new()),
        });

        let weak: Weak<HostInner> = Rc::downgrade(&inner);
        channel.attach_host(move |text| {
            if let Some(inner) = weak.upgrade() {
                inner.handle(text);
            }
        });

        Self { inner }
    }

    /// Stop answering. Posts still land in the channel outbox.
    pub fn detach(&self) {
        self.inner.channel.detach_host();
    }

    /// Current script.
    pub fn script(&self) -> HostScript {
        self.inner.script.borrow().clone()
    }

    /// Replace the script. Already withheld replies stay queued.
    pub fn set_script(&self, script: HostScript) {
        *self.inner.script.borrow_mut() = script;
    }

    /// Toggle withholding of replies.
    pub fn set_withhold(&self, withhold: bool) {
        self.inner.script.borrow_mut().withhold = withhold;
    }

    /// Toggle dropping of request-caused events.
    pub fn set_drop_events(&self, drop_events: bool) {
        self.inner.script.borrow_mut().drop_events = drop_events;
    }

    /// Choose whether caused events precede the acknowledgement.
    pub fn set_events_before_ack(&self, before: bool) {
        self.inner.script.borrow_mut().events_before_ack = before;
    }

    /// Decline (or stop declining) requests of `kind`.
    pub fn set_declined(&self, kind: MessageKind, declined: bool) {
        let mut script = self.inner.script.borrow_mut();
        if declined {
            script.declined.insert(kind);
        } else {
            script.declined.remove(&kind);
        }
    }

    /// Devices the host would report now.
    pub fn devices(&self) -> Vec<CastDevice> {
        self.inner.devices.borrow().clone()
    }

    /// Replace the device list without telling the client.
    pub fn set_devices(&self, devices: Vec<CastDevice>) {
        *self.inner.devices.borrow_mut() = devices;
    }

    /// Session the host believes is running.
    pub fn session(&self) -> Option<HostSession> {
        self.inner.session.borrow().clone()
    }

    /// Every request received, oldest first.
    pub fn received(&self) -> Vec<Envelope> {
        self.inner.received.borrow().clone()
    }

    /// Kinds of every request received, oldest first.
    pub fn received_kinds(&self) -> Vec<MessageKind> {
        self.inner.received.borrow().iter().map(Envelope::kind).collect()
    }

    /// Game states forwarded to the display, oldest first.
    pub fn states(&self) -> Vec<Value> {
        self.inner.states.borrow().clone()
    }

    /// Number of replies waiting for [`SimHost::release`].
    pub fn withheld_len(&self) -> usize {
        self.inner.withheld.borrow().len()
    }

    /// Deliver every withheld reply in order. Returns how many were sent.
    pub fn release(&self) -> usize {
        let mut released = 0;
        loop {
            let next = self.inner.withheld.borrow_mut().pop_front();
            let Some(text) = next else {
                break;
            };
            self.inner.channel.deliver(&text);
            released += 1;
        }
        debug!(released, "withheld replies released");
        released
    }

    /// Discard every withheld reply.
    pub fn discard_withheld(&self) -> usize {
        let discarded = self.inner.withheld.borrow_mut().drain(..).count();
        debug!(discarded, "withheld replies discarded");
        discarded
    }

    /// Replace the device list and announce it with `DEVICES_UPDATED`.
    pub fn emit_devices(&self, devices: Vec<CastDevice>) {
        self.set_devices(devices.clone());
        self.inner.send(&Envelope::new(Message::DevicesUpdated(DevicesUpdatedPayload { devices })));
    }

    /// End the running session from the host side.
    ///
    /// Returns `false` (and sends nothing) without a session.
    pub fn terminate(&self) -> bool {
        let Some(session) = self.inner.session.borrow_mut().take() else {
            return false;
        };
        let payload = SessionUpdatedPayload {
            device_id: Some(session.device_id),
            session_id: Some(session.session_id),
            ..SessionUpdatedPayload::new(SessionStatus::Terminated)
        };
        self.inner.send(&Envelope::new(Message::SessionUpdated(payload)));
        true
    }

    /// Fail the running session, optionally with a reason.
    ///
    /// Returns `false` (and sends nothing) without a session.
    pub fn fail_session(&self, error: Option<CastError>) -> bool {
        let Some(session) = self.inner.session.borrow_mut().take() else {
            return false;
        };
        let payload = SessionUpdatedPayload {
            device_id: Some(session.device_id),
            session_id: Some(session.session_id),
            error,
            ..SessionUpdatedPayload::new(SessionStatus::Error)
        };
        self.inner.send(&Envelope::new(Message::SessionUpdated(payload)));
        true
    }

    /// Send an unsolicited `ERROR` event.
    pub fn emit_error(&self, error: CastError) {
        self.inner.send(&Envelope::new(Message::Error(error)));
    }

    /// Deliver raw text, valid or not.
    pub fn emit_raw(&self, text: &str) {
        self.inner.channel.deliver(text);
    }
}

impl HostInner {
    fn handle(&self, text: &str) {
        let request = match Envelope::decode(text) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "host received undecodable text");
                return;
            },
        };
        trace!(kind = %request.kind(), "host received");
        self.received.borrow_mut().push(request.clone());

        let Some(request_id) = request.request_id.clone() else {
            // Fire-and-forget: only END_SESSION means anything
            if matches!(request.message, Message::EndSession) {
                let ended = self.session.borrow_mut().take();
                debug!(session = ?ended.map(|s| s.session_id), "session ended without reply");
            }
            return;
        };

        let script = self.script.borrow().clone();
        let (events, ack) = self.react(&request.message, &script);

        let mut replies: Vec<Envelope> = Vec::new();
        let events = if script.drop_events { Vec::new() } else { events };
        let ack = Envelope::with_request_id(ack, request_id);
        if script.events_before_ack {
            replies.extend(events.into_iter().map(Envelope::new));
            replies.push(ack);
        } else {
            replies.push(ack);
            replies.extend(events.into_iter().map(Envelope::new));
        }

        for reply in &replies {
            if script.withhold {
                match reply.encode() {
                    Ok(text) => self.withheld.borrow_mut().push_back(text),
                    Err(error) => warn!(%error, "host reply failed to encode"),
                }
            } else {
                self.send(reply);
            }
        }
    }

    /// Apply `request` to host state; returns caused events and the ack.
    fn react(&self, request: &Message, script: &HostScript) -> (Vec<Message>, Message) {
        let kind = request.kind();
        if script.declined.contains(&kind) {
            debug!(%kind, "host declining request");
            let error = CastError::new(REQUEST_DECLINED, format!("{kind} declined by host"));
            let ack = match kind {
                MessageKind::Ready => Message::ReadyResponse(ReadyResponsePayload {
                    success: false,
                    error: Some(error),
                    ..ReadyResponsePayload::new(false, Vec::new())
                }),
                _ => ack_for(kind, AckPayload::refused(error)),
            };
            return (Vec::new(), ack);
        }

        match request {
            Message::Ready(_) => {
                let devices = self.devices.borrow().clone();
                (Vec::new(), Message::ReadyResponse(ReadyResponsePayload::new(script.available, devices)))
            },
            Message::ScanDevices => {
                let devices = self.devices.borrow().clone();
                let event = Message::DevicesUpdated(DevicesUpdatedPayload { devices });
                (vec![event], Message::ScanDevicesResponse(AckPayload::ok()))
            },
            Message::StartSession(payload) => {
                let device = self.devices.borrow().iter().find(|d| d.id == payload.device_id).cloned();
                let Some(device) = device else {
                    let error = CastError::new(DEVICE_NOT_FOUND, format!("no device {}", payload.device_id));
                    return (Vec::new(), Message::StartSessionResponse(AckPayload::refused(error)));
                };

                let number = self.sessions.get() + 1;
                self.sessions.set(number);
                let session_id = format!("sim-session-{number}");
                *self.session.borrow_mut() =
                    Some(HostSession { device_id: device.id.clone(), session_id: session_id.clone() });
                debug!(device_id = %device.id, %session_id, "host session started");

                let connecting = SessionUpdatedPayload {
                    device_id: Some(device.id.clone()),
                    ..SessionUpdatedPayload::new(SessionStatus::Connecting)
                };
                let connected = SessionUpdatedPayload::connected(device.id, device.name, session_id);
                (
                    vec![Message::SessionUpdated(connecting), Message::SessionUpdated(connected)],
                    Message::StartSessionResponse(AckPayload::ok()),
                )
            },
            Message::EndSession => {
                let ended = self.session.borrow_mut().take();
                debug!(session = ?ended.map(|s| s.session_id), "host session ended");
                (Vec::new(), Message::EndSessionResponse(AckPayload::ok()))
            },
            Message::StateUpdate(payload) => {
                self.states.borrow_mut().push(payload.state.clone());
                (Vec::new(), Message::StateUpdateResponse(AckPayload::ok()))
            },
            other => {
                warn!(kind = %other.kind(), "host received a message it never expects");
                let error = CastError::new(REQUEST_DECLINED, format!("unexpected {}", other.kind()));
                (Vec::new(), Message::Error(error))
            },
        }
    }

    fn send(&self, envelope: &Envelope) {
        match envelope.encode() {
            Ok(text) => self.channel.deliver(&text),
            Err(error) => warn!(%error, kind = %envelope.kind(), "host message failed to encode"),
        }
    }
}

/// Acknowledgement message answering `kind`.
fn ack_for(kind: MessageKind, ack: AckPayload) -> Message {
    match kind {
        MessageKind::ScanDevices => Message::ScanDevicesResponse(ack),
        MessageKind::StartSession => Message::StartSessionResponse(ack),
        MessageKind::EndSession => Message::EndSessionResponse(ack),
        MessageKind::StateUpdate => Message::StateUpdateResponse(ack),
        _ => Message::Error(ack.error.unwrap_or_else(|| CastError::new(REQUEST_DECLINED, "declined"))),
    }
}
