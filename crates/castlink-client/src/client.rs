//! Casting session controller.
//!
//! [`CastClient`] translates user actions into protocol requests and host
//! events into [`CastState`] patches. It is the only writer of its store.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──scan──▶ Scanning ──DEVICES_UPDATED / ack──▶ Idle
//! Idle ──start──▶ Connecting ──SESSION_UPDATED(connected)──▶ Casting
//! Casting ──stop / terminated / error──▶ Idle
//! ```
//!
//! `error` can be set from any phase and is only cleared by
//! [`CastClient::reset_error`].
//!
//! # Ordering
//!
//! Acknowledgements and events race. `START_SESSION` is acknowledged
//! separately from the `SESSION_UPDATED` event that actually establishes the
//! session, and either may arrive first (or the event not at all). The event
//! is the authority for casting fields; the ack only reports refusals.
//!
//! # Invariants
//!
//! - `is_casting` implies `session_id` and `device_id` are set.
//! - `is_casting` and `is_connecting` are never both true after any patch
//!   this controller applies.
//! - Every failed operation records the same failure in `state.error`.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use castlink_core::{
    CastDevice, CastError, CastState, CastStatePatch, Selector, Store, Subscription,
    env::Environment,
};
use castlink_proto::{
    Envelope, Message, MessageKind, SessionStatus,
    payloads::{
        ReadyPayload, SessionUpdatedPayload, StartSessionPayload, StateUpdatePayload, Value,
        session::SESSION_ERROR,
    },
};
use tracing::{debug, info, warn};

use crate::{
    Bridge, BridgeActivity, ClientConfig, ClientError, DebugLog, DebugLogEntry, LogKind,
    channel::HostChannel,
};

/// Options for [`CastClient::start_casting`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartOptions {
    /// Game state the display should start from.
    pub initial_state: Option<Value>,
}

impl StartOptions {
    /// Start from `state`.
    pub fn with_initial_state(state: Value) -> Self {
        Self { initial_state: Some(state) }
    }
}

/// Web-side casting session controller.
///
/// Cloning yields another handle to the same session.
pub struct CastClient<C: HostChannel, E: Environment> {
    inner: Rc<ClientInner<C, E>>,
}

struct ClientInner<C: HostChannel, E: Environment> {
    bridge: Bridge<C, E>,
    store: Store<CastState>,
    config: ClientConfig,
    env: E,
    log: DebugLog,
    /// Devices whose connection attempts were abandoned by `stop_casting`
    /// and not restarted since.
    abandoned: RefCell<BTreeSet<String>>,
    events: RefCell<Option<Subscription>>,
}

impl<C: HostChannel, E: Environment> Clone for CastClient<C, E> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<C: HostChannel, E: Environment> CastClient<C, E> {
    /// Create a client talking over `channel`.
    pub fn new(channel: C, env: E, config: ClientConfig) -> Self {
        let bridge = Bridge::new(channel, env.clone());
        let inner = Rc::new(ClientInner {
            bridge,
            store: Store::new(CastState::default()),
            config,
            env,
            log: DebugLog::new(),
            abandoned: RefCell::new(BTreeSet::new()),
            events: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let events = inner.bridge.add_event_listener(move |envelope| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(envelope);
            }
        });
        *inner.events.borrow_mut() = Some(events);

        let weak = Rc::downgrade(&inner);
        inner.bridge.set_observer(move |activity| {
            if let Some(inner) = weak.upgrade() {
                inner.record_activity(activity);
            }
        });

        inner.record(LogKind::Info, "client created", None);
        Self { inner }
    }

    /// Current state snapshot.
    pub fn state(&self) -> CastState {
        self.inner.store.get_state()
    }

    /// Notify `listener` after every state update.
    pub fn subscribe(&self, listener: impl Fn(&CastState) + 'static) -> Subscription {
        self.inner.store.subscribe(listener)
    }

    /// Notify `listener` when `selector`'s projection changes.
    pub fn select<T>(
        &self,
        selector: &Selector<CastState, T>,
        listener: impl Fn(&T) + 'static,
    ) -> Subscription
    where
        T: Clone + PartialEq + 'static,
    {
        self.inner.store.select(selector, listener)
    }

    /// The underlying store.
    pub fn store(&self) -> &Store<CastState> {
        &self.inner.store
    }

    /// The underlying bridge.
    pub fn bridge(&self) -> &Bridge<C, E> {
        &self.inner.bridge
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Copy of the debug log, oldest first.
    pub fn debug_logs(&self) -> Vec<DebugLogEntry> {
        self.inner.log.entries()
    }

    /// Announce the game to the host and learn whether casting is available.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`]; the failure is also recorded in `state.error`.
    pub async fn signal_ready(&self, params: ReadyPayload) -> Result<(), ClientError> {
        let game_id = params.game_id.clone();
        match self.request(Message::Ready(params)).await {
            Ok(Message::ReadyResponse(response)) => {
                info!(
                    %game_id,
                    available = response.available,
                    devices = response.devices.len(),
                    "host ready"
                );
                self.inner.store.set_state(
                    CastStatePatch::new().available(response.available).devices(response.devices),
                );
                Ok(())
            },
            Ok(other) => Err(self.inner.fail(
                CastStatePatch::new(),
                ClientError::UnexpectedResponse {
                    request: MessageKind::Ready,
                    received: other.kind(),
                },
            )),
            Err(error) => Err(self.inner.fail(CastStatePatch::new(), error)),
        }
    }

    /// Ask the host to discover devices.
    ///
    /// Devices arrive through `DEVICES_UPDATED`; the acknowledgement only
    /// ends the scan if that event has not already done so.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`]; the failure is also recorded in `state.error`.
    pub async fn scan_for_devices(&self) -> Result<(), ClientError> {
        self.inner.store.set_state(CastStatePatch::new().scanning(true));

        match self.request(Message::ScanDevices).await {
            Ok(_) => {
                self.inner.store.set_state(CastStatePatch::new().scanning(false));
                Ok(())
            },
            Err(error) => Err(self.inner.fail(CastStatePatch::new().scanning(false), error)),
        }
    }

    /// Ask the host to start a session on `device_id`.
    ///
    /// Marks the client connecting immediately. Casting begins when the host
    /// reports `SESSION_UPDATED(connected)`, which may arrive before or after
    /// this call returns.
    ///
    /// # Errors
    ///
    /// - `ClientError::SessionActive` if a session is already established
    /// - any other [`ClientError`]; the optimistic connecting state is
    ///   rolled back
    ///
    /// Every failure is also recorded in `state.error`.
    pub async fn start_casting(
        &self,
        device_id: impl Into<String>,
        options: StartOptions,
    ) -> Result<(), ClientError> {
        let device_id = device_id.into();

        let current = self.inner.store.get_state();
        if current.is_casting {
            let error = ClientError::SessionActive {
                device_id: current.device_id.unwrap_or_default(),
            };
            return Err(self.inner.fail(CastStatePatch::new(), error));
        }

        self.inner.abandoned.borrow_mut().remove(&device_id);
        self.inner
            .store
            .set_state(CastStatePatch::new().connecting(true).device_id(Some(device_id.clone())));
        info!(device_id = %device_id, "starting session");

        let message = Message::StartSession(StartSessionPayload {
            device_id: device_id.clone(),
            initial_state: options.initial_state,
        });
        match self.request(message).await {
            Ok(_) => Ok(()),
            Err(error) => {
                // Only undo our own optimistic patch; the host may have moved on
                let state = self.inner.store.get_state();
                let still_ours =
                    state.is_connecting && state.device_id.as_deref() == Some(device_id.as_str());
                let rollback = if still_ours {
                    CastStatePatch::new().connecting(false).device_id(None)
                } else {
                    CastStatePatch::new()
                };
                Err(self.inner.fail(rollback, error))
            },
        }
    }

    /// End the current session.
    ///
    /// Without a session this is a no-op that never fails. A connection
    /// attempt still in flight is abandoned locally: the connecting state is
    /// cleared and a late `connected` event for that device is refused.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] from the `END_SESSION` request; casting fields are
    /// left unchanged and the failure is recorded in `state.error`.
    pub async fn stop_casting(&self) -> Result<(), ClientError> {
        let state = self.inner.store.get_state();

        if state.session_id.is_none() {
            if state.is_connecting {
                warn!(device_id = ?state.device_id, "abandoning connection attempt");
                if let Some(device_id) = &state.device_id {
                    self.inner.abandoned.borrow_mut().insert(device_id.clone());
                }
                self.inner.store.set_state(CastStatePatch::new().connecting(false).device_id(None));
                self.inner.record(LogKind::Info, "connection attempt abandoned", None);
            }
            return Ok(());
        }

        match self.request(Message::EndSession).await {
            Ok(_) => {
                info!(device_id = ?state.device_id, "session ended");
                self.inner.store.update(|s| {
                    CastStatePatch::new().clear_session().devices(with_connected(&s.devices, None))
                });
                Ok(())
            },
            Err(error) => Err(self.inner.fail(CastStatePatch::new(), error)),
        }
    }

    /// Forward game state to the display.
    ///
    /// # Errors
    ///
    /// - `ClientError::NoActiveSession` without a session (nothing is sent)
    /// - any other [`ClientError`]
    ///
    /// Every failure is also recorded in `state.error`.
    pub async fn send_state_update(&self, state: Value) -> Result<(), ClientError> {
        if self.inner.store.get_state().session_id.is_none() {
            return Err(self.inner.fail(CastStatePatch::new(), ClientError::NoActiveSession));
        }

        let timestamp = self.inner.env.wall_clock_millis();
        let message = Message::StateUpdate(StateUpdatePayload { state, timestamp: Some(timestamp) });
        match self.request(message).await {
            Ok(_) => Ok(()),
            Err(error) => Err(self.inner.fail(CastStatePatch::new(), error)),
        }
    }

    /// Clear `state.error`.
    pub fn reset_error(&self) {
        self.inner.store.set_state(CastStatePatch::new().error(None));
    }

    /// Detach from the host channel and fail outstanding requests.
    pub fn dispose(&self) {
        self.inner.events.borrow_mut().take();
        self.inner.bridge.dispose();
        self.inner.record(LogKind::Info, "client disposed", None);
    }

    /// Send a correlated request and vet the reply.
    async fn request(&self, message: Message) -> Result<Message, ClientError> {
        let kind = message.kind();
        let envelope = self.inner.bridge.prepare(message);
        let response =
            self.inner.bridge.send_with_response(envelope, self.inner.config.request_timeout).await?;

        if let Message::Error(error) = response {
            return Err(ClientError::Host(error));
        }
        if let Some(error) = response.declined() {
            warn!(kind = %kind, code = %error.code, "host declined request");
            return Err(ClientError::Declined { kind, error });
        }
        if kind.response_kind() != Some(response.kind()) {
            return Err(ClientError::UnexpectedResponse { request: kind, received: response.kind() });
        }
        Ok(response)
    }
}

impl<C: HostChannel, E: Environment> ClientInner<C, E> {
    /// Record `error` in state together with `patch`, and hand it back.
    fn fail(&self, patch: CastStatePatch, error: ClientError) -> ClientError {
        warn!(code = error.code(), %error, "operation failed");
        self.record(LogKind::Error, &error.to_string(), None);
        self.store.set_state(patch.error(Some(error.to_cast_error())));
        error
    }

    fn record(&self, kind: LogKind, message: &str, data: Option<Value>) {
        self.log.push(DebugLogEntry {
            timestamp: self.env.wall_clock_millis(),
            kind,
            message: message.to_owned(),
            data,
        });
    }

    fn record_activity(&self, activity: &BridgeActivity<'_>) {
        match activity {
            BridgeActivity::Sent(envelope) => {
                self.record(LogKind::Send, envelope.kind().as_str(), envelope.to_value().ok());
            },
            BridgeActivity::Response(envelope) => {
                self.record(LogKind::Receive, envelope.kind().as_str(), envelope.to_value().ok());
            },
            BridgeActivity::Unmatched(envelope) => {
                let message = format!("unmatched {}", envelope.kind());
                self.record(LogKind::Info, &message, envelope.to_value().ok());
            },
            BridgeActivity::Rejected { raw, error } => {
                if self.config.debug {
                    let message = format!("rejected inbound message: {error}");
                    self.record(LogKind::Error, &message, Some(Value::String((*raw).to_owned())));
                }
            },
        }
    }

    fn handle_event(&self, envelope: &Envelope) {
        self.record(LogKind::Event, envelope.kind().as_str(), envelope.to_value().ok());

        match &envelope.message {
            Message::DevicesUpdated(payload) => {
                debug!(devices = payload.devices.len(), "devices updated");
                self.store
                    .set_state(CastStatePatch::new().devices(payload.devices.clone()).scanning(false));
            },
            Message::SessionUpdated(payload) => self.handle_session_update(payload),
            Message::Error(error) => {
                warn!(code = %error.code, message = %error.message, "host error");
                self.store.set_state(CastStatePatch::new().error(Some(error.clone())));
            },
            Message::Ready(_)
            | Message::ReadyResponse(_)
            | Message::ScanDevices
            | Message::ScanDevicesResponse(_)
            | Message::StartSession(_)
            | Message::StartSessionResponse(_)
            | Message::EndSession
            | Message::EndSessionResponse(_)
            | Message::StateUpdate(_)
            | Message::StateUpdateResponse(_) => {
                debug!(kind = %envelope.kind(), "ignoring non-event message");
            },
        }
    }

    fn handle_session_update(&self, payload: &SessionUpdatedPayload) {
        match payload.status {
            SessionStatus::Connecting => {
                let device_id = payload.device_id.clone();
                if self.is_abandoned(device_id.as_deref()) {
                    debug!(device_id = ?device_id, "ignoring connecting for abandoned device");
                    return;
                }
                self.store.update(move |s| {
                    if s.is_casting {
                        return CastStatePatch::new();
                    }
                    let patch = CastStatePatch::new().connecting(true);
                    match device_id {
                        Some(id) => patch.device_id(Some(id)),
                        None => patch,
                    }
                });
            },
            SessionStatus::Connected => {
                let device_id = payload.device_id.clone();
                if self.is_abandoned(device_id.as_deref()) {
                    self.refuse_abandoned_session(device_id.as_deref());
                    return;
                }

                info!(device_id = ?device_id, session_id = ?payload.session_id, "casting");
                let device_name = payload.device_name.clone();
                let session_id = payload.session_id.clone();
                self.store.update(move |s| {
                    let name = device_name.or_else(|| {
                        device_id.as_deref().and_then(|id| s.device(id)).map(|d| d.name.clone())
                    });
                    CastStatePatch::new()
                        .connecting(false)
                        .casting(true)
                        .device_name(name)
                        .session_id(session_id)
                        .devices(with_connected(&s.devices, device_id.as_deref()))
                        .device_id(device_id)
                });
            },
            SessionStatus::Terminated => {
                info!(session_id = ?payload.session_id, "session terminated");
                self.store.update(|s| {
                    CastStatePatch::new()
                        .clear_session()
                        .devices(with_connected(&s.devices, None))
                });
            },
            SessionStatus::Error => {
                let error = payload
                    .error
                    .clone()
                    .unwrap_or_else(|| CastError::new(SESSION_ERROR, "session failed"));
                warn!(code = %error.code, "session error");
                self.store.update(move |s| {
                    CastStatePatch::new()
                        .clear_session()
                        .devices(with_connected(&s.devices, None))
                        .error(Some(error))
                });
            },
        }
    }

    fn is_abandoned(&self, device_id: Option<&str>) -> bool {
        device_id.is_some_and(|id| self.abandoned.borrow().contains(id))
    }

    fn refuse_abandoned_session(&self, device_id: Option<&str>) {
        warn!(device_id = ?device_id, "ending session the user already abandoned");
        if let Some(id) = device_id {
            self.abandoned.borrow_mut().remove(id);
        }
        self.record(LogKind::Info, "refusing abandoned session", None);
        if let Err(error) = self.bridge.send(&Envelope::new(Message::EndSession)) {
            warn!(%error, "failed to end abandoned session");
        }
    }
}

/// Copy of `devices` where only `device_id` is marked connected.
///
/// There is at most one session, so `None` disconnects every device.
fn with_connected(devices: &[CastDevice], device_id: Option<&str>) -> Vec<CastDevice> {
    devices
        .iter()
        .map(|d| CastDevice { is_connected: Some(d.id.as_str()) == device_id, ..d.clone() })
        .collect()
}
