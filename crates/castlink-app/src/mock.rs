//! Mock casting client.
//!
//! Stands in for the real client where no host exists. It fakes a host with
//! a fixed device list and artificial latency but applies the same state
//! transitions as [`CastClient`](castlink_client::CastClient): optimistic
//! connecting, rollback on failure, abandoned connects, errors persisting
//! until reset.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use castlink_client::{ClientError, DebugLog, DebugLogEntry, LogKind, StartOptions};
use castlink_core::{
    CastDevice, CastError, CastState, CastStatePatch, Selector, Store, Subscription,
    env::Environment,
};
use castlink_proto::{
    MessageKind,
    payloads::{ReadyPayload, Value},
};
use tracing::debug;

use crate::CastApi;

/// Error code for a start request naming an unknown device.
pub const DEVICE_NOT_FOUND: &str = "DEVICE_NOT_FOUND";

/// Behaviour of a [`MockCastClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    /// Delay applied to every operation.
    pub latency: Duration,
    /// Devices "discovered" by a scan and reported on ready.
    pub devices: Vec<CastDevice>,
    /// Availability reported on ready.
    pub available: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(500),
            devices: vec![
                CastDevice::new("mock-tv-1", "Living Room TV", "chromecast"),
                CastDevice::new("mock-tv-2", "Bedroom TV", "chromecast"),
            ],
            available: true,
        }
    }
}

impl MockConfig {
    /// Override the latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Override the device list.
    #[must_use]
    pub fn with_devices(mut self, devices: Vec<CastDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// Override availability.
    #[must_use]
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }
}

/// [`CastApi`] implementation with no host behind it.
pub struct MockCastClient<E: Environment> {
    inner: Rc<MockInner<E>>,
}

struct MockInner<E: Environment> {
    store: Store<CastState>,
    env: E,
    config: MockConfig,
    log: DebugLog,
    sessions: Cell<u64>,
    /// Bumped by every start and stop; a start only completes if unchanged.
    attempt: Cell<u64>,
    sent_states: RefCell<Vec<Value>>,
}

impl<E: Environment> Clone for MockCastClient<E> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<E: Environment> MockCastClient<E> {
    /// Create a mock client.
    pub fn new(env: E, config: MockConfig) -> Self {
        let inner = MockInner {
            store: Store::new(CastState::default()),
            env,
            config,
            log: DebugLog::new(),
            sessions: Cell::new(0),
            attempt: Cell::new(0),
            sent_states: RefCell::new(Vec::new()),
        };
        let client = Self { inner: Rc::new(inner) };
        client.record(LogKind::Info, "mock client created");
        client
    }

    /// Every state passed to `send_state_update`, oldest first.
    pub fn sent_states(&self) -> Vec<Value> {
        self.inner.sent_states.borrow().clone()
    }

    async fn delay(&self) {
        self.inner.env.sleep(self.inner.config.latency).await;
    }

    fn record(&self, kind: LogKind, message: &str) {
        self.inner.log.push(DebugLogEntry {
            timestamp: self.inner.env.wall_clock_millis(),
            kind,
            message: message.to_owned(),
            data: None,
        });
    }

    fn fail(&self, patch: CastStatePatch, error: ClientError) -> ClientError {
        self.record(LogKind::Error, &error.to_string());
        self.inner.store.set_state(patch.error(Some(error.to_cast_error())));
        error
    }

    fn next_attempt(&self) -> u64 {
        let attempt = self.inner.attempt.get() + 1;
        self.inner.attempt.set(attempt);
        attempt
    }

    async fn ready(&self, params: ReadyPayload) -> Result<(), ClientError> {
        self.record(LogKind::Send, MessageKind::Ready.as_str());
        self.delay().await;
        debug!(game_id = %params.game_id, "mock ready");
        self.inner.store.set_state(
            CastStatePatch::new()
                .available(self.inner.config.available)
                .devices(self.inner.config.devices.clone()),
        );
        self.record(LogKind::Receive, MessageKind::ReadyResponse.as_str());
        Ok(())
    }

    async fn scan(&self) -> Result<(), ClientError> {
        self.inner.store.set_state(CastStatePatch::new().scanning(true));
        self.record(LogKind::Send, MessageKind::ScanDevices.as_str());
        self.delay().await;
        self.inner.store.set_state(
            CastStatePatch::new().devices(self.inner.config.devices.clone()).scanning(false),
        );
        self.record(LogKind::Event, MessageKind::DevicesUpdated.as_str());
        Ok(())
    }

    async fn start(&self, device_id: String, _options: StartOptions) -> Result<(), ClientError> {
        let current = self.inner.store.get_state();
        if current.is_casting {
            let error = ClientError::SessionActive { device_id: current.device_id.unwrap_or_default() };
            return Err(self.fail(CastStatePatch::new(), error));
        }

        let attempt = self.next_attempt();
        self.inner
            .store
            .set_state(CastStatePatch::new().connecting(true).device_id(Some(device_id.clone())));
        self.record(LogKind::Send, MessageKind::StartSession.as_str());
        self.delay().await;

        let Some(device) = self.inner.config.devices.iter().find(|d| d.id == device_id).cloned()
        else {
            let state = self.inner.store.get_state();
            let rollback = if state.is_connecting && state.device_id.as_ref() == Some(&device_id) {
                CastStatePatch::new().connecting(false).device_id(None)
            } else {
                CastStatePatch::new()
            };
            let error = ClientError::Declined {
                kind: MessageKind::StartSession,
                error: CastError::new(DEVICE_NOT_FOUND, format!("no device {device_id}")),
            };
            return Err(self.fail(rollback, error));
        };

        if self.inner.attempt.get() != attempt {
            debug!(device_id = %device_id, "mock connect abandoned");
            return Ok(());
        }

        let session = self.inner.sessions.get() + 1;
        self.inner.sessions.set(session);
        self.inner.store.update(move |s| {
            let devices = s
                .devices
                .iter()
                .map(|d| CastDevice { is_connected: d.id == device.id, ..d.clone() })
                .collect();
            CastStatePatch::new()
                .connecting(false)
                .casting(true)
                .device_id(Some(device.id.clone()))
                .device_name(Some(device.name.clone()))
                .session_id(Some(format!("mock-session-{session}")))
                .devices(devices)
        });
        self.record(LogKind::Event, MessageKind::SessionUpdated.as_str());
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        let state = self.inner.store.get_state();
        if state.session_id.is_none() {
            if state.is_connecting {
                self.next_attempt();
                self.inner.store.set_state(CastStatePatch::new().connecting(false).device_id(None));
                self.record(LogKind::Info, "connection attempt abandoned");
            }
            return Ok(());
        }

        self.next_attempt();
        self.record(LogKind::Send, MessageKind::EndSession.as_str());
        self.delay().await;
        self.inner.store.update(|s| {
            let devices =
                s.devices.iter().map(|d| CastDevice { is_connected: false, ..d.clone() }).collect();
            CastStatePatch::new().clear_session().devices(devices)
        });
        Ok(())
    }

    async fn push_state(&self, state: Value) -> Result<(), ClientError> {
        if self.inner.store.get_state().session_id.is_none() {
            return Err(self.fail(CastStatePatch::new(), ClientError::NoActiveSession));
        }
        self.record(LogKind::Send, MessageKind::StateUpdate.as_str());
        self.delay().await;
        self.inner.sent_states.borrow_mut().push(state);
        Ok(())
    }
}

impl<E: Environment> CastApi for MockCastClient<E> {
    fn state(&self) -> CastState {
        self.inner.store.get_state()
    }

    fn subscribe(&self, listener: impl Fn(&CastState) + 'static) -> Subscription {
        self.inner.store.subscribe(listener)
    }

    fn select<T>(
        &self,
        selector: &Selector<CastState, T>,
        listener: impl Fn(&T) + 'static,
    ) -> Subscription
    where
        T: Clone + PartialEq + 'static,
    {
        self.inner.store.select(selector, listener)
    }

    fn signal_ready(
        &self,
        params: ReadyPayload,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> {
        self.ready(params)
    }

    fn scan_for_devices(&self) -> impl std::future::Future<Output = Result<(), ClientError>> {
        self.scan()
    }

    fn start_casting(
        &self,
        device_id: String,
        options: StartOptions,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> {
        self.start(device_id, options)
    }

    fn stop_casting(&self) -> impl std::future::Future<Output = Result<(), ClientError>> {
        self.stop()
    }

    fn send_state_update(
        &self,
        state: Value,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> {
        self.push_state(state)
    }

    fn reset_error(&self) {
        self.inner.store.set_state(CastStatePatch::new().error(None));
    }

    fn debug_logs(&self) -> Vec<DebugLogEntry> {
        self.inner.log.entries()
    }
}

#[cfg(test)]
mod tests {
    use castlink_client::SystemEnv;

    use super::*;

    fn mock() -> MockCastClient<SystemEnv> {
        MockCastClient::new(SystemEnv::new(), MockConfig::default().with_latency(Duration::from_millis(10)))
    }

    #[tokio::test(start_paused = true)]
    async fn scan_reports_fake_devices() {
        let client = mock();
        client.scan_for_devices().await.expect("scan");

        let state = client.state();
        assert_eq!(state.devices.len(), 2);
        assert!(!state.is_scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_round_trip() {
        let client = mock();
        client.start_casting("mock-tv-2".into(), StartOptions::default()).await.expect("start");

        let state = client.state();
        assert!(state.is_casting);
        assert!(!state.is_connecting);
        assert_eq!(state.device_name.as_deref(), Some("Bedroom TV"));
        assert_eq!(state.session_id.as_deref(), Some("mock-session-1"));

        client.send_state_update(serde_json::json!({ "turn": 2 })).await.expect("update");
        assert_eq!(client.sent_states().len(), 1);

        client.stop_casting().await.expect("stop");
        let state = client.state();
        assert!(!state.is_casting);
        assert!(state.session_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_device_rolls_back() {
        let client = mock();
        let error = client.start_casting("nope".into(), StartOptions::default()).await.expect_err("unknown");

        assert_eq!(error.code(), DEVICE_NOT_FOUND);
        let state = client.state();
        assert!(!state.is_connecting);
        assert!(state.device_id.is_none());
        assert_eq!(state.error.map(|e| e.code), Some(DEVICE_NOT_FOUND.to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_connect_abandons() {
        let client = mock();
        let (start, stop) = tokio::join!(
            client.start_casting("mock-tv-1".into(), StartOptions::default()),
            client.stop_casting()
        );
        start.expect("start");
        stop.expect("stop");

        let state = client.state();
        assert!(!state.is_casting);
        assert!(!state.is_connecting);
        assert!(state.session_id.is_none());
    }
}
