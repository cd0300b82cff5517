//! The UI-facing casting contract.

use std::future::Future;

use castlink_client::{CastClient, ClientError, DebugLogEntry, HostChannel, StartOptions};
use castlink_core::{CastState, Selector, Subscription, env::Environment};
use castlink_proto::payloads::{ReadyPayload, Value};

/// Casting operations and state access for UI code.
///
/// # Implementations
///
/// - [`CastClient`]: talks to a real host over its channel
/// - [`MockCastClient`](crate::MockCastClient): fakes a host with canned
///   devices and artificial latency
///
/// Both honour the same state semantics, so UI code written against this
/// trait behaves identically in a browser preview and inside the host app.
pub trait CastApi {
    /// Current state snapshot.
    fn state(&self) -> CastState;

    /// Notify `listener` after every state update.
    fn subscribe(&self, listener: impl Fn(&CastState) + 'static) -> Subscription;

    /// Notify `listener` when `selector`'s projection changes.
    fn select<T>(
        &self,
        selector: &Selector<CastState, T>,
        listener: impl Fn(&T) + 'static,
    ) -> Subscription
    where
        T: Clone + PartialEq + 'static;

    /// Announce the game and learn host availability.
    fn signal_ready(&self, params: ReadyPayload) -> impl Future<Output = Result<(), ClientError>>;

    /// Discover devices.
    fn scan_for_devices(&self) -> impl Future<Output = Result<(), ClientError>>;

    /// Start a session on `device_id`.
    fn start_casting(
        &self,
        device_id: String,
        options: StartOptions,
    ) -> impl Future<Output = Result<(), ClientError>>;

    /// End the current session. Never fails without one.
    fn stop_casting(&self) -> impl Future<Output = Result<(), ClientError>>;

    /// Forward game state to the display.
    fn send_state_update(&self, state: Value) -> impl Future<Output = Result<(), ClientError>>;

    /// Clear `state.error`.
    fn reset_error(&self);

    /// Debug log, oldest first.
    fn debug_logs(&self) -> Vec<DebugLogEntry>;
}

impl<C: HostChannel, E: Environment> CastApi for CastClient<C, E> {
    fn state(&self) -> CastState {
        CastClient::state(self)
    }

    fn subscribe(&self, listener: impl Fn(&CastState) + 'static) -> Subscription {
        CastClient::subscribe(self, listener)
    }

    fn select<T>(
        &self,
        selector: &Selector<CastState, T>,
        listener: impl Fn(&T) + 'static,
    ) -> Subscription
    where
        T: Clone + PartialEq + 'static,
    {
        CastClient::select(self, selector, listener)
    }

    fn signal_ready(&self, params: ReadyPayload) -> impl Future<Output = Result<(), ClientError>> {
        CastClient::signal_ready(self, params)
    }

    fn scan_for_devices(&self) -> impl Future<Output = Result<(), ClientError>> {
        CastClient::scan_for_devices(self)
    }

    fn start_casting(
        &self,
        device_id: String,
        options: StartOptions,
    ) -> impl Future<Output = Result<(), ClientError>> {
        CastClient::start_casting(self, device_id, options)
    }

    fn stop_casting(&self) -> impl Future<Output = Result<(), ClientError>> {
        CastClient::stop_casting(self)
    }

    fn send_state_update(&self, state: Value) -> impl Future<Output = Result<(), ClientError>> {
        CastClient::send_state_update(self, state)
    }

    fn reset_error(&self) {
        CastClient::reset_error(self);
    }

    fn debug_logs(&self) -> Vec<DebugLogEntry> {
        CastClient::debug_logs(self)
    }
}
