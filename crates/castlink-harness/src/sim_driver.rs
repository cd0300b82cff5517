//! Simulation driver for the session controller.
//!
//! `SimDriver` wires a real [`CastClient`] to a [`SimHost`] over a
//! [`LocalChannel`], with [`SimEnv`] supplying time and randomness. It
//! applies the same [`Operation`]s as the reference model so property tests
//! can compare the two, and optionally checks invariants on every state
//! notification as well as between operations.
//!
//! Run it on a current-thread runtime with a paused clock: withheld replies
//! then time out instantly and deterministically.

use std::{cell::RefCell, rc::Rc};

use castlink_client::{CastClient, ClientConfig, LocalChannel, StartOptions};
use castlink_core::Subscription;
use castlink_proto::{
    CastError,
    payloads::{Map, ReadyPayload, Value},
};
use tracing::debug;

use crate::{
    SimEnv, SimHost,
    invariants::{InvariantRegistry, SessionSnapshot, SystemSnapshot, Violation},
    model::{HOST_FAILURE, ObservableState, Operation, OperationResult, device_id, device_list, garbage},
};

/// Game id announced by [`Operation::Ready`].
pub const SIM_GAME_ID: &str = "sim-game";

/// Real client plus scripted host.
pub struct SimDriver {
    env: SimEnv,
    channel: LocalChannel,
    host: SimHost,
    client: CastClient<LocalChannel, SimEnv>,
    invariants: Option<Rc<InvariantRegistry>>,
    violations: Rc<RefCell<Vec<Violation>>>,
    _monitor: Option<Subscription>,
}

impl SimDriver {
    /// Driver with the default client configuration.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, ClientConfig::default())
    }

    /// Driver with an explicit client configuration.
    pub fn with_config(seed: u64, config: ClientConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let channel = LocalChannel::new();
        let host = SimHost::attach(&channel);
        let client = CastClient::new(channel.clone(), env.clone(), config);
        Self {
            env,
            channel,
            host,
            client,
            invariants: None,
            violations: Rc::new(RefCell::new(Vec::new())),
            _monitor: None,
        }
    }

    /// Check `registry` on every state notification and between operations.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        let registry = Rc::new(registry);
        let checker = Rc::clone(&registry);
        let sink = Rc::clone(&self.violations);
        let monitor = self.client.subscribe(move |state| {
            let snapshot = SystemSnapshot::single(SessionSnapshot::new("client", state.clone()).unsettled());
            if let Err(found) = checker.check_all(&snapshot) {
                sink.borrow_mut().extend(found);
            }
        });
        self.invariants = Some(registry);
        self._monitor = Some(monitor);
        self
    }

    /// The client under test.
    pub fn client(&self) -> &CastClient<LocalChannel, SimEnv> {
        &self.client
    }

    /// The scripted host.
    pub fn host(&self) -> &SimHost {
        &self.host
    }

    /// The shared channel.
    pub fn channel(&self) -> &LocalChannel {
        &self.channel
    }

    /// The simulated environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Apply one operation, waiting until the client settles.
    pub async fn apply(&self, op: &Operation) -> OperationResult {
        // Each operation starts with a fresh cooperative budget, so futures
        // that are already complete never yield partway through
        tokio::task::yield_now().await;
        debug!(?op, "applying");

        match op {
            Operation::Ready => {
                OperationResult::from_client(self.client.signal_ready(ReadyPayload::new(SIM_GAME_ID)).await)
            },
            Operation::Scan => OperationResult::from_client(self.client.scan_for_devices().await),
            Operation::Start { device } => OperationResult::from_client(
                self.client.start_casting(device_id(*device), StartOptions::default()).await,
            ),
            Operation::Stop => OperationResult::from_client(self.client.stop_casting().await),
            Operation::StartThenStop { device } => {
                let (start, stop) = tokio::join!(
                    self.client.start_casting(device_id(*device), StartOptions::default()),
                    self.client.stop_casting()
                );
                OperationResult::from_client(start).and(OperationResult::from_client(stop))
            },
            Operation::PushState { turn } => {
                let mut state = Map::new();
                state.insert("turn".to_owned(), Value::from(*turn));
                OperationResult::from_client(self.client.send_state_update(Value::Object(state)).await)
            },
            Operation::ResetError => {
                self.client.reset_error();
                OperationResult::Ok
            },
            Operation::HostDevices { count } => {
                self.host.emit_devices(device_list(*count));
                OperationResult::Ok
            },
            Operation::HostTerminate => {
                self.host.terminate();
                OperationResult::Ok
            },
            Operation::HostSessionError => {
                self.host.fail_session(None);
                OperationResult::Ok
            },
            Operation::HostError => {
                self.host.emit_error(CastError::new(HOST_FAILURE, "simulated host failure"));
                OperationResult::Ok
            },
            Operation::Garbage { variant } => {
                self.host.emit_raw(garbage(*variant));
                OperationResult::Ok
            },
            Operation::Withhold { enabled } => {
                self.host.set_withhold(*enabled);
                OperationResult::Ok
            },
            Operation::Release => {
                self.host.release();
                OperationResult::Ok
            },
            Operation::DropEvents { enabled } => {
                self.host.set_drop_events(*enabled);
                OperationResult::Ok
            },
            Operation::EventsBeforeAck { enabled } => {
                self.host.set_events_before_ack(*enabled);
                OperationResult::Ok
            },
            Operation::Decline { request, enabled } => {
                self.host.set_declined(request.kind(), *enabled);
                OperationResult::Ok
            },
        }
    }

    /// State to compare with the reference model.
    pub fn observable(&self) -> ObservableState {
        ObservableState::capture(
            &self.client.state(),
            self.host.session().map(|s| s.session_id),
            self.host.states().len(),
        )
    }

    /// Snapshot of the settled client.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::single(SessionSnapshot::capture("client", &self.client))
    }

    /// Violations seen so far, mid-flight ones included. Drains the
    /// mid-flight buffer.
    pub fn check(&self) -> Result<(), Vec<Violation>> {
        let mut violations = std::mem::take(&mut *self.violations.borrow_mut());
        if let Some(registry) = &self.invariants {
            if let Err(found) = registry.check_all(&self.snapshot()) {
                violations.extend(found);
            }
        }
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Panic with context if any invariant failed.
    #[allow(clippy::panic)]
    pub fn check_invariants(&self, context: &str) {
        if let Err(violations) = self.check() {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }
}
