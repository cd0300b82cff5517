//! Property-based tests for session behaviour.
//!
//! Tests verify that invariants hold under arbitrary operation sequences,
//! for the real client against the scripted host and for the mock client.

use std::{cell::Cell, rc::Rc, time::Duration};

use castlink_app::{CastApi, MockCastClient, MockConfig};
use castlink_client::StartOptions;
use castlink_core::{CastState, Selector};
use castlink_harness::{
    InvariantRegistry, Operation, SessionSnapshot, SimDriver, SimEnv, SystemSnapshot,
    model::{DeviceSlot, device_id},
    sim_devices,
};
use castlink_proto::payloads::ReadyPayload;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
}

/// Game-side calls only.
fn game_operation() -> impl Strategy<Value = Operation> {
    let device = any::<DeviceSlot>();
    prop_oneof![
        1 => Just(Operation::Ready),
        2 => Just(Operation::Scan),
        4 => device.clone().prop_map(|device| Operation::Start { device }),
        3 => Just(Operation::Stop),
        2 => device.prop_map(|device| Operation::StartThenStop { device }),
        2 => any::<u8>().prop_map(|turn| Operation::PushState { turn }),
        1 => Just(Operation::ResetError),
    ]
}

/// Host misbehaviour mixed with game calls; never touches availability.
fn hostile_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        6 => game_operation().prop_filter("ready changes availability", |op| {
            !matches!(op, Operation::Ready)
        }),
        1 => Just(Operation::HostTerminate),
        1 => Just(Operation::HostSessionError),
        1 => Just(Operation::HostError),
        1 => any::<u8>().prop_map(|variant| Operation::Garbage { variant }),
        1 => any::<bool>().prop_map(|enabled| Operation::Withhold { enabled }),
        1 => Just(Operation::Release),
        1 => any::<bool>().prop_map(|enabled| Operation::DropEvents { enabled }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariants hold after every operation and on every notification.
    #[test]
    fn prop_invariants_hold_under_hostile_host(
        seed in any::<u64>(),
        ops in prop::collection::vec(hostile_operation(), 0..40),
    ) {
        let failure = runtime().block_on(async {
            let driver = SimDriver::new(seed).with_invariants(InvariantRegistry::standard());
            for op in &ops {
                driver.apply(op).await;
                if let Err(violations) = driver.check() {
                    return Some(format!("after {op:?}: {violations:?}"));
                }
            }
            None
        });
        prop_assert!(failure.is_none(), "{}", failure.unwrap_or_default());
    }

    /// Stopping without a session never fails and never touches `error`.
    #[test]
    fn prop_idle_stop_is_silent(
        seed in any::<u64>(),
        ops in prop::collection::vec(hostile_operation(), 0..30),
    ) {
        let outcome = runtime().block_on(async {
            let driver = SimDriver::new(seed);
            let mut checked = 0;
            for op in &ops {
                driver.apply(op).await;

                let before = driver.client().state();
                if before.session_id.is_some() || before.is_connecting {
                    continue;
                }
                let result = driver.client().stop_casting().await;
                let after = driver.client().state();
                if result.is_err() || after != before {
                    return Err(format!("stop after {op:?} changed {before:?} into {after:?}"));
                }
                checked += 1;
            }
            Ok(checked)
        });
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }

    /// A selector over a field no operation touches never fires.
    #[test]
    fn prop_untouched_selector_stays_silent(
        seed in any::<u64>(),
        ops in prop::collection::vec(hostile_operation(), 0..30),
    ) {
        let (fired, whole) = runtime().block_on(async {
            let driver = SimDriver::new(seed);
            let fired = Rc::new(Cell::new(0u32));
            let whole = Rc::new(Cell::new(0u32));

            let counter = Rc::clone(&fired);
            let _available = driver
                .client()
                .select(&Selector::new(|s: &CastState| s.is_available), move |_| {
                    counter.set(counter.get() + 1);
                });
            let counter = Rc::clone(&whole);
            let _all = driver.client().subscribe(move |_| counter.set(counter.get() + 1));

            for op in &ops {
                driver.apply(op).await;
            }
            (fired.get(), whole.get())
        });
        prop_assert_eq!(fired, 0);
        // Whole-state listeners still saw the traffic
        if ops.iter().any(always_notifies) {
            prop_assert!(whole > 0);
        }
    }

    /// The mock client keeps the same invariants as the real one.
    #[test]
    fn prop_mock_invariants_hold(
        seed in any::<u64>(),
        ops in prop::collection::vec(game_operation(), 0..30),
    ) {
        let failure = runtime().block_on(async {
            let mock = MockCastClient::new(
                SimEnv::with_seed(seed),
                MockConfig::default()
                    .with_latency(Duration::from_millis(50))
                    .with_devices(sim_devices()),
            );
            let registry = InvariantRegistry::standard();
            for op in &ops {
                apply_to_api(&mock, op).await;
                let snapshot = SystemSnapshot::single(SessionSnapshot::from_api("mock", &mock));
                if let Err(violations) = registry.check_all(&snapshot) {
                    return Some(format!("after {op:?}: {violations:?}"));
                }
            }
            None
        });
        prop_assert!(failure.is_none(), "{}", failure.unwrap_or_default());
    }
}

/// Operations that update the store whatever the host does.
fn always_notifies(op: &Operation) -> bool {
    matches!(op, Operation::Scan | Operation::ResetError | Operation::HostError)
}

/// Apply a game-side operation through the facade contract.
async fn apply_to_api<A: CastApi>(api: &A, op: &Operation) {
    let _ = match op {
        Operation::Ready => api.signal_ready(ReadyPayload::new("sim-game")).await,
        Operation::Scan => api.scan_for_devices().await,
        Operation::Start { device } => {
            api.start_casting(device_id(*device), StartOptions::default()).await
        },
        Operation::Stop => api.stop_casting().await,
        Operation::StartThenStop { device } => {
            let (start, stop) = tokio::join!(
                api.start_casting(device_id(*device), StartOptions::default()),
                api.stop_casting()
            );
            start.and(stop)
        },
        Operation::PushState { turn } => {
            api.send_state_update(castlink_proto::payloads::Value::from(*turn)).await
        },
        Operation::ResetError => {
            api.reset_error();
            Ok(())
        },
        _ => Ok(()),
    };
}
