//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! client, talking to the scripted host, behaves exactly like the reference
//! model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld      SimDriver       Compare
//!      (reference)   (paused clock)    Results
//! ```

use castlink_harness::{
    InvariantRegistry, ModelWorld, Operation, RequestSlot, SimDriver, model::DeviceSlot,
};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
}

fn request_strategy() -> impl Strategy<Value = RequestSlot> {
    prop_oneof![
        Just(RequestSlot::Ready),
        Just(RequestSlot::Scan),
        Just(RequestSlot::Start),
        Just(RequestSlot::Stop),
        Just(RequestSlot::StateUpdate),
    ]
}

/// Weighted towards game calls; host misbehaviour is rarer but always present.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    let device = any::<DeviceSlot>();

    prop_oneof![
        3 => Just(Operation::Ready),
        3 => Just(Operation::Scan),
        6 => device.clone().prop_map(|device| Operation::Start { device }),
        4 => Just(Operation::Stop),
        2 => device.prop_map(|device| Operation::StartThenStop { device }),
        3 => any::<u8>().prop_map(|turn| Operation::PushState { turn }),
        1 => Just(Operation::ResetError),
        1 => any::<u8>().prop_map(|count| Operation::HostDevices { count }),
        1 => Just(Operation::HostTerminate),
        1 => Just(Operation::HostSessionError),
        1 => Just(Operation::HostError),
        1 => any::<u8>().prop_map(|variant| Operation::Garbage { variant }),
        2 => any::<bool>().prop_map(|enabled| Operation::Withhold { enabled }),
        2 => Just(Operation::Release),
        1 => any::<bool>().prop_map(|enabled| Operation::DropEvents { enabled }),
        1 => any::<bool>().prop_map(|enabled| Operation::EventsBeforeAck { enabled }),
        2 => (request_strategy(), any::<bool>())
            .prop_map(|(request, enabled)| Operation::Decline { request, enabled }),
    ]
}

/// Apply `ops` to both worlds, returning the first divergence.
fn run(seed: u64, ops: &[Operation]) -> Result<(), String> {
    runtime().block_on(async {
        let driver = SimDriver::new(seed).with_invariants(InvariantRegistry::standard());
        let mut model = ModelWorld::new();

        for (step, op) in ops.iter().enumerate() {
            let real = driver.apply(op).await;
            let expected = model.apply(op);
            if real != expected {
                return Err(format!("step {step} {op:?}: result {real:?}, model {expected:?}"));
            }

            let (real_state, model_state) = (driver.observable(), model.observable());
            if real_state != model_state {
                return Err(format!(
                    "step {step} {op:?}: state diverged\n  real:  {real_state:?}\n  model: {model_state:?}"
                ));
            }

            if let Err(violations) = driver.check() {
                return Err(format!("step {step} {op:?}: {violations:?}"));
            }
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Real client and model agree after every operation.
    #[test]
    fn prop_real_client_matches_model(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..40),
    ) {
        prop_assert_eq!(run(seed, &ops), Ok(()));
    }
}

#[test]
fn withheld_start_then_stop_refuses_the_late_session() {
    let ops = [
        Operation::Ready,
        Operation::Withhold { enabled: true },
        Operation::StartThenStop { device: 1 },
        Operation::Withhold { enabled: false },
        Operation::Release,
        Operation::Start { device: 0 },
    ];
    assert_eq!(run(7, &ops), Ok(()));
}

#[test]
fn stale_events_after_retry_are_replayed_in_order() {
    let ops = [
        Operation::Withhold { enabled: true },
        Operation::Start { device: 0 },
        Operation::Start { device: 0 },
        Operation::Release,
        Operation::PushState { turn: 4 },
        Operation::HostTerminate,
        Operation::PushState { turn: 5 },
    ];
    assert_eq!(run(11, &ops), Ok(()));
}

#[test]
fn declines_and_dropped_events_agree() {
    let ops = [
        Operation::Decline { request: RequestSlot::Ready, enabled: true },
        Operation::Ready,
        Operation::Decline { request: RequestSlot::Ready, enabled: false },
        Operation::Ready,
        Operation::DropEvents { enabled: true },
        Operation::Start { device: 2 },
        Operation::Stop,
        Operation::DropEvents { enabled: false },
        Operation::Start { device: 3 },
        Operation::Decline { request: RequestSlot::Stop, enabled: true },
        Operation::Start { device: 2 },
        Operation::Stop,
        Operation::ResetError,
    ];
    assert_eq!(run(3, &ops), Ok(()));
}
