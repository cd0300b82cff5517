//! Fuzz target for the session controller against its reference model
//!
//! # Strategy
//!
//! - Arbitrary `Operation` sequences: game calls mixed with host
//!   misbehaviour (withheld replies, dropped events, declines, garbage)
//! - Each sequence runs on a paused clock so timeouts cost nothing
//!
//! # Invariants
//!
//! - Real client and model return the same result for every operation
//! - Observable state matches the model after every operation
//! - Standard cast state invariants hold, mid-flight included

#![no_main]

use castlink_harness::{InvariantRegistry, ModelWorld, Operation, SimDriver};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u64, Vec<Operation>)| {
    let (seed, ops) = input;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let driver = SimDriver::new(seed).with_invariants(InvariantRegistry::standard());
        let mut model = ModelWorld::new();

        for (step, op) in ops.iter().take(64).enumerate() {
            let real = driver.apply(op).await;
            let expected = model.apply(op);
            assert_eq!(real, expected, "step {step} {op:?}");
            assert_eq!(driver.observable(), model.observable(), "step {step} {op:?}");
            driver.check_invariants(&format!("at step {step}"));
        }
    });
});
