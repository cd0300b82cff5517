//! Deterministic simulation harness for Castlink.
//!
//! [`SimEnv`] provides a seeded RNG and tokio's (pausable) clock, and
//! [`SimHost`] plays a scriptable native host on a
//! [`LocalChannel`](castlink_client::LocalChannel). Together they make every
//! session flow reproducible, timeouts included.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the session
//! controller. [`SimDriver`] applies the same operations to a real client,
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold across all
//! execution paths. Use [`InvariantRegistry::standard()`] for the common
//! cast state invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_driver;
pub mod sim_env;
pub mod sim_host;

pub use invariants::{
    CastingImpliesSession, ConnectedDeviceIsSession, ConnectingExcludesCasting, Invariant,
    InvariantRegistry, InvariantResult, SessionSnapshot, SettledWithoutPending, SystemSnapshot,
    Violation,
};
pub use model::{
    DeviceSlot, ModelClient, ModelHost, ModelWorld, ObservableState, Operation, OperationResult,
    RequestSlot,
};
pub use sim_driver::{SIM_GAME_ID, SimDriver};
pub use sim_env::SimEnv;
pub use sim_host::{HostScript, HostSession, SimHost, sim_devices};
