//! Castlink core.
//!
//! Runtime-agnostic building blocks shared by the real client, the mock
//! client and the simulation harness.
//!
//! # Components
//!
//! - [`env::Environment`]: time, randomness and sleeping, swappable for
//!   deterministic simulation
//! - [`RequestIdGenerator`]: session-unique correlation ids
//! - [`Store`]: observable single-snapshot store with selector subscriptions
//! - [`CastState`]: the casting session aggregate and its [`CastStatePatch`]
//!
//! # Execution model
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Updates and listener
//! notifications run to completion before any other task resumes, which is
//! what makes lock-free shared state sound.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod request_id;
mod state;
mod store;
mod subscription;

pub use castlink_proto::{CastDevice, CastError, RequestId};
pub use request_id::RequestIdGenerator;
pub use state::{CastState, CastStatePatch, SessionPhase};
pub use store::{Mergeable, Selector, Store};
pub use subscription::Subscription;
