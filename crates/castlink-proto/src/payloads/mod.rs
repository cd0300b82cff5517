//! JSON payload types.
//!
//! Payload keys are camelCase on the wire. Optional keys accept both absence
//! and `null`. Unknown keys are ignored so that a newer host can add fields
//! without breaking older games.

pub mod device;
pub mod request;
pub mod session;

pub use device::{CastDevice, DevicesUpdatedPayload};
pub use request::{
    AckPayload, ReadyPayload, ReadyResponsePayload, StartSessionPayload, StateUpdatePayload,
};
pub use serde_json::{Map, Value};
pub use session::{CastError, SessionStatus, SessionUpdatedPayload};
