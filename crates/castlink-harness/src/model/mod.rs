//! Reference model for model-based testing.
//!
//! [`ModelWorld`] is a plain state machine describing what a session
//! controller talking to a scripted host should end up with. Property tests
//! apply the same [`Operation`]s to the model and to a real client driven by
//! [`SimDriver`](crate::SimDriver), then compare [`ObservableState`]s.

mod client;
mod host;
mod operation;
mod world;

pub use client::{ModelClient, ObservableState};
pub use host::{ModelAck, ModelEvent, ModelHost, ModelRequest};
pub use operation::{
    DeviceSlot, HOST_FAILURE, Operation, OperationResult, RequestSlot, device_id, device_list,
    garbage,
};
pub use world::ModelWorld;
