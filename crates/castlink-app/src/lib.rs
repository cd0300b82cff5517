//! Application layer for Castlink.
//!
//! Everything a UI needs to drive casting without knowing whether a real host
//! is present.
//!
//! # Components
//!
//! - [`CastApi`]: the facade contract, implemented by the real
//!   [`CastClient`](castlink_client::CastClient) and by [`MockCastClient`]
//! - [`CastContext`]: explicit provider handed to UI consumers
//! - [`StateHandle`] / [`SelectorHandle`]: hook-style live views of state
//! - [`detect`]: host web view detection and backend choice

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod context;
pub mod detect;
mod hooks;
mod mock;

pub use api::CastApi;
pub use context::CastContext;
pub use detect::{Backend, is_host_web_view};
pub use hooks::{SelectorHandle, StateHandle};
pub use mock::{DEVICE_NOT_FOUND, MockCastClient, MockConfig};
