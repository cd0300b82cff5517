//! Castlink client.
//!
//! The web side of the casting hand-off: a [`Bridge`] that speaks the wire
//! protocol over a [`HostChannel`], and a [`CastClient`] session controller
//! that turns user actions into requests and host events into
//! [`CastState`](castlink_core::CastState) updates.
//!
//! # Architecture
//!
//! ```text
//! CastClient ──requests──▶ Bridge ──text──▶ HostChannel ──▶ host app
//!     ▲                      │
//!     └──────events──────────┘◀──text── HostChannel ◀── host app
//! ```
//!
//! The client is the only writer of the state store. The bridge owns the
//! pending request table and never touches state.
//!
//! # Threading
//!
//! Single-threaded. Futures returned here are `!Send` and run on a
//! current-thread tokio runtime or inside a `LocalSet`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bridge;
mod channel;
mod client;
mod config;
mod debug_log;
mod error;
mod system_env;

pub use bridge::{Bridge, BridgeActivity, DEFAULT_REQUEST_TIMEOUT};
pub use channel::{ChannelListener, HostChannel, ListenerId, LocalChannel};
pub use client::{CastClient, StartOptions};
pub use config::ClientConfig;
pub use debug_log::{DebugLog, DebugLogEntry, LogKind};
pub use error::{BridgeError, ClientError};
pub use system_env::SystemEnv;
