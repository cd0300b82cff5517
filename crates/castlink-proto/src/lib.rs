//! Castlink wire protocol.
//!
//! Typed message shapes shared by the web game and the host app that owns the
//! web view. Every message travels as JSON text of the form
//! `{"type": "...", "payload": {...}, "requestId": "..."}`.
//!
//! # Components
//!
//! - [`MessageKind`]: closed set of message discriminants, one per domain event
//! - [`Message`]: typed payload for every kind
//! - [`Envelope`]: a message plus its optional correlation id
//! - [`validate`]: accept/reject check for untrusted inbound values
//!
//! # Invariants
//!
//! Each [`Message`] variant maps to exactly one [`MessageKind`] (enforced by
//! match exhaustiveness). Response kinds are only valid with a
//! [`RequestId`] attached.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod errors;
mod kind;
pub mod payloads;
mod request_id;
mod validate;

pub use envelope::{Envelope, Message};
pub use errors::{ProtocolError, Result};
pub use kind::{Direction, MessageKind};
pub use payloads::{CastDevice, CastError, SessionStatus};
pub use request_id::RequestId;
pub use validate::{validate, validate_str};
