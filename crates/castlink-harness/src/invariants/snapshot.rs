//! Observable state snapshots for invariant checking.
//!
//! Invariants run against snapshots rather than live clients so a check sees
//! one consistent state even if listeners fire while it runs.

use castlink_app::CastApi;
use castlink_client::{CastClient, HostChannel};
use castlink_core::{CastState, env::Environment};

/// Snapshot of every client in a simulation.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client snapshots.
    pub sessions: Vec<SessionSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(session: SessionSnapshot) -> Self {
        Self { sessions: vec![session] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_sessions(sessions: Vec<SessionSnapshot>) -> Self {
        Self { sessions }
    }

    /// Add a client snapshot.
    pub fn add_session(&mut self, session: SessionSnapshot) {
        self.sessions.push(session);
    }
}

/// Snapshot of one client's observable state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Name used in violation messages.
    pub label: String,
    /// Cast state at capture time.
    pub state: CastState,
    /// Requests still waiting for the host.
    pub pending_requests: usize,
    /// `false` while an operation is mid-flight.
    pub settled: bool,
}

impl SessionSnapshot {
    /// Settled snapshot of `state` with nothing pending.
    pub fn new(label: impl Into<String>, state: CastState) -> Self {
        Self { label: label.into(), state, pending_requests: 0, settled: true }
    }

    /// Capture a real client between operations.
    pub fn capture<C: HostChannel, E: Environment>(
        label: impl Into<String>,
        client: &CastClient<C, E>,
    ) -> Self {
        Self {
            label: label.into(),
            state: client.state(),
            pending_requests: client.bridge().pending_count(),
            settled: true,
        }
    }

    /// Capture any [`CastApi`] implementation between operations.
    pub fn from_api<A: CastApi>(label: impl Into<String>, api: &A) -> Self {
        Self::new(label, api.state())
    }

    /// Mark the snapshot as taken mid-operation.
    #[must_use]
    pub fn unsettled(mut self) -> Self {
        self.settled = false;
        self
    }

    /// Override the pending request count.
    #[must_use]
    pub fn with_pending(mut self, pending_requests: usize) -> Self {
        self.pending_requests = pending_requests;
        self
    }
}
