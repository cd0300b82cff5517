//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties of the cast state that must hold after every
//! operation, whatever the host does. Example-based tests pin down single
//! scenarios; invariants are checked across random operation sequences.
//!
//! # Architecture
//!
//! Observable state from one or more clients is captured into a
//! [`SystemSnapshot`], then every registered [`Invariant`] runs against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = SystemSnapshot::single(SessionSnapshot::capture("client", &client));
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    CastingImpliesSession, ConnectedDeviceIsSession, ConnectingExcludesCasting,
    SettledWithoutPending,
};
pub use snapshot::{SessionSnapshot, SystemSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against captured state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard cast state invariants.
    ///
    /// Includes:
    /// - [`CastingImpliesSession`]: casting needs a session and a device
    /// - [`ConnectingExcludesCasting`]: never connecting while casting
    /// - [`ConnectedDeviceIsSession`]: only the session device is connected
    /// - [`SettledWithoutPending`]: settled clients have no open requests
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(CastingImpliesSession);
        registry.add(ConnectingExcludesCasting);
        registry.add(ConnectedDeviceIsSession);
        registry.add(SettledWithoutPending);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use castlink_core::CastState;

    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&SystemSnapshot::empty()).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let state = CastState { is_casting: true, is_connecting: true, ..CastState::default() };
        let snapshot = SystemSnapshot::single(SessionSnapshot::new("broken", state));

        let violations = InvariantRegistry::standard().check_all(&snapshot).expect_err("violations");
        let names: Vec<_> = violations.iter().map(|v| v.invariant).collect();
        assert_eq!(names, vec!["casting_implies_session", "connecting_excludes_casting"]);
    }

    #[test]
    #[should_panic(expected = "Invariant violation after start")]
    fn assert_all_panics_with_context() {
        let state = CastState { is_casting: true, ..CastState::default() };
        let snapshot = SystemSnapshot::single(SessionSnapshot::new("broken", state));
        InvariantRegistry::standard().assert_all(&snapshot, "after start");
    }
}
