//! Explicit provider for UI consumers.
//!
//! There is no process-wide default client. The application builds one
//! [`CastContext`] at startup and passes clones to whatever needs casting.

use std::rc::Rc;

use castlink_core::{CastState, Selector};

use crate::{CastApi, SelectorHandle, StateHandle};

/// Shared handle to a [`CastApi`] implementation.
pub struct CastContext<A: CastApi> {
    api: Rc<A>,
}

impl<A: CastApi> Clone for CastContext<A> {
    fn clone(&self) -> Self {
        Self { api: Rc::clone(&self.api) }
    }
}

impl<A: CastApi> CastContext<A> {
    /// Provide `api` to consumers.
    pub fn provide(api: A) -> Self {
        Self { api: Rc::new(api) }
    }

    /// The provided implementation.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Live view of the whole state.
    pub fn use_cast_state(&self) -> StateHandle {
        StateHandle::new(self.api.as_ref())
    }

    /// Live view of one projection.
    pub fn use_selector<T>(&self, selector: &Selector<CastState, T>) -> SelectorHandle<T>
    where
        T: Clone + PartialEq + 'static,
    {
        SelectorHandle::new(self.api.as_ref(), selector)
    }
}
