//! Observable single-snapshot store.
//!
//! A [`Store`] owns one value of a [`Mergeable`] state type. Writers hand it
//! partial patches; listeners receive the full merged snapshot. Selector
//! listeners receive a projection and only fire when that projection changes.
//!
//! # Invariants
//!
//! - A patch is merged completely before any listener runs, so listeners
//!   never observe a half-applied update.
//! - Updates requested while listeners are running are queued and applied in
//!   request order once the current notification round finishes.
//! - A selector listener fires only when its projected value differs
//!   (`PartialEq`) from the last value observed for that selector.
//! - Listeners of the same [`Selector`] share one cached projection. The
//!   cache is discarded when the last of them unsubscribes.
//! - No `RefCell` borrow is held while user code (updaters, selectors,
//!   listeners) runs.

mod selector;

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::{Rc, Weak},
};

pub use selector::Selector;
use selector::{SelectorGroup, SharedSelection};
use tracing::trace;

use crate::Subscription;

/// State that can absorb a partial update.
pub trait Mergeable: Clone + 'static {
    /// Partial update. Fields left unset keep their current value.
    type Patch: 'static;

    /// Merge `patch` into `self`.
    fn merge(&mut self, patch: Self::Patch);
}

type Updater<S> = Box<dyn FnOnce(&S) -> <S as Mergeable>::Patch>;
type Listener<S> = Rc<dyn Fn(&S)>;

/// Observable store. Cloning yields another handle to the same state.
pub struct Store<S: Mergeable> {
    inner: Rc<Inner<S>>,
}

struct Inner<S: Mergeable> {
    state: RefCell<S>,
    listeners: RefCell<Vec<(u64, Listener<S>)>>,
    selections: RefCell<Vec<Rc<dyn SelectorGroup<S>>>>,
    pending: RefCell<VecDeque<Updater<S>>>,
    dispatching: Cell<bool>,
    next_listener: Cell<u64>,
}

/// Clears the dispatch flag even if a listener panics.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: Mergeable> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<S: Mergeable + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Mergeable> Store<S> {
    /// Create a store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(initial),
                listeners: RefCell::new(Vec::new()),
                selections: RefCell::new(Vec::new()),
                pending: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Current snapshot.
    pub fn get_state(&self) -> S {
        self.inner.state.borrow().clone()
    }

    /// Merge `patch` and notify listeners.
    pub fn set_state(&self, patch: S::Patch) {
        self.update(move |_| patch);
    }

    /// Compute a patch from the current snapshot, merge it and notify.
    ///
    /// `updater` sees the state as of the moment the update is applied, which
    /// for an update queued during notification is after every update queued
    /// before it.
    pub fn update(&self, updater: impl FnOnce(&S) -> S::Patch + 'static) {
        self.inner.pending.borrow_mut().push_back(Box::new(updater));

        if self.inner.dispatching.get() {
            trace!("store update queued behind running notification");
            return;
        }

        self.inner.dispatching.set(true);
        let _guard = DispatchGuard(&self.inner.dispatching);
        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            let Some(updater) = next else {
                break;
            };
            self.apply(updater);
        }
    }

    /// Register a listener for every applied update.
    pub fn subscribe(&self, listener: impl Fn(&S) + 'static) -> Subscription {
        let id = self.next_listener_id();
        self.inner.listeners.borrow_mut().push((id, Rc::new(listener)));

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let removed = {
                    let mut listeners = inner.listeners.borrow_mut();
                    listeners.iter().position(|(i, _)| *i == id).map(|pos| listeners.remove(pos))
                };
                drop(removed);
            }
        })
    }

    /// Register a listener for changes of `selector`'s projection.
    ///
    /// The listener is not called with the initial value; read it with
    /// [`Store::select_now`].
    pub fn select<T>(
        &self,
        selector: &Selector<S, T>,
        listener: impl Fn(&T) + 'static,
    ) -> Subscription
    where
        T: Clone + PartialEq + 'static,
    {
        let id = self.next_listener_id();
        let selection = self.selection_for(selector);
        selection.add(id, Rc::new(listener));

        let key = selector.key();
        let weak: Weak<Inner<S>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                Self::remove_selection_listener(&inner, key, id);
            }
        })
    }

    /// Evaluate `selector` against the current snapshot.
    pub fn select_now<T>(&self, selector: &Selector<S, T>) -> T {
        let state = self.get_state();
        selector.project(&state)
    }

    /// Number of whole-state listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Number of live selector caches.
    pub fn selector_cache_len(&self) -> usize {
        self.inner.selections.borrow().len()
    }

    fn next_listener_id(&self) -> u64 {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        id
    }

    fn apply(&self, updater: Updater<S>) {
        let current = self.get_state();
        let patch = updater(&current);
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            state.merge(patch);
            state.clone()
        };

        let ids: Vec<u64> = self.inner.listeners.borrow().iter().map(|(id, _)| *id).collect();
        for id in ids {
            // Skip listeners removed earlier in this round
            let listener = self
                .inner
                .listeners
                .borrow()
                .iter()
                .find(|(i, _)| *i == id)
                .map(|(_, l)| Rc::clone(l));
            if let Some(listener) = listener {
                listener(&snapshot);
            }
        }

        let selections: Vec<_> = self.inner.selections.borrow().iter().map(Rc::clone).collect();
        for selection in selections {
            selection.refresh(&snapshot);
        }
    }

    fn selection_for<T>(&self, selector: &Selector<S, T>) -> Rc<SharedSelection<S, T>>
    where
        T: Clone + PartialEq + 'static,
    {
        let key = selector.key();
        let existing =
            self.inner.selections.borrow().iter().find(|s| s.key() == key).map(Rc::clone);

        // Key equality implies the same closure, hence the same T
        if let Some(Ok(selection)) =
            existing.map(|s| s.into_any().downcast::<SharedSelection<S, T>>())
        {
            return selection;
        }

        let current = self.get_state();
        let selection = Rc::new(SharedSelection::new(selector.clone(), &current));
        self.inner.selections.borrow_mut().push(Rc::clone(&selection) as Rc<dyn SelectorGroup<S>>);
        trace!(caches = self.selector_cache_len(), "selector cache created");
        selection
    }

    fn remove_selection_listener(inner: &Inner<S>, key: usize, id: u64) {
        let removed = {
            let mut selections = inner.selections.borrow_mut();
            match selections.iter().position(|s| s.key() == key) {
                Some(pos) if selections[pos].remove(id) => Some(selections.remove(pos)),
                _ => None,
            }
        };
        if removed.is_some() {
            trace!("selector cache discarded");
        }
        drop(removed);
    }
}
