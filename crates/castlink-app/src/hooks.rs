//! Hook-style live views.
//!
//! A handle starts with the current value, stays current while alive and
//! unsubscribes when dropped. The change counter lets a render loop decide
//! whether to redraw.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use castlink_core::{CastState, Selector, Subscription};

use crate::CastApi;

/// Live copy of the whole [`CastState`].
pub struct StateHandle {
    current: Rc<RefCell<CastState>>,
    changes: Rc<Cell<u64>>,
    _subscription: Subscription,
}

impl StateHandle {
    /// Snapshot `api` now and follow every update.
    pub fn new<A: CastApi>(api: &A) -> Self {
        let current = Rc::new(RefCell::new(api.state()));
        let changes = Rc::new(Cell::new(0));

        let slot = Rc::clone(&current);
        let counter = Rc::clone(&changes);
        let subscription = api.subscribe(move |state| {
            *slot.borrow_mut() = state.clone();
            counter.set(counter.get() + 1);
        });

        Self { current, changes, _subscription: subscription }
    }

    /// Latest state.
    pub fn get(&self) -> CastState {
        self.current.borrow().clone()
    }

    /// Updates observed since creation.
    pub fn changes(&self) -> u64 {
        self.changes.get()
    }
}

/// Live copy of one projection of [`CastState`].
pub struct SelectorHandle<T> {
    current: Rc<RefCell<T>>,
    changes: Rc<Cell<u64>>,
    _subscription: Subscription,
}

impl<T: Clone + PartialEq + 'static> SelectorHandle<T> {
    /// Project `api`'s state now and follow changes of the projection.
    pub fn new<A: CastApi>(api: &A, selector: &Selector<CastState, T>) -> Self {
        let current = Rc::new(RefCell::new(selector.project(&api.state())));
        let changes = Rc::new(Cell::new(0));

        let slot = Rc::clone(&current);
        let counter = Rc::clone(&changes);
        let subscription = api.select(selector, move |value: &T| {
            *slot.borrow_mut() = value.clone();
            counter.set(counter.get() + 1);
        });

        Self { current, changes, _subscription: subscription }
    }

    /// Latest projected value.
    pub fn get(&self) -> T {
        self.current.borrow().clone()
    }

    /// Projection changes observed since creation.
    pub fn changes(&self) -> u64 {
        self.changes.get()
    }
}
