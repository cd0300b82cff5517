//! Selectors and their shared projection caches.

use std::{any::Any, cell::RefCell, rc::Rc};

/// A projection of store state.
///
/// Identity matters: clones of one `Selector` share a cache inside the store,
/// while two selectors built from identical closures do not.
pub struct Selector<S, T> {
    project: Rc<dyn Fn(&S) -> T>,
}

impl<S, T> Clone for Selector<S, T> {
    fn clone(&self) -> Self {
        Self { project: Rc::clone(&self.project) }
    }
}

impl<S, T> Selector<S, T> {
    /// Wrap a pure projection function.
    pub fn new(project: impl Fn(&S) -> T + 'static) -> Self {
        Self { project: Rc::new(project) }
    }

    /// Apply the projection.
    pub fn project(&self, state: &S) -> T {
        (self.project)(state)
    }

    pub(super) fn key(&self) -> usize {
        Rc::as_ptr(&self.project).cast::<()>().addr()
    }
}

impl<S, T> std::fmt::Debug for Selector<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").field("key", &self.key()).finish()
    }
}

/// Type-erased view of a [`SharedSelection`] so one store can hold
/// projections of different types.
pub(super) trait SelectorGroup<S> {
    fn key(&self) -> usize;

    /// Re-project and notify listeners if the value changed.
    fn refresh(&self, state: &S);

    /// Drop listener `id`. Returns true when no listeners remain.
    fn remove(&self, id: u64) -> bool;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

type SelectionListener<T> = Rc<dyn Fn(&T)>;

/// One selector's cached value plus everyone listening to it.
pub(super) struct SharedSelection<S, T> {
    selector: Selector<S, T>,
    cached: RefCell<T>,
    listeners: RefCell<Vec<(u64, SelectionListener<T>)>>,
}

impl<S, T> SharedSelection<S, T> {
    pub(super) fn new(selector: Selector<S, T>, state: &S) -> Self {
        let cached = RefCell::new(selector.project(state));
        Self { selector, cached, listeners: RefCell::new(Vec::new()) }
    }

    pub(super) fn add(&self, id: u64, listener: SelectionListener<T>) {
        self.listeners.borrow_mut().push((id, listener));
    }
}

impl<S: 'static, T: Clone + PartialEq + 'static> SelectorGroup<S> for SharedSelection<S, T> {
    fn key(&self) -> usize {
        self.selector.key()
    }

    fn refresh(&self, state: &S) {
        let next = self.selector.project(state);
        if *self.cached.borrow() == next {
            return;
        }
        self.cached.replace(next.clone());

        let ids: Vec<u64> = self.listeners.borrow().iter().map(|(id, _)| *id).collect();
        for id in ids {
            let listener =
                self.listeners.borrow().iter().find(|(i, _)| *i == id).map(|(_, l)| Rc::clone(l));
            if let Some(listener) = listener {
                listener(&next);
            }
        }
    }

    fn remove(&self, id: u64) -> bool {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.iter().position(|(i, _)| *i == id).map(|pos| listeners.remove(pos))
        };
        drop(removed);
        self.listeners.borrow().is_empty()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
