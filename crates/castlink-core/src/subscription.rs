//! Listener registration handle.

use std::{cell::Cell, fmt};

/// Handle for a registered listener.
///
/// Dropping the handle unsubscribes. [`Subscription::unsubscribe`] does the
/// same eagerly and may be called any number of times.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Cell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    /// Wrap a cancellation action. It runs at most once.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Cell::new(Some(Box::new(cancel))) }
    }

    /// A handle with nothing to cancel.
    pub fn empty() -> Self {
        Self { cancel: Cell::new(None) }
    }

    /// Remove the listener. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the listener is still registered through this handle.
    pub fn is_active(&self) -> bool {
        let cancel = self.cancel.take();
        let active = cancel.is_some();
        self.cancel.set(cancel);
        active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn cancel_runs_once() {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let subscription = Subscription::new(move || counter.set(counter.get() + 1));

        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        drop(subscription);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_cancels() {
        let cancelled = Rc::new(Cell::new(false));
        let flag = Rc::clone(&cancelled);
        drop(Subscription::new(move || flag.set(true)));
        assert!(cancelled.get());
    }
}
