//! Channel primitive between the web view and its host.
//!
//! The host channel is a dumb text pipe: posting is fire-and-forget, and
//! inbound text is broadcast to every registered listener. It carries
//! unrelated traffic too, so listeners must expect foreign messages.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

/// Registration handle returned by [`HostChannel::add_listener`].
pub type ListenerId = u64;

/// Callback receiving raw inbound text.
pub type ChannelListener = Rc<dyn Fn(&str)>;

/// Message channel exposed by the host web view.
pub trait HostChannel: 'static {
    /// Post text to the host. Never blocks and never reports delivery.
    fn post_message(&self, text: String);

    /// Register a listener for inbound text.
    fn add_listener(&self, listener: ChannelListener) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

/// In-process channel used by tests, simulations and the demo.
///
/// Posts go to an attached host handler (synchronously) and are also kept in
/// an outbox for inspection. [`LocalChannel::deliver`] plays the host side,
/// broadcasting text to every listener. Clones share the same channel.
#[derive(Clone, Default)]
pub struct LocalChannel {
    inner: Rc<LocalInner>,
}

#[derive(Default)]
struct LocalInner {
    listeners: RefCell<Vec<(ListenerId, ChannelListener)>>,
    host: RefCell<Option<ChannelListener>>,
    outbox: RefCell<Vec<String>>,
    next_id: Cell<ListenerId>,
}

impl LocalChannel {
    /// Create a channel with no host attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route posted text to `host`. Replaces any previous host.
    pub fn attach_host(&self, host: impl Fn(&str) + 'static) {
        *self.inner.host.borrow_mut() = Some(Rc::new(host));
    }

    /// Stop routing posts to the host. Posts still land in the outbox.
    pub fn detach_host(&self) {
        self.inner.host.borrow_mut().take();
    }

    /// Broadcast host-to-web text to every listener.
    pub fn deliver(&self, text: &str) {
        let listeners: Vec<_> =
            self.inner.listeners.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in listeners {
            listener(text);
        }
    }

    /// Drain everything posted so far.
    pub fn take_outbox(&self) -> Vec<String> {
        std::mem::take(&mut *self.inner.outbox.borrow_mut())
    }

    /// Number of posts waiting in the outbox.
    pub fn outbox_len(&self) -> usize {
        self.inner.outbox.borrow().len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl HostChannel for LocalChannel {
    fn post_message(&self, text: String) {
        let host = self.inner.host.borrow().clone();
        self.inner.outbox.borrow_mut().push(text.clone());
        if let Some(host) = host {
            host(&text);
        }
    }

    fn add_listener(&self, listener: ChannelListener) -> ListenerId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners.iter().position(|(i, _)| *i == id).map(|pos| listeners.remove(pos))
        };
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliver_broadcasts_to_all_listeners() {
        let channel = LocalChannel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = Rc::clone(&seen);
        channel.add_listener(Rc::new(move |t: &str| a.borrow_mut().push(format!("a:{t}"))));
        let b = Rc::clone(&seen);
        let id = channel.add_listener(Rc::new(move |t: &str| b.borrow_mut().push(format!("b:{t}"))));

        channel.deliver("x");
        channel.remove_listener(id);
        channel.remove_listener(id);
        channel.deliver("y");

        assert_eq!(*seen.borrow(), vec!["a:x", "b:x", "a:y"]);
    }

    #[test]
    fn posts_reach_host_and_outbox() {
        let channel = LocalChannel::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        channel.attach_host(move |t| sink.borrow_mut().push(t.to_owned()));

        channel.post_message("hello".into());

        assert_eq!(*received.borrow(), vec!["hello"]);
        assert_eq!(channel.take_outbox(), vec!["hello"]);
        assert_eq!(channel.outbox_len(), 0);
    }
}
