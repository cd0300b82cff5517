//! Request/response bridge over the host channel.
//!
//! Wraps a [`HostChannel`] with typed sends, correlation of responses to
//! requests by id, per-request timeouts and dispatch of unsolicited events.
//!
//! # Invariants
//!
//! - At most one pending entry exists per request id, and each pending
//!   request settles exactly once: by its response, its timeout, disposal,
//!   or a later request reusing its id.
//! - A request only ever removes its own pending entry, never one that
//!   superseded it under the same id.
//! - A settled request leaves no entry behind, including when the waiting
//!   future is dropped early.
//! - Inbound text that fails validation reaches no listener.
//! - A message matching a pending request is consumed by that request and
//!   never forwarded to event listeners. Responses matching nothing are
//!   dropped.
//! - After [`Bridge::dispose`], no channel listener, event listener or
//!   pending request remains.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::{Rc, Weak},
    time::Duration,
};

use castlink_core::{RequestIdGenerator, Subscription, env::Environment};
use castlink_proto::{Envelope, Message, MessageKind, ProtocolError, RequestId};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::{
    BridgeError,
    channel::{HostChannel, ListenerId},
};

/// Default wait for a correlated response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type Settle = oneshot::Sender<Result<Message, BridgeError>>;

/// One registered request. `token` tells apart registrations that share an
/// id.
struct Pending {
    token: u64,
    kind: MessageKind,
    settle: Settle,
}

type EventListener = Rc<dyn Fn(&Envelope)>;
type Observer = Rc<dyn Fn(&BridgeActivity<'_>)>;

/// Traffic notifications for diagnostics.
#[derive(Debug)]
pub enum BridgeActivity<'a> {
    /// A message was posted to the host.
    Sent(&'a Envelope),
    /// A message settled a pending request.
    Response(&'a Envelope),
    /// A response arrived for no pending request (late or unknown).
    Unmatched(&'a Envelope),
    /// Inbound text failed validation and was dropped.
    Rejected {
        /// The raw inbound text.
        raw: &'a str,
        /// Why it was rejected.
        error: &'a ProtocolError,
    },
}

/// Typed messaging over a [`HostChannel`].
///
/// Cloning yields another handle to the same bridge.
pub struct Bridge<C: HostChannel, E: Environment> {
    inner: Rc<BridgeInner<C, E>>,
}

struct BridgeInner<C: HostChannel, E: Environment> {
    channel: C,
    ids: RequestIdGenerator<E>,
    pending: RefCell<HashMap<RequestId, Pending>>,
    next_token: Cell<u64>,
    listeners: RefCell<Vec<(u64, EventListener)>>,
    observer: RefCell<Option<Observer>>,
    channel_listener: Cell<Option<ListenerId>>,
    next_listener: Cell<u64>,
    disposed: Cell<bool>,
}

/// Removes a pending entry if the waiting future goes away first.
struct PendingGuard<'a, C: HostChannel, E: Environment> {
    inner: &'a BridgeInner<C, E>,
    request: Option<(RequestId, u64)>,
}

impl<C: HostChannel, E: Environment> PendingGuard<'_, C, E> {
    fn disarm(mut self) -> Option<Pending> {
        let (id, token) = self.request.take()?;
        self.inner.take_pending(&id, token)
    }
}

impl<C: HostChannel, E: Environment> Drop for PendingGuard<'_, C, E> {
    fn drop(&mut self) {
        if let Some((id, token)) = self.request.take() {
            if self.inner.take_pending(&id, token).is_some() {
                trace!(request_id = %id, "pending request abandoned by caller");
            }
        }
    }
}

impl<C: HostChannel, E: Environment> Clone for Bridge<C, E> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<C: HostChannel, E: Environment> Bridge<C, E> {
    /// Wrap `channel` and start listening for inbound text.
    pub fn new(channel: C, env: E) -> Self {
        let inner = Rc::new(BridgeInner {
            channel,
            ids: RequestIdGenerator::new(env),
            pending: RefCell::new(HashMap::new()),
            next_token: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            observer: RefCell::new(None),
            channel_listener: Cell::new(None),
            next_listener: Cell::new(0),
            disposed: Cell::new(false),
        });

        let weak: Weak<BridgeInner<C, E>> = Rc::downgrade(&inner);
        let id = inner.channel.add_listener(Rc::new(move |text: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.receive(text);
            }
        }));
        inner.channel_listener.set(Some(id));

        Self { inner }
    }

    /// Fresh correlation id.
    pub fn next_request_id(&self) -> RequestId {
        self.inner.ids.generate()
    }

    /// Wrap `message` in an envelope with a fresh request id.
    pub fn prepare(&self, message: Message) -> Envelope {
        Envelope::with_request_id(message, self.next_request_id())
    }

    /// Post a message without waiting for anything.
    ///
    /// After disposal the message is dropped.
    ///
    /// # Errors
    ///
    /// - `BridgeError::Encode` if the message fails to serialize
    pub fn send(&self, envelope: &Envelope) -> Result<(), BridgeError> {
        if self.inner.disposed.get() {
            debug!(kind = %envelope.kind(), "send after dispose dropped");
            return Ok(());
        }
        self.inner.post(envelope)
    }

    /// Post a request and wait for the message carrying the same request id.
    ///
    /// Resolves with whatever message settles the request, usually the
    /// matching `*_RESPONSE`. Interpreting acknowledgements is up to the
    /// caller.
    ///
    /// # Errors
    ///
    /// - `BridgeError::MissingRequestId` if `envelope` has no request id
    /// - `BridgeError::Disposed` if the bridge is or becomes disposed
    /// - `BridgeError::Timeout` if nothing arrives within `timeout`
    /// - `BridgeError::Superseded` if a later request reuses the id first
    /// - `BridgeError::Encode` if the message fails to serialize
    pub async fn send_with_response(
        &self,
        envelope: Envelope,
        timeout: Duration,
    ) -> Result<Message, BridgeError> {
        let kind = envelope.kind();
        let request_id =
            envelope.request_id.clone().ok_or(BridgeError::MissingRequestId { kind })?;

        if self.inner.disposed.get() {
            return Err(BridgeError::Disposed);
        }

        let (tx, rx) = oneshot::channel();
        let token = self.inner.next_token.get();
        self.inner.next_token.set(token + 1);
        let previous = self
            .inner
            .pending
            .borrow_mut()
            .insert(request_id.clone(), Pending { token, kind, settle: tx });
        if let Some(previous) = previous {
            warn!(request_id = %request_id, "request id reused, earlier request superseded");
            let superseded =
                BridgeError::Superseded { kind: previous.kind, request_id: request_id.clone() };
            let _ = previous.settle.send(Err(superseded));
        }

        let guard = PendingGuard { inner: &*self.inner, request: Some((request_id.clone(), token)) };

        // Register before posting: a synchronous host may answer inside post
        self.inner.post(&envelope)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_closed)) => Err(BridgeError::Disposed),
            Err(_elapsed) => {
                drop(guard.disarm());
                warn!(kind = %kind, request_id = %request_id, ?timeout, "request timed out");
                Err(BridgeError::Timeout { kind, request_id, after: timeout })
            },
        }
    }

    /// Register a listener for unsolicited inbound messages.
    pub fn add_event_listener(&self, listener: impl Fn(&Envelope) + 'static) -> Subscription {
        if self.inner.disposed.get() {
            return Subscription::empty();
        }

        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
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

    /// Install the diagnostics observer, replacing any previous one.
    pub fn set_observer(&self, observer: impl Fn(&BridgeActivity<'_>) + 'static) {
        *self.inner.observer.borrow_mut() = Some(Rc::new(observer));
    }

    /// Tear down: detach from the channel, drop every listener and fail every
    /// pending request with `BridgeError::Disposed`. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether [`Bridge::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Number of registered event listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl<C: HostChannel, E: Environment> BridgeInner<C, E> {
    fn post(&self, envelope: &Envelope) -> Result<(), BridgeError> {
        let text = envelope.encode().map_err(|e| BridgeError::Encode {
            kind: envelope.kind(),
            reason: e.to_string(),
        })?;

        debug!(
            kind = %envelope.kind(),
            request_id = envelope.request_id.as_ref().map(RequestId::as_str),
            "sending"
        );
        self.observe(&BridgeActivity::Sent(envelope));
        self.channel.post_message(text);
        Ok(())
    }

    /// Remove the entry for `id` if it is still registration `token`.
    fn take_pending(&self, id: &RequestId, token: u64) -> Option<Pending> {
        let mut pending = self.pending.borrow_mut();
        if pending.get(id).is_some_and(|p| p.token == token) { pending.remove(id) } else { None }
    }

    fn receive(&self, text: &str) {
        if self.disposed.get() {
            return;
        }

        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                trace!(%error, "inbound message rejected");
                self.observe(&BridgeActivity::Rejected { raw: text, error: &error });
                return;
            },
        };

        if let Some(id) = &envelope.request_id {
            let pending = self.pending.borrow_mut().remove(id);
            if let Some(Pending { settle, .. }) = pending {
                debug!(kind = %envelope.kind(), request_id = %id, "response received");
                self.observe(&BridgeActivity::Response(&envelope));
                // Receiver gone means the caller stopped waiting
                let _ = settle.send(Ok(envelope.message));
                return;
            }
        }

        if envelope.kind().is_response() {
            warn!(
                kind = %envelope.kind(),
                request_id = envelope.request_id.as_ref().map(RequestId::as_str),
                "response matches no pending request"
            );
            self.observe(&BridgeActivity::Unmatched(&envelope));
            return;
        }

        self.dispatch(&envelope);
    }

    fn dispatch(&self, envelope: &Envelope) {
        debug!(kind = %envelope.kind(), "event received");
        let ids: Vec<u64> = self.listeners.borrow().iter().map(|(id, _)| *id).collect();
        for id in ids {
            let listener =
                self.listeners.borrow().iter().find(|(i, _)| *i == id).map(|(_, l)| Rc::clone(l));
            if let Some(listener) = listener {
                listener(envelope);
            }
        }
    }

    fn observe(&self, activity: &BridgeActivity<'_>) {
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(activity);
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }

        if let Some(id) = self.channel_listener.take() {
            self.channel.remove_listener(id);
        }
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);
        self.observer.borrow_mut().take();

        let pending: Vec<_> = self.pending.borrow_mut().drain().collect();
        debug!(pending = pending.len(), "bridge disposed");
        for (_, Pending { settle, .. }) in pending {
            let _ = settle.send(Err(BridgeError::Disposed));
        }
    }
}

impl<C: HostChannel, E: Environment> Drop for BridgeInner<C, E> {
    fn drop(&mut self) {
        if let Some(id) = self.channel_listener.take() {
            self.channel.remove_listener(id);
        }
    }
}
