// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Typed publish/subscribe bus connecting the data layer, the link state and
//! the UI. The bus is constructed once and handed to each party, so neither
//! side needs a compile-time reference to the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::crypto::Fingerprint;
use crate::link::LinkSnapshot;

/// Events carried by the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The data layer saw a record this device cannot decrypt.
    EncryptedDataDetected,

    /// The active key was replaced or removed. Read caches must invalidate.
    KeyChanged {
        /// Fingerprint of the new key, `None` after a wipe.
        fingerprint: Option<Fingerprint>,
    },

    /// The link state snapshot changed.
    LinkStateChanged(LinkSnapshot),
}

/// Event kinds, for subscribing to a subset of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEventKind {
    EncryptedDataDetected,
    KeyChanged,
    LinkStateChanged,
}

impl LinkEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> LinkEventKind {
        match self {
            LinkEvent::EncryptedDataDetected => LinkEventKind::EncryptedDataDetected,
            LinkEvent::KeyChanged { .. } => LinkEventKind::KeyChanged,
            LinkEvent::LinkStateChanged(_) => LinkEventKind::LinkStateChanged,
        }
    }
}

/// Event handler trait.
///
/// Implement this trait to receive link events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: LinkEvent);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F>
where
    F: Fn(LinkEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(LinkEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(LinkEvent) + Send + Sync,
{
    fn on_event(&self, event: LinkEvent) {
        (self.callback)(event);
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: Option<LinkEventKind>,
    handler: Arc<dyn EventHandler>,
}

/// Event bus with any number of subscribers per event kind.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, kind: Option<LinkEventKind>, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription { id, kind, handler });
        id
    }

    /// Subscribes a handler to one event kind.
    pub fn subscribe(&self, kind: LinkEventKind, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.insert(Some(kind), handler)
    }

    /// Subscribes a handler to every event.
    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.insert(None, handler)
    }

    /// Subscribes a closure to one event kind.
    pub fn on<F>(&self, kind: LinkEventKind, callback: F) -> SubscriptionId
    where
        F: Fn(LinkEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(CallbackHandler::new(callback)))
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Returns the number of subscriptions that would receive `kind`.
    pub fn handler_count(&self, kind: LinkEventKind) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .count()
    }

    /// Delivers an event to every matching subscriber, in subscription order.
    ///
    /// Emitting with no subscribers is a no-op. Handlers run without the
    /// registry lock held, so they may emit or subscribe themselves.
    pub fn emit(&self, event: LinkEvent) {
        let kind = event.kind();
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .map(|s| s.handler.clone())
            .collect();

        tracing::trace!(?kind, handlers = handlers.len(), "emitting link event");

        for handler in handlers {
            handler.on_event(event.clone());
        }
    }
}
