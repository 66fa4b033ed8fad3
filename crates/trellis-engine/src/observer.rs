//! Notification pipeline
//!
//! Observers register an interest (element kind + action) and receive a
//! stream of change events. Channels are materialized only when at least one
//! subscriber exists, and each subscriber sees the full sequence from its
//! subscription onward. Delivery happens strictly after a successful commit,
//! and a delivery-side failure never rolls a committed write back.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use trellis_core::model::ElementKind;
use trellis_core::spi::{Action, NotificationPayload, PendingNotification};

/// An observer's declared subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interest {
    pub kind: ElementKind,
    pub action: Action,
}

impl Interest {
    pub fn new(kind: ElementKind, action: Action) -> Self {
        Self { kind, action }
    }

    pub fn matches(&self, notification: &PendingNotification) -> bool {
        self.kind == notification.kind() && self.action == notification.action
    }
}

/// A delivered change event
#[derive(Debug, Clone)]
pub struct InventoryEvent {
    pub at: DateTime<Utc>,
    pub action: Action,
    pub before: Option<NotificationPayload>,
    pub after: Option<NotificationPayload>,
}

/// Consumer end of a subscription
///
/// Pull-driven: events buffer in the channel until read.
pub struct EventStream {
    receiver: Receiver<InventoryEvent>,
}

impl EventStream {
    /// Next event if one is already buffered
    pub fn try_next(&self) -> Option<InventoryEvent> {
        self.receiver.try_recv().ok()
    }

    /// Next event, waiting up to `timeout`
    pub fn next_timeout(&self, timeout: Duration) -> Option<InventoryEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// All currently buffered events
    pub fn drain(&self) -> Vec<InventoryEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.try_next() {
            out.push(event);
        }
        out
    }
}

/// Registry of observer interests and their live subscriber channels
#[derive(Default)]
pub struct ObservableContext {
    subscribers: Mutex<HashMap<Interest, Vec<Sender<InventoryEvent>>>>,
}

impl ObservableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest and get the event stream for it
    pub fn subscribe(&self, interest: Interest) -> EventStream {
        let (sender, receiver) = channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.entry(interest).or_default().push(sender);
        }
        EventStream { receiver }
    }

    /// Whether anyone listens for this interest
    ///
    /// Lets upstream layers skip expensive event construction when nobody
    /// is listening.
    pub fn has_observers(&self, interest: &Interest) -> bool {
        self.subscribers
            .lock()
            .map(|subscribers| {
                subscribers
                    .get(interest)
                    .map(|senders| !senders.is_empty())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Deliver one committed notification to every matching subscriber
    ///
    /// No-op when nothing matches. Dead subscribers are dropped silently;
    /// delivery problems are logged, never surfaced to the mutation.
    pub fn notify(&self, notification: &PendingNotification) {
        let interest = Interest::new(notification.kind(), notification.action);
        let Ok(mut subscribers) = self.subscribers.lock() else {
            debug!("observer registry lock poisoned, dropping notification");
            return;
        };
        let Some(senders) = subscribers.get_mut(&interest) else {
            return;
        };
        let event = InventoryEvent {
            at: Utc::now(),
            action: notification.action,
            before: notification.before.clone(),
            after: notification.after.clone(),
        };
        senders.retain(|sender| match sender.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!(kind = %interest.kind, action = %interest.action, "dropping dead subscriber");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::model::{CanonicalPath, Entity};

    fn tenant_created() -> PendingNotification {
        PendingNotification::created(NotificationPayload::Entity(Entity::new(
            CanonicalPath::of_tenant("acme"),
        )))
    }

    #[test]
    fn test_no_observers_is_a_noop() {
        let context = ObservableContext::new();
        // must not panic or error
        context.notify(&tenant_created());
        assert!(!context.has_observers(&Interest::new(ElementKind::Tenant, Action::Created)));
    }

    #[test]
    fn test_each_subscriber_sees_the_full_sequence() {
        let context = ObservableContext::new();
        let interest = Interest::new(ElementKind::Tenant, Action::Created);
        let first = context.subscribe(interest);
        let second = context.subscribe(interest);
        assert!(context.has_observers(&interest));

        context.notify(&tenant_created());
        context.notify(&tenant_created());

        assert_eq!(first.drain().len(), 2);
        assert_eq!(second.drain().len(), 2);
    }

    #[test]
    fn test_subscription_starts_at_subscribe_time() {
        let context = ObservableContext::new();
        let interest = Interest::new(ElementKind::Tenant, Action::Created);

        context.notify(&tenant_created());
        let late = context.subscribe(interest);
        context.notify(&tenant_created());

        // no missed-history replay
        assert_eq!(late.drain().len(), 1);
    }

    #[test]
    fn test_dead_subscribers_are_dropped() {
        let context = ObservableContext::new();
        let interest = Interest::new(ElementKind::Tenant, Action::Created);
        drop(context.subscribe(interest));

        context.notify(&tenant_created());
        assert!(!context.has_observers(&interest));
    }

    #[test]
    fn test_interest_matching_is_exact() {
        let interest = Interest::new(ElementKind::Environment, Action::Created);
        assert!(!interest.matches(&tenant_created()));
    }
}
