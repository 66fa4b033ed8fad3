//! Backend-scoped units of work and their pre-commit notification buffer

use std::any::Any;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{ElementKind, Entity, Relationship};

/// The action a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Updated => write!(f, "updated"),
            Action::Deleted => write!(f, "deleted"),
        }
    }
}

/// The element a notification is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationPayload {
    Entity(Entity),
    Relationship(Relationship),
}

impl NotificationPayload {
    pub fn kind(&self) -> ElementKind {
        match self {
            NotificationPayload::Entity(entity) => {
                entity.kind().unwrap_or(ElementKind::Tenant)
            }
            NotificationPayload::Relationship(_) => ElementKind::Relationship,
        }
    }
}

/// A change event staged during a transaction
///
/// Ephemeral: owned by the transaction's pre-commit buffer until flush, then
/// handed to the notification pipeline. `before` is absent for creations,
/// `after` for deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub action: Action,
    pub before: Option<NotificationPayload>,
    pub after: Option<NotificationPayload>,
}

impl PendingNotification {
    pub fn created(payload: NotificationPayload) -> Self {
        Self {
            action: Action::Created,
            before: None,
            after: Some(payload),
        }
    }

    pub fn updated(before: NotificationPayload, after: NotificationPayload) -> Self {
        Self {
            action: Action::Updated,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(payload: NotificationPayload) -> Self {
        Self {
            action: Action::Deleted,
            before: Some(payload),
            after: None,
        }
    }

    /// Kind of the affected element
    pub fn kind(&self) -> ElementKind {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(NotificationPayload::kind)
            .unwrap_or(ElementKind::Tenant)
    }
}

/// Buffer of notifications staged before commit
///
/// Notifications accumulate in staging order and are only eligible for
/// delivery after the owning transaction commits; rollback discards them.
#[derive(Debug, Default)]
pub struct PreCommit {
    notifications: Vec<PendingNotification>,
}

impl PreCommit {
    pub fn stage(&mut self, notification: PendingNotification) {
        self.notifications.push(notification);
    }

    pub fn notifications(&self) -> &[PendingNotification] {
        &self.notifications
    }

    /// Take the buffered notifications, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<PendingNotification> {
        std::mem::take(&mut self.notifications)
    }
}

/// A backend-scoped unit of work
///
/// Owns the pre-commit buffer and an opaque state payload the backend
/// adapter uses to track its own working context. Handles produced inside a
/// transaction are valid only for that transaction's lifetime.
pub struct Transaction {
    id: Uuid,
    pre_commit: PreCommit,
    state: Box<dyn Any + Send>,
}

impl Transaction {
    pub fn new(state: Box<dyn Any + Send>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pre_commit: PreCommit::default(),
            state,
        }
    }

    /// Transaction identity, used for logging correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pre_commit(&self) -> &PreCommit {
        &self.pre_commit
    }

    pub fn pre_commit_mut(&mut self) -> &mut PreCommit {
        &mut self.pre_commit
    }

    /// Downcast the adapter state payload
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    /// Downcast the adapter state payload mutably
    pub fn state_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.state.downcast_mut::<T>()
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("staged", &self.pre_commit.notifications().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalPath;

    #[test]
    fn test_pre_commit_preserves_staging_order() {
        let mut buffer = PreCommit::default();
        let tenant = Entity::new(CanonicalPath::of_tenant("a"));
        let other = Entity::new(CanonicalPath::of_tenant("b"));
        buffer.stage(PendingNotification::created(NotificationPayload::Entity(
            tenant.clone(),
        )));
        buffer.stage(PendingNotification::deleted(NotificationPayload::Entity(
            other.clone(),
        )));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].action, Action::Created);
        assert_eq!(drained[1].action, Action::Deleted);
        assert!(buffer.notifications().is_empty());
    }

    #[test]
    fn test_notification_kind_prefers_after() {
        let entity = Entity::new(CanonicalPath::of_tenant("a"));
        let n = PendingNotification::created(NotificationPayload::Entity(entity));
        assert_eq!(n.kind(), ElementKind::Tenant);
    }

    #[test]
    fn test_transaction_state_downcast() {
        let mut tx = Transaction::new(Box::new(42_u32));
        assert_eq!(tx.state::<u32>(), Some(&42));
        assert_eq!(tx.state::<String>(), None);
        *tx.state_mut::<u32>().unwrap() = 7;
        assert_eq!(tx.state::<u32>(), Some(&7));
    }
}
