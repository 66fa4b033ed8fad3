//! The transactional create/update/delete protocol
//!
//! Every mutation runs inside one backend transaction: hooks fire, writes
//! land, notifications stage in the pre-commit buffer, and only a successful
//! commit flushes them to observers, in staging order. Any failing step
//! rolls the transaction back and nothing is delivered.
//!
//! Backend conflicts re-run the whole closure (hooks included) up to the
//! configured retry bound; business failures (`EntityNotFound`, validation,
//! illegal relationships) surface immediately.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;

use trellis_core::errors::{Result, TrellisError};
use trellis_core::model::{
    Blueprint, CanonicalPath, Direction, ElementKind, Relationship, Update, WellKnown,
};
use trellis_core::query::{Filter, FragmentKind, Query};
use trellis_core::rules::RelationshipRules;
use trellis_core::spi::{
    BackendHandle, InventoryBackend, NotificationPayload, Pager, PendingNotification, Transaction,
};
use trellis_core::{log_op_end, log_op_error, log_op_start};

use crate::lifecycle::lifecycle_for;
use crate::traversal::TraversalContext;

/// Pass backend-origin failures through the adapter's translation hook,
/// leaving business failures untouched
fn translated(backend: &dyn InventoryBackend, error: TrellisError) -> TrellisError {
    match error {
        TrellisError::Backend { .. } | TrellisError::Conflict { .. } => {
            backend.translate_error(error)
        }
        other => other,
    }
}

/// Write access bound to one traversal position
pub struct Mutator<'a> {
    ctx: &'a TraversalContext,
}

impl<'a> Mutator<'a> {
    pub fn new(ctx: &'a TraversalContext) -> Self {
        Self { ctx }
    }

    /// Run a mutation closure inside a transaction, with bounded retry on
    /// backend conflicts
    ///
    /// On successful commit, the staged notifications are flushed to the
    /// observers in staging order. The closure must be idempotent: a retry
    /// re-runs it from scratch after the previous attempt rolled back.
    fn mutating<T>(&self, op: &'static str, f: impl Fn(&mut Transaction) -> Result<T>) -> Result<T> {
        let backend = self.ctx.backend.as_ref();
        let retries = self.ctx.configuration.transaction_retries();
        let started = Instant::now();
        let mut attempt: usize = 0;

        loop {
            attempt += 1;
            log_op_start!(op, attempt = attempt as u64);

            let mut tx = match backend.begin() {
                Ok(tx) => tx,
                Err(error) => {
                    let error = translated(backend, error);
                    log_op_error!(op, error.clone(), duration_ms = elapsed_ms(started));
                    return Err(error);
                }
            };

            match f(&mut tx) {
                Ok(value) => match backend.commit(tx) {
                    Ok(staged) => {
                        let delivered = staged.len();
                        for notification in &staged {
                            self.ctx.observers.notify(notification);
                        }
                        log_op_end!(
                            op,
                            duration_ms = elapsed_ms(started),
                            notifications = delivered as u64
                        );
                        return Ok(value);
                    }
                    Err(error) => {
                        let error = translated(backend, error);
                        if error.is_retriable() && attempt <= retries {
                            continue;
                        }
                        log_op_error!(op, error.clone(), duration_ms = elapsed_ms(started));
                        return Err(error);
                    }
                },
                Err(error) => {
                    let error = translated(backend, error);
                    if let Err(rollback_error) = backend.rollback(tx) {
                        tracing::debug!(error = %rollback_error, "rollback failed");
                    }
                    if error.is_retriable() && attempt <= retries {
                        continue;
                    }
                    log_op_error!(op, error.clone(), duration_ms = elapsed_ms(started));
                    return Err(error);
                }
            }
        }
    }

    /// Create a new entity under the current position
    ///
    /// Returns a query resolving exactly to the new path, so callers can
    /// wrap it into a read accessor without a second lookup round-trip.
    pub fn create(&self, blueprint: Blueprint) -> Result<Query> {
        let ctx = self.ctx;
        let kind = ctx.kind;

        if kind != ElementKind::Tenant && ctx.source_path.is_empty() {
            return Err(TrellisError::Internal {
                message: format!("cannot create a {} without a parent position", kind),
            });
        }

        self.mutating("create_entity", |tx| {
            let backend = ctx.backend.as_ref();
            let lifecycle = lifecycle_for(kind);

            lifecycle.pre_create(ctx, &blueprint, tx)?;

            // resolve the parent entity from the current traversal position;
            // tenants extend the empty root
            let parent = if kind == ElementKind::Tenant {
                None
            } else {
                let handle = backend.query_single(tx, &ctx.source_path)?.ok_or_else(|| {
                    TrellisError::EntityNotFound {
                        path: ctx.source_path.to_string(),
                    }
                })?;
                Some(handle)
            };

            let entity_path = match parent {
                None => CanonicalPath::root().extend(kind, blueprint.id.clone())?,
                Some(parent_handle) => backend
                    .extract_canonical_path(tx, parent_handle)?
                    .extend(kind, blueprint.id.clone())?,
            };

            let entity_handle = backend.persist(tx, &entity_path, &blueprint)?;

            if let Some(parent_handle) = parent {
                // structurally mandatory edge: bypasses relationship rules
                let contains = backend.relate(
                    tx,
                    parent_handle,
                    entity_handle,
                    WellKnown::Contains.name(),
                    &BTreeMap::new(),
                )?;
                let rel = backend.relationship(tx, contains)?;
                tx.pre_commit_mut()
                    .stage(PendingNotification::created(
                        NotificationPayload::Relationship(rel),
                    ));
            }

            let (entity, wiring_notifications) =
                lifecycle.wire_up(ctx, entity_handle, &blueprint, tx)?;

            self.create_custom_relationships(
                tx,
                entity_handle,
                Direction::Outgoing,
                &blueprint.outgoing,
            )?;
            self.create_custom_relationships(
                tx,
                entity_handle,
                Direction::Incoming,
                &blueprint.incoming,
            )?;

            lifecycle.post_create(ctx, entity_handle, tx)?;

            for notification in wiring_notifications {
                tx.pre_commit_mut().stage(notification);
            }
            tx.pre_commit_mut()
                .stage(PendingNotification::created(NotificationPayload::Entity(
                    entity,
                )));

            Ok(Query::to(&entity_path))
        })
    }

    /// Update the entity with the given id, or every entity at the current
    /// position when `id` is `None`
    pub fn update(&self, id: Option<&str>, update: Update) -> Result<()> {
        let ctx = self.ctx;
        let lifecycle = lifecycle_for(ctx.kind);

        self.mutating("update_entity", |tx| {
            let backend = ctx.backend.as_ref();
            let query = Self::target_query(ctx, id);
            let page = backend.query(tx, &query, &Pager::all())?;
            if page.is_empty() {
                return Err(TrellisError::EntityNotFound {
                    path: query.to_string(),
                });
            }

            for handle in page.items.iter().copied() {
                let before = backend.entity(tx, handle)?;
                lifecycle.pre_update(ctx, handle, &update, tx)?;
                backend.update(tx, handle, &update)?;
                lifecycle.post_update(ctx, handle, tx)?;
                let after = backend.entity(tx, handle)?;
                tx.pre_commit_mut().stage(PendingNotification::updated(
                    NotificationPayload::Entity(before),
                    NotificationPayload::Entity(after),
                ));
            }
            Ok(())
        })
    }

    /// Delete the entity with the given id, or every entity at the current
    /// position when `id` is `None`
    ///
    /// Deletion does not cascade to descendants; cascade policy belongs to
    /// the backend.
    pub fn delete(&self, id: Option<&str>) -> Result<()> {
        let ctx = self.ctx;
        let lifecycle = lifecycle_for(ctx.kind);

        self.mutating("delete_entity", |tx| {
            let backend = ctx.backend.as_ref();
            let query = Self::target_query(ctx, id);
            let page = backend.query(tx, &query, &Pager::all())?;
            if page.is_empty() {
                return Err(TrellisError::EntityNotFound {
                    path: query.to_string(),
                });
            }

            for handle in page.items.iter().copied() {
                let before = backend.entity(tx, handle)?;
                lifecycle.pre_delete(ctx, handle, tx)?;
                backend.delete(tx, handle)?;
                lifecycle.post_delete(ctx, &before, tx)?;
                tx.pre_commit_mut()
                    .stage(PendingNotification::deleted(NotificationPayload::Entity(
                        before,
                    )));
            }
            Ok(())
        })
    }

    /// Create a user-declared relationship from the current single position
    ///
    /// Passes through the relationship rules; the staged notification is
    /// flushed after commit like any other.
    pub fn link(
        &self,
        direction: Direction,
        name: &str,
        other: &CanonicalPath,
        properties: BTreeMap<String, Value>,
    ) -> Result<Relationship> {
        let ctx = self.ctx;

        self.mutating("link", |tx| {
            let backend = ctx.backend.as_ref();
            let select = ctx.select();
            let origin = backend.query_single(tx, &select)?.ok_or_else(|| {
                TrellisError::EntityNotFound {
                    path: select.to_string(),
                }
            })?;
            let other_handle = backend.find(tx, other)?;

            RelationshipRules::standard()
                .check_create(backend, tx, origin, direction, name, other_handle)?;

            let (from, to) = match direction {
                Direction::Incoming => (other_handle, origin),
                _ => (origin, other_handle),
            };
            let rel_handle = backend.relate(tx, from, to, name, &properties)?;
            let rel = backend.relationship(tx, rel_handle)?;
            tx.pre_commit_mut()
                .stage(PendingNotification::created(
                    NotificationPayload::Relationship(rel.clone()),
                ));
            Ok(rel)
        })
    }

    /// Delete a user-declared relationship by its id
    pub fn unlink(&self, rel_id: &str) -> Result<()> {
        let ctx = self.ctx;

        self.mutating("unlink", |tx| {
            let backend = ctx.backend.as_ref();
            let select = ctx.select();
            let origin = backend.query_single(tx, &select)?.ok_or_else(|| {
                TrellisError::EntityNotFound {
                    path: select.to_string(),
                }
            })?;

            let rels = backend.get_relationships(tx, origin, Direction::Both, None)?;
            for handle in rels {
                // edges into structured data have no relationship value
                let Ok(rel) = backend.relationship(tx, handle) else {
                    continue;
                };
                if rel.id == rel_id {
                    RelationshipRules::standard().check_delete(backend, tx, handle)?;
                    backend.delete(tx, handle)?;
                    tx.pre_commit_mut()
                        .stage(PendingNotification::deleted(
                            NotificationPayload::Relationship(rel),
                        ));
                    return Ok(());
                }
            }
            Err(TrellisError::RelationshipNotFound {
                id: rel_id.to_string(),
            })
        })
    }

    fn target_query(ctx: &TraversalContext, id: Option<&str>) -> Query {
        match id {
            Some(id) => ctx
                .select()
                .extend(FragmentKind::Filter)
                .with(Filter::id(id))
                .get(),
            None => ctx.select(),
        }
    }

    fn create_custom_relationships(
        &self,
        tx: &mut Transaction,
        entity: BackendHandle,
        direction: Direction,
        ends: &BTreeMap<String, Vec<CanonicalPath>>,
    ) -> Result<()> {
        let backend = self.ctx.backend.as_ref();
        for (name, paths) in ends {
            for end in paths {
                // an unresolvable target fails the whole transaction
                let end_handle = backend.find(tx, end)?;
                RelationshipRules::standard()
                    .check_create(backend, tx, entity, direction, name, end_handle)?;

                let (from, to) = match direction {
                    Direction::Incoming => (end_handle, entity),
                    _ => (entity, end_handle),
                };
                let rel_handle = backend.relate(tx, from, to, name, &BTreeMap::new())?;
                let rel = backend.relationship(tx, rel_handle)?;
                tx.pre_commit_mut()
                    .stage(PendingNotification::created(
                        NotificationPayload::Relationship(rel),
                    ));
            }
        }
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
