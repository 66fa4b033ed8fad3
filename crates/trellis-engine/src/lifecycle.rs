//! Per-kind lifecycle hooks for the mutation protocol
//!
//! One concrete hook set exists per element kind, selected from the kind at
//! traversal-context construction time. Hooks run synchronously inside the
//! mutation transaction; a hook returning an error aborts the transaction.
//!
//! Hooks must be idempotent: a backend conflict re-runs the entire mutation
//! closure, hooks included, after the previous attempt was rolled back.

use std::collections::BTreeMap;

use tracing::warn;

use trellis_core::errors::Result;
use trellis_core::model::{
    Blueprint, Direction, ElementKind, Entity, StructuredData, Update, WellKnown,
};
use trellis_core::spi::{BackendHandle, PendingNotification, Transaction};

use crate::traversal::TraversalContext;
use crate::validator;

/// Kind-specific extension points of the create/update/delete protocol
pub trait Lifecycle: Send + Sync {
    /// Runs before anything is persisted; may reject the creation
    fn pre_create(
        &self,
        ctx: &TraversalContext,
        blueprint: &Blueprint,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _ = (ctx, blueprint, tx);
        Ok(())
    }

    /// Wires up the freshly created entity
    ///
    /// The `contains` edge to the parent already exists at this point.
    /// Returns the finalized entity value plus any extra notifications the
    /// wiring produced.
    fn wire_up(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        blueprint: &Blueprint,
        tx: &mut Transaction,
    ) -> Result<(Entity, Vec<PendingNotification>)> {
        let _ = blueprint;
        Ok((ctx.backend.entity(tx, entity)?, Vec::new()))
    }

    /// Runs after all creation writes, before commit
    fn post_create(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _ = (ctx, entity, tx);
        Ok(())
    }

    /// Runs before the backend update is applied
    fn pre_update(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        update: &Update,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _ = (ctx, entity, update, tx);
        Ok(())
    }

    fn post_update(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _ = (ctx, entity, tx);
        Ok(())
    }

    /// Runs before the entity is deleted; cleanup of implicit attachments
    /// happens here
    fn pre_delete(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _ = (ctx, entity, tx);
        Ok(())
    }

    /// Runs after the delete, with the value the entity had
    fn post_delete(
        &self,
        ctx: &TraversalContext,
        deleted: &Entity,
        tx: &mut Transaction,
    ) -> Result<()> {
        let _ = (ctx, deleted, tx);
        Ok(())
    }
}

/// Hooks for every plain entity kind
struct DefaultLifecycle;

impl Lifecycle for DefaultLifecycle {}

/// Hooks for data entities: schema validation plus the implicit `hasData`
/// attachment
struct DataLifecycle;

impl Lifecycle for DataLifecycle {
    fn wire_up(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        blueprint: &Blueprint,
        tx: &mut Transaction,
    ) -> Result<(Entity, Vec<PendingNotification>)> {
        let backend = ctx.backend.as_ref();
        let value = blueprint
            .data
            .clone()
            .unwrap_or(StructuredData::Undefined);

        validator::validate(ctx, &value, entity, tx)?;

        let data_handle = backend.persist_data(tx, &value)?;
        // implicit edge: no relationship rules, no notification
        backend.relate(
            tx,
            entity,
            data_handle,
            WellKnown::HasData.name(),
            &BTreeMap::new(),
        )?;

        Ok((backend.entity(tx, entity)?, Vec::new()))
    }

    fn pre_update(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        update: &Update,
        tx: &mut Transaction,
    ) -> Result<()> {
        if let Some(value) = &update.data {
            validator::validate(ctx, value, entity, tx)?;
        }
        Ok(())
    }

    fn pre_delete(
        &self,
        ctx: &TraversalContext,
        entity: BackendHandle,
        tx: &mut Transaction,
    ) -> Result<()> {
        let backend = ctx.backend.as_ref();
        let rels = backend.get_relationships(
            tx,
            entity,
            Direction::Outgoing,
            Some(WellKnown::HasData.name()),
        )?;

        let Some(data_rel) = rels.first() else {
            // tolerated: the entity goes away regardless
            let path = backend
                .extract_canonical_path(tx, entity)
                .map(|p| p.to_string())
                .unwrap_or_default();
            warn!(
                component = module_path!(),
                op = "delete_data_entity",
                path = %path,
                "no structured data associated with entity"
            );
            return Ok(());
        };

        let data = backend.relationship_target(tx, *data_rel)?;
        backend.delete_structured_data(tx, data)?;
        backend.delete(tx, *data_rel)?;
        Ok(())
    }
}

/// The hook set for an element kind
pub fn lifecycle_for(kind: ElementKind) -> &'static dyn Lifecycle {
    match kind {
        ElementKind::DataEntity => &DataLifecycle,
        _ => &DefaultLifecycle,
    }
}
