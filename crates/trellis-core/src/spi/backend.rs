//! The backend contract every physical storage engine must implement
//!
//! The contract is intentionally storage-shape-agnostic: the core assumes
//! nothing beyond "entities and directed named edges with properties,
//! addressable and convertible". All operations are potentially blocking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, TrellisError};
use crate::model::{
    Blueprint, CanonicalPath, DataStep, Direction, Entity, Relationship, StructuredData, Update,
};
use crate::query::Query;
use crate::spi::index::IndexSpec;
use crate::spi::paging::{Page, Pager};
use crate::spi::transaction::{PendingNotification, Transaction};

/// Opaque reference into a backend's store
///
/// Handles are minted by the backend and are only meaningful to it; they
/// stay valid for the lifetime of the transaction that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackendHandle(u64);

impl BackendHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The minimal capability set a storage engine must provide
///
/// Every operation participates in a [`Transaction`]; read-only callers
/// open a short-lived transaction and commit it untouched. Implementations
/// decide the isolation level; the core performs no locking of its own.
pub trait InventoryBackend: Send + Sync {
    // ----- transaction lifecycle -----

    fn begin(&self) -> Result<Transaction>;

    /// Make the transaction's writes durable
    ///
    /// On success, returns the transaction's staged notifications: they are
    /// now eligible for delivery, and the caller flushes them. A concurrent
    /// conflicting commit surfaces as [`TrellisError::Conflict`], which
    /// callers may retry with a fresh transaction; the staged notifications
    /// are discarded with the failed transaction.
    fn commit(&self, tx: Transaction) -> Result<Vec<PendingNotification>>;

    fn rollback(&self, tx: Transaction) -> Result<()>;

    // ----- writes -----

    /// Persist a new entity representation at the given canonical path
    fn persist(
        &self,
        tx: &mut Transaction,
        path: &CanonicalPath,
        blueprint: &Blueprint,
    ) -> Result<BackendHandle>;

    /// Persist a standalone structured-data value
    fn persist_data(
        &self,
        tx: &mut Transaction,
        value: &StructuredData,
    ) -> Result<BackendHandle>;

    /// Create a directed named edge between two stored elements
    fn relate(
        &self,
        tx: &mut Transaction,
        source: BackendHandle,
        target: BackendHandle,
        name: &str,
        properties: &BTreeMap<String, Value>,
    ) -> Result<BackendHandle>;

    /// Apply a partial update to a stored entity
    fn update(&self, tx: &mut Transaction, entity: BackendHandle, update: &Update) -> Result<()>;

    /// Delete a stored element (entity or relationship)
    fn delete(&self, tx: &mut Transaction, element: BackendHandle) -> Result<()>;

    /// Delete a standalone structured-data value
    fn delete_structured_data(&self, tx: &mut Transaction, data: BackendHandle) -> Result<()>;

    // ----- reads -----

    /// Resolve a canonical path to its stored element
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::EntityNotFound`] when nothing lives at `path`.
    fn find(&self, tx: &mut Transaction, path: &CanonicalPath) -> Result<BackendHandle>;

    /// Evaluate a query, returning one page of matching elements
    fn query(
        &self,
        tx: &mut Transaction,
        query: &Query,
        pager: &Pager,
    ) -> Result<Page<BackendHandle>>;

    /// Evaluate a query expected to match at most one element
    ///
    /// Multiple matches resolve to the first in backend order.
    fn query_single(&self, tx: &mut Transaction, query: &Query) -> Result<Option<BackendHandle>>;

    /// Evaluate a query relative to a starting element
    fn traverse_to_single(
        &self,
        tx: &mut Transaction,
        start: BackendHandle,
        query: &Query,
    ) -> Result<Option<BackendHandle>>;

    /// Relationships the element participates in, optionally restricted by
    /// name; direction is relative to `entity`
    fn get_relationships(
        &self,
        tx: &mut Transaction,
        entity: BackendHandle,
        direction: Direction,
        name: Option<&str>,
    ) -> Result<Vec<BackendHandle>>;

    fn relationship_source(&self, tx: &mut Transaction, rel: BackendHandle)
        -> Result<BackendHandle>;

    fn relationship_target(&self, tx: &mut Transaction, rel: BackendHandle)
        -> Result<BackendHandle>;

    /// The canonical path stored for an entity element
    fn extract_canonical_path(
        &self,
        tx: &mut Transaction,
        element: BackendHandle,
    ) -> Result<CanonicalPath>;

    /// Convert a stored element to its entity value
    fn entity(&self, tx: &mut Transaction, element: BackendHandle) -> Result<Entity>;

    /// Convert a stored element to its relationship value
    fn relationship(&self, tx: &mut Transaction, rel: BackendHandle) -> Result<Relationship>;

    /// Read (part of) the structured-data value attached to an entity via
    /// its `hasData` edge, descending by the given steps
    ///
    /// Returns `None` when the entity has no attached data or the descent
    /// does not match the value's shape.
    fn descend_to_data(
        &self,
        tx: &mut Transaction,
        owner: BackendHandle,
        steps: &[DataStep],
    ) -> Result<Option<StructuredData>>;

    /// Breadth-first closure over the named relationships, starting from
    /// (and excluding) `start`
    fn transitive_closure(
        &self,
        tx: &mut Transaction,
        start: BackendHandle,
        direction: Direction,
        names: &[String],
    ) -> Result<Vec<BackendHandle>>;

    // ----- adapter extras -----

    /// Declare index hints; adapters may ignore them
    fn ensure_indices(&self, specs: &[IndexSpec]) -> Result<()> {
        let _ = specs;
        Ok(())
    }

    /// Translate an engine-specific failure into the core taxonomy
    ///
    /// Invoked on every backend-origin failure. The default keeps the error
    /// as-is.
    fn translate_error(&self, error: TrellisError) -> TrellisError {
        error
    }

    /// Release resources held by the adapter
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
