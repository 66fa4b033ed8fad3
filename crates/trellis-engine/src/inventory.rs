//! The top-level inventory facade
//!
//! Wires a backend, the observer registry and the configuration into typed
//! per-kind accessors, query execution, direct path resolution,
//! closure traversal and transaction frames.

use std::sync::Arc;

use trellis_core::config::Configuration;
use trellis_core::errors::{Result, TrellisError};
use trellis_core::model::{CanonicalPath, Direction, ElementKind, Entity, Relationship};
use trellis_core::query::{Filter, Query};
use trellis_core::spi::{IndexSpec, InventoryBackend, Page, Pager};

use crate::accessors::EntityAccessor;
use crate::frame::TransactionFrame;
use crate::observer::{EventStream, Interest, ObservableContext};
use crate::traversal::TraversalContext;

/// An inventory bound to one backend
pub struct Inventory {
    backend: Arc<dyn InventoryBackend>,
    observers: Arc<ObservableContext>,
    configuration: Configuration,
}

impl Inventory {
    /// Initialize an inventory over a backend
    ///
    /// Index hints for the well-known lookups are forwarded to the backend;
    /// adapters are free to ignore them.
    pub fn new(backend: Arc<dyn InventoryBackend>, configuration: Configuration) -> Result<Self> {
        let inventory = Self::assemble(backend, Arc::new(ObservableContext::new()), configuration);
        inventory.backend.ensure_indices(&Self::index_hints())?;
        Ok(inventory)
    }

    pub(crate) fn assemble(
        backend: Arc<dyn InventoryBackend>,
        observers: Arc<ObservableContext>,
        configuration: Configuration,
    ) -> Self {
        Self {
            backend,
            observers,
            configuration,
        }
    }

    fn index_hints() -> Vec<IndexSpec> {
        [
            ElementKind::Tenant,
            ElementKind::Environment,
            ElementKind::Feed,
            ElementKind::ResourceType,
            ElementKind::MetricType,
            ElementKind::Resource,
            ElementKind::Metric,
            ElementKind::DataEntity,
        ]
        .into_iter()
        .map(|kind| IndexSpec::new(kind, "id"))
        .collect()
    }

    fn root_context(&self, kind: ElementKind) -> TraversalContext {
        TraversalContext::root(
            self.backend.clone(),
            kind,
            self.configuration.clone(),
            self.observers.clone(),
        )
    }

    /// Read/write access to tenants; everything else hangs off them
    pub fn tenants(&self) -> EntityAccessor {
        EntityAccessor::new(self.root_context(ElementKind::Tenant))
    }

    /// Resolve a canonical path directly to its entity
    pub fn element(&self, path: &CanonicalPath) -> Result<Entity> {
        let ctx = self.root_context(ElementKind::Tenant);
        ctx.in_read_tx(|tx| {
            let handle = self.backend.find(tx, path)?;
            self.backend.entity(tx, handle)
        })
    }

    /// Resolve a relationship by its synthetic id
    pub fn relationship(&self, id: &str) -> Result<Relationship> {
        let ctx = self.root_context(ElementKind::Relationship);
        let query = Query::filter()
            .with(Filter::kind(ElementKind::Relationship))
            .with(Filter::id(id))
            .get();
        ctx.in_read_tx(|tx| {
            let handle = self.backend.query_single(tx, &query)?.ok_or_else(|| {
                TrellisError::RelationshipNotFound { id: id.to_string() }
            })?;
            self.backend.relationship(tx, handle)
        })
    }

    /// Evaluate an arbitrary entity query with paging
    pub fn execute(&self, query: &Query, pager: &Pager) -> Result<Page<Entity>> {
        let ctx = self.root_context(ElementKind::Tenant);
        ctx.in_read_tx(|tx| {
            let page = self.backend.query(tx, query, pager)?;
            let total = page.total;
            let mut entities = Vec::with_capacity(page.len());
            for handle in page {
                entities.push(self.backend.entity(tx, handle)?);
            }
            Ok(Page::new(entities, total))
        })
    }

    /// Entities reachable from `start` over the named relationships
    pub fn transitive_closure_over(
        &self,
        start: &CanonicalPath,
        direction: Direction,
        relationship_names: &[&str],
    ) -> Result<Vec<Entity>> {
        let ctx = self.root_context(ElementKind::Tenant);
        let names: Vec<String> = relationship_names.iter().map(|n| n.to_string()).collect();
        ctx.in_read_tx(|tx| {
            let handle = self.backend.find(tx, start)?;
            let closure = self
                .backend
                .transitive_closure(tx, handle, direction, &names)?;
            let mut entities = Vec::with_capacity(closure.len());
            for handle in closure {
                entities.push(self.backend.entity(tx, handle)?);
            }
            Ok(entities)
        })
    }

    /// Subscribe to change events for an interest
    pub fn observable(&self, interest: Interest) -> EventStream {
        self.observers.subscribe(interest)
    }

    /// Whether anyone listens for an interest; lets callers skip building
    /// expensive payloads when nobody does
    pub fn has_observers(&self, interest: &Interest) -> bool {
        self.observers.has_observers(interest)
    }

    /// Open a transaction frame spanning several operations
    pub fn new_transaction_frame(&self) -> Result<TransactionFrame> {
        TransactionFrame::open(
            self.backend.clone(),
            self.observers.clone(),
            self.configuration.clone(),
        )
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// The backend this inventory uses
    ///
    /// Primarily for tests; unwise writes through it can render the
    /// inventory inconsistent.
    pub fn backend(&self) -> Arc<dyn InventoryBackend> {
        self.backend.clone()
    }

    /// Release the backend's resources
    pub fn close(&self) -> Result<()> {
        self.backend.close()
    }
}
