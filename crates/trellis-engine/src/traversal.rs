//! Traversal contexts: bound cursors for read access
//!
//! A context binds the query up to "here", the query fragment selecting
//! candidates "from here", the expected element kind, the backend, the
//! configuration and the observer registry. Contexts are cheap to clone and
//! derive; resolving them happens inside short-lived read transactions.
//!
//! Read traversals are side-effect-free. Mutation is only reachable after
//! narrowing to a single position (see `mutator`), so bulk traversals can
//! never fan out destructive writes.

use std::sync::Arc;

use trellis_core::config::Configuration;
use trellis_core::errors::{Result, TrellisError};
use trellis_core::model::{Direction, ElementKind, WellKnown};
use trellis_core::query::{Filter, FragmentKind, Query};
use trellis_core::spi::{InventoryBackend, Transaction};

use crate::observer::ObservableContext;

/// A bound cursor over one inventory position
#[derive(Clone)]
pub struct TraversalContext {
    pub backend: Arc<dyn InventoryBackend>,
    /// Query resolving the position this context hangs off (the "parent"
    /// position for creates)
    pub source_path: Query,
    /// Query fragments selecting candidates from the source position
    pub select_candidates: Query,
    /// Kind of element this context selects
    pub kind: ElementKind,
    pub configuration: Configuration,
    pub observers: Arc<ObservableContext>,
}

impl TraversalContext {
    /// Root context selecting all elements of `kind`
    pub fn root(
        backend: Arc<dyn InventoryBackend>,
        kind: ElementKind,
        configuration: Configuration,
        observers: Arc<ObservableContext>,
    ) -> Self {
        Self {
            backend,
            source_path: Query::empty(),
            select_candidates: Query::path().with(Filter::kind(kind)).get(),
            kind,
            configuration,
            observers,
        }
    }

    /// The full query selecting this context's candidates
    pub fn select(&self) -> Query {
        self.source_path.append(&self.select_candidates)
    }

    /// This context narrowed to the candidate with the given id
    pub fn narrow_id(&self, id: &str) -> Self {
        let mut narrowed = self.clone();
        narrowed.select_candidates = narrowed
            .select_candidates
            .extend(FragmentKind::Filter)
            .with(Filter::id(id))
            .get();
        narrowed
    }

    /// This context with extra OR-of-AND filter groups appended
    pub fn narrow_where_all(&self, groups: Vec<Vec<Filter>>) -> Self {
        let mut narrowed = self.clone();
        narrowed.select_candidates = narrowed
            .select_candidates
            .extend(FragmentKind::Filter)
            .where_all(groups)
            .get();
        narrowed
    }

    /// Derive the child context selecting `kind` entities contained by the
    /// current position
    pub fn proceed_to(&self, kind: ElementKind) -> Self {
        Self {
            backend: self.backend.clone(),
            source_path: self.select(),
            select_candidates: Query::path()
                .with(Filter::related_by(
                    WellKnown::Contains.name(),
                    Direction::Outgoing,
                ))
                .with(Filter::kind(kind))
                .get(),
            kind,
            configuration: self.configuration.clone(),
            observers: self.observers.clone(),
        }
    }

    /// A context that resolves exactly the given query (used to hand back a
    /// just-created entity without a second traversal)
    pub fn resolved_to(&self, query: Query, kind: ElementKind) -> Self {
        Self {
            backend: self.backend.clone(),
            source_path: query,
            select_candidates: Query::empty(),
            kind,
            configuration: self.configuration.clone(),
            observers: self.observers.clone(),
        }
    }

    /// Run a read-only closure inside its own transaction
    ///
    /// The transaction commits untouched on success and is rolled back on
    /// failure; either way no writes can escape.
    pub fn in_read_tx<T>(&self, f: impl FnOnce(&mut Transaction) -> Result<T>) -> Result<T> {
        let mut tx = self.backend.begin().map_err(|e| self.backend.translate_error(e))?;
        match f(&mut tx) {
            Ok(value) => {
                self.backend
                    .commit(tx)
                    .map_err(|e| self.backend.translate_error(e))?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.backend.rollback(tx) {
                    tracing::debug!(error = %rollback_error, "rollback after failed read");
                }
                Err(match error {
                    TrellisError::Backend { .. } | TrellisError::Conflict { .. } => {
                        self.backend.translate_error(error)
                    }
                    other => other,
                })
            }
        }
    }
}
