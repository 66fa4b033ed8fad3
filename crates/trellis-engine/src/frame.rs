//! Transaction frames: many mutations, one commit
//!
//! A frame begins a single backend transaction and hands out an inventory
//! whose backend wrapper reuses that transaction: nested begins take it,
//! nested commits put it back and park the staged notifications. Only
//! `TransactionFrame::commit` performs the real commit, after which every
//! parked notification is flushed in staging order; `rollback` discards
//! them all.
//!
//! Frames do not retry: a conflict at commit time surfaces to the caller,
//! who re-runs the whole frame if desired. A failed operation inside a
//! frame cannot be rolled back individually (there is only the one
//! transaction); the frame is poisoned and should be rolled back whole.

use std::sync::{Arc, Mutex};

use trellis_core::config::Configuration;
use trellis_core::errors::{Result, TrellisError};
use trellis_core::model::{
    Blueprint, CanonicalPath, DataStep, Direction, Entity, Relationship, StructuredData, Update,
};
use trellis_core::query::Query;
use trellis_core::spi::{
    BackendHandle, IndexSpec, InventoryBackend, Page, Pager, PendingNotification, Transaction,
};

use crate::inventory::Inventory;
use crate::observer::ObservableContext;

fn frame_err(message: &str) -> TrellisError {
    TrellisError::Backend {
        message: message.to_string(),
    }
}

/// Backend wrapper that funnels every nested transaction into the frame's
/// one real transaction
struct FrameBackend {
    inner: Arc<dyn InventoryBackend>,
    slot: Mutex<Option<Transaction>>,
    parked: Mutex<Vec<PendingNotification>>,
}

impl FrameBackend {
    fn put_back(&self, tx: Transaction) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| frame_err("frame lock poisoned"))?;
        *slot = Some(tx);
        Ok(())
    }
}

impl InventoryBackend for FrameBackend {
    fn begin(&self) -> Result<Transaction> {
        self.slot
            .lock()
            .map_err(|_| frame_err("frame lock poisoned"))?
            .take()
            .ok_or_else(|| frame_err("frame transaction is in use or the frame is closed"))
    }

    fn commit(&self, mut tx: Transaction) -> Result<Vec<PendingNotification>> {
        let staged = tx.pre_commit_mut().drain();
        self.parked
            .lock()
            .map_err(|_| frame_err("frame lock poisoned"))?
            .extend(staged);
        self.put_back(tx)?;
        // nothing is durable yet; the frame flushes on its real commit
        Ok(Vec::new())
    }

    fn rollback(&self, mut tx: Transaction) -> Result<()> {
        tx.pre_commit_mut().drain();
        self.put_back(tx)
    }

    fn persist(
        &self,
        tx: &mut Transaction,
        path: &CanonicalPath,
        blueprint: &Blueprint,
    ) -> Result<BackendHandle> {
        self.inner.persist(tx, path, blueprint)
    }

    fn persist_data(
        &self,
        tx: &mut Transaction,
        value: &StructuredData,
    ) -> Result<BackendHandle> {
        self.inner.persist_data(tx, value)
    }

    fn relate(
        &self,
        tx: &mut Transaction,
        source: BackendHandle,
        target: BackendHandle,
        name: &str,
        properties: &std::collections::BTreeMap<String, serde_json::Value>,
    ) -> Result<BackendHandle> {
        self.inner.relate(tx, source, target, name, properties)
    }

    fn update(&self, tx: &mut Transaction, entity: BackendHandle, update: &Update) -> Result<()> {
        self.inner.update(tx, entity, update)
    }

    fn delete(&self, tx: &mut Transaction, element: BackendHandle) -> Result<()> {
        self.inner.delete(tx, element)
    }

    fn delete_structured_data(&self, tx: &mut Transaction, data: BackendHandle) -> Result<()> {
        self.inner.delete_structured_data(tx, data)
    }

    fn find(&self, tx: &mut Transaction, path: &CanonicalPath) -> Result<BackendHandle> {
        self.inner.find(tx, path)
    }

    fn query(
        &self,
        tx: &mut Transaction,
        query: &Query,
        pager: &Pager,
    ) -> Result<Page<BackendHandle>> {
        self.inner.query(tx, query, pager)
    }

    fn query_single(&self, tx: &mut Transaction, query: &Query) -> Result<Option<BackendHandle>> {
        self.inner.query_single(tx, query)
    }

    fn traverse_to_single(
        &self,
        tx: &mut Transaction,
        start: BackendHandle,
        query: &Query,
    ) -> Result<Option<BackendHandle>> {
        self.inner.traverse_to_single(tx, start, query)
    }

    fn get_relationships(
        &self,
        tx: &mut Transaction,
        entity: BackendHandle,
        direction: Direction,
        name: Option<&str>,
    ) -> Result<Vec<BackendHandle>> {
        self.inner.get_relationships(tx, entity, direction, name)
    }

    fn relationship_source(
        &self,
        tx: &mut Transaction,
        rel: BackendHandle,
    ) -> Result<BackendHandle> {
        self.inner.relationship_source(tx, rel)
    }

    fn relationship_target(
        &self,
        tx: &mut Transaction,
        rel: BackendHandle,
    ) -> Result<BackendHandle> {
        self.inner.relationship_target(tx, rel)
    }

    fn extract_canonical_path(
        &self,
        tx: &mut Transaction,
        element: BackendHandle,
    ) -> Result<CanonicalPath> {
        self.inner.extract_canonical_path(tx, element)
    }

    fn entity(&self, tx: &mut Transaction, element: BackendHandle) -> Result<Entity> {
        self.inner.entity(tx, element)
    }

    fn relationship(&self, tx: &mut Transaction, rel: BackendHandle) -> Result<Relationship> {
        self.inner.relationship(tx, rel)
    }

    fn descend_to_data(
        &self,
        tx: &mut Transaction,
        owner: BackendHandle,
        steps: &[DataStep],
    ) -> Result<Option<StructuredData>> {
        self.inner.descend_to_data(tx, owner, steps)
    }

    fn transitive_closure(
        &self,
        tx: &mut Transaction,
        start: BackendHandle,
        direction: Direction,
        names: &[String],
    ) -> Result<Vec<BackendHandle>> {
        self.inner.transitive_closure(tx, start, direction, names)
    }

    fn ensure_indices(&self, specs: &[IndexSpec]) -> Result<()> {
        self.inner.ensure_indices(specs)
    }

    fn translate_error(&self, error: TrellisError) -> TrellisError {
        self.inner.translate_error(error)
    }
}

/// A unit of work spanning several inventory operations
pub struct TransactionFrame {
    real: Arc<dyn InventoryBackend>,
    frame_backend: Arc<FrameBackend>,
    inventory: Inventory,
    observers: Arc<ObservableContext>,
}

impl TransactionFrame {
    pub(crate) fn open(
        real: Arc<dyn InventoryBackend>,
        observers: Arc<ObservableContext>,
        configuration: Configuration,
    ) -> Result<Self> {
        let tx = real.begin()?;
        let frame_backend = Arc::new(FrameBackend {
            inner: real.clone(),
            slot: Mutex::new(Some(tx)),
            parked: Mutex::new(Vec::new()),
        });
        let inventory = Inventory::assemble(
            frame_backend.clone(),
            observers.clone(),
            configuration,
        );
        Ok(Self {
            real,
            frame_backend,
            inventory,
            observers,
        })
    }

    /// The inventory whose operations all run inside this frame
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Commit the frame's transaction and flush everything staged in it
    pub fn commit(self) -> Result<()> {
        let tx = self
            .frame_backend
            .slot
            .lock()
            .map_err(|_| frame_err("frame lock poisoned"))?
            .take()
            .ok_or_else(|| frame_err("frame transaction is in use or the frame is closed"))?;

        let mut staged: Vec<PendingNotification> = self
            .frame_backend
            .parked
            .lock()
            .map_err(|_| frame_err("frame lock poisoned"))?
            .drain(..)
            .collect();

        staged.extend(self.real.commit(tx)?);
        for notification in &staged {
            self.observers.notify(notification);
        }
        Ok(())
    }

    /// Abandon the frame; nothing is persisted, nothing is delivered
    pub fn rollback(self) -> Result<()> {
        let tx = self
            .frame_backend
            .slot
            .lock()
            .map_err(|_| frame_err("frame lock poisoned"))?
            .take()
            .ok_or_else(|| frame_err("frame transaction is in use or the frame is closed"))?;
        self.frame_backend
            .parked
            .lock()
            .map_err(|_| frame_err("frame lock poisoned"))?
            .clear();
        self.real.rollback(tx)
    }
}
