//! In-memory storage backend
//!
//! Elements (entities, relationships, structured-data values) live in one
//! id-keyed map with secondary indexes by canonical path and by edge
//! endpoint. A transaction takes a full snapshot of the store at `begin`;
//! writes mutate only the snapshot, and `commit` swaps it in if no other
//! transaction committed in between (coarse optimistic concurrency - any
//! interleaved commit aborts with a conflict, which the engine retries).

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use trellis_core::errors::{Result, TrellisError};
use trellis_core::model::{
    Blueprint, CanonicalPath, DataStep, Direction, ElementKind, Entity, Relationship,
    StructuredData, Update, WellKnown,
};
use trellis_core::query::{Filter, Query};
use trellis_core::spi::{
    BackendHandle, IndexSpec, InventoryBackend, Page, Pager, PendingNotification, SortOrder,
    Transaction,
};

/// One stored element
#[derive(Debug, Clone)]
enum Element {
    Entity(StoredEntity),
    Relationship(StoredRelationship),
    Data(StructuredData),
}

#[derive(Debug, Clone)]
struct StoredEntity {
    path: CanonicalPath,
    properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct StoredRelationship {
    id: String,
    name: String,
    source: u64,
    target: u64,
    properties: BTreeMap<String, Value>,
}

/// The complete store state; cloned wholesale into transaction snapshots
#[derive(Debug, Clone, Default)]
struct Inner {
    version: u64,
    next_id: u64,
    elements: HashMap<u64, Element>,
    path_index: HashMap<CanonicalPath, u64>,
    rels_by_source: HashMap<u64, Vec<u64>>,
    rels_by_target: HashMap<u64, Vec<u64>>,
}

impl Inner {
    fn mint_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn entity(&self, id: u64) -> Result<&StoredEntity> {
        match self.elements.get(&id) {
            Some(Element::Entity(entity)) => Ok(entity),
            _ => Err(backend_err("element is not an entity")),
        }
    }

    fn relationship(&self, id: u64) -> Result<&StoredRelationship> {
        match self.elements.get(&id) {
            Some(Element::Relationship(rel)) => Ok(rel),
            _ => Err(backend_err("element is not a relationship")),
        }
    }

    /// Relationship element ids incident to `element`, honoring direction
    fn incident_rels(&self, element: u64, direction: Direction) -> Vec<u64> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            if let Some(rels) = self.rels_by_source.get(&element) {
                out.extend(rels.iter().copied());
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            if let Some(rels) = self.rels_by_target.get(&element) {
                out.extend(rels.iter().copied());
            }
        }
        out
    }

    /// The structured-data element attached to an entity, if any
    fn attached_data(&self, entity: u64) -> Option<(u64, &StructuredData)> {
        let rels = self.rels_by_source.get(&entity)?;
        for rel_id in rels {
            if let Some(Element::Relationship(rel)) = self.elements.get(rel_id) {
                if rel.name == WellKnown::HasData.name() {
                    if let Some(Element::Data(value)) = self.elements.get(&rel.target) {
                        return Some((rel.target, value));
                    }
                }
            }
        }
        None
    }

    fn remove_element(&mut self, id: u64) {
        if let Some(Element::Entity(entity)) = self.elements.get(&id) {
            self.path_index.remove(&entity.path);
        }
        if let Some(Element::Relationship(rel)) = self.elements.get(&id).cloned() {
            if let Some(rels) = self.rels_by_source.get_mut(&rel.source) {
                rels.retain(|r| *r != id);
            }
            if let Some(rels) = self.rels_by_target.get_mut(&rel.target) {
                rels.retain(|r| *r != id);
            }
        }
        self.elements.remove(&id);
        self.rels_by_source.remove(&id);
        self.rels_by_target.remove(&id);
    }
}

/// Snapshot-transaction state carried inside a core `Transaction`
struct TxState {
    base_version: u64,
    work: Inner,
    dirty: bool,
}

fn backend_err(message: impl Into<String>) -> TrellisError {
    TrellisError::Backend {
        message: message.into(),
    }
}

/// Deterministic synthetic id for a relationship
fn relationship_id(source: &str, name: &str, target: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(target.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..12])
}

/// In-memory implementation of the inventory SPI
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    fn tx_state<'a>(&self, tx: &'a mut Transaction) -> Result<&'a mut TxState> {
        tx.state_mut::<TxState>()
            .ok_or_else(|| backend_err("transaction does not belong to this backend"))
    }

    /// A stable, human-meaningful sort key for paging
    fn sort_key(work: &Inner, id: u64, order: &SortOrder) -> String {
        let element = work.elements.get(&id);
        match order {
            SortOrder::Unordered => format!("{:020}", id),
            SortOrder::Ascending(prop) | SortOrder::Descending(prop) => match element {
                Some(Element::Entity(entity)) => {
                    if prop == "id" {
                        entity.path.target_id().unwrap_or_default().to_string()
                    } else {
                        entity
                            .properties
                            .get(prop)
                            .map(Value::to_string)
                            .unwrap_or_default()
                    }
                }
                Some(Element::Relationship(rel)) => {
                    if prop == "id" {
                        rel.id.clone()
                    } else {
                        rel.properties
                            .get(prop)
                            .map(Value::to_string)
                            .unwrap_or_default()
                    }
                }
                _ => String::new(),
            },
        }
    }

    /// Evaluate a query over the snapshot, starting from `start` (or from
    /// every addressable element when `start` is `None`)
    fn eval(work: &Inner, query: &Query, start: Option<u64>) -> Vec<u64> {
        let mut current: Vec<u64> = match start {
            Some(id) => vec![id],
            None => {
                let mut all: Vec<u64> = work
                    .elements
                    .iter()
                    .filter(|(_, e)| !matches!(e, Element::Data(_)))
                    .map(|(id, _)| *id)
                    .collect();
                all.sort_unstable();
                all
            }
        };

        for fragment in query.fragments() {
            let mut next: Vec<u64> = Vec::new();
            let mut seen: HashSet<u64> = HashSet::new();
            for branch in &fragment.branches {
                let mut candidates = current.clone();
                for filter in branch {
                    candidates = Self::apply_filter(work, filter, candidates);
                }
                for id in candidates {
                    if seen.insert(id) {
                        next.push(id);
                    }
                }
            }
            current = next;
        }
        current
    }

    fn apply_filter(work: &Inner, filter: &Filter, candidates: Vec<u64>) -> Vec<u64> {
        match filter {
            Filter::WithId(wanted) => candidates
                .into_iter()
                .filter(|id| match work.elements.get(id) {
                    Some(Element::Entity(entity)) => {
                        entity.path.target_id() == Some(wanted.as_str())
                    }
                    Some(Element::Relationship(rel)) => rel.id == *wanted,
                    _ => false,
                })
                .collect(),

            Filter::WithType(kind) => candidates
                .into_iter()
                .filter(|id| match work.elements.get(id) {
                    Some(Element::Entity(entity)) => entity.path.target_kind() == Some(*kind),
                    Some(Element::Relationship(_)) => *kind == ElementKind::Relationship,
                    _ => false,
                })
                .collect(),

            Filter::WithProperty { name, value } => candidates
                .into_iter()
                .filter(|id| match work.elements.get(id) {
                    Some(Element::Entity(entity)) => entity.properties.get(name) == Some(value),
                    Some(Element::Relationship(rel)) => rel.properties.get(name) == Some(value),
                    _ => false,
                })
                .collect(),

            Filter::RelatedBy { name, direction } => {
                let mut out = Vec::new();
                let mut seen = HashSet::new();
                for id in candidates {
                    for rel_id in work.incident_rels(id, *direction) {
                        let Some(Element::Relationship(rel)) = work.elements.get(&rel_id)
                        else {
                            continue;
                        };
                        if rel.name != *name {
                            continue;
                        }
                        let neighbor = if rel.source == id { rel.target } else { rel.source };
                        if matches!(work.elements.get(&neighbor), Some(Element::Data(_))) {
                            continue;
                        }
                        if seen.insert(neighbor) {
                            out.push(neighbor);
                        }
                    }
                }
                out
            }

            // jumps to the addressed element, ignoring the current set
            Filter::At(path) => work.path_index.get(path).map(|id| vec![*id]).unwrap_or_default(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryBackend for MemoryBackend {
    fn begin(&self) -> Result<Transaction> {
        let inner = self
            .inner
            .read()
            .map_err(|_| backend_err("store lock poisoned"))?;
        let state = TxState {
            base_version: inner.version,
            work: inner.clone(),
            dirty: false,
        };
        Ok(Transaction::new(Box::new(state)))
    }

    fn commit(&self, mut tx: Transaction) -> Result<Vec<PendingNotification>> {
        let tx_id = tx.id();
        let staged = tx.pre_commit_mut().drain();
        let state = self.tx_state(&mut tx)?;
        if !state.dirty {
            return Ok(staged);
        }
        let mut inner = self
            .inner
            .write()
            .map_err(|_| backend_err("store lock poisoned"))?;
        if inner.version != state.base_version {
            return Err(TrellisError::Conflict {
                message: format!(
                    "store moved from version {} to {} while transaction {} was open",
                    state.base_version, inner.version, tx_id
                ),
            });
        }
        state.work.version = state.base_version + 1;
        *inner = std::mem::take(&mut state.work);
        debug!(tx_id = %tx_id, version = inner.version, "committed");
        Ok(staged)
    }

    fn rollback(&self, tx: Transaction) -> Result<()> {
        debug!(tx_id = %tx.id(), "rolled back");
        drop(tx);
        Ok(())
    }

    fn persist(
        &self,
        tx: &mut Transaction,
        path: &CanonicalPath,
        blueprint: &Blueprint,
    ) -> Result<BackendHandle> {
        let state = self.tx_state(tx)?;
        if state.work.path_index.contains_key(path) {
            // a concurrent or earlier create occupies this path
            return Err(TrellisError::Conflict {
                message: format!("path {} is already occupied", path),
            });
        }
        let id = state.work.mint_id();
        state.work.elements.insert(
            id,
            Element::Entity(StoredEntity {
                path: path.clone(),
                properties: blueprint.properties.clone(),
            }),
        );
        state.work.path_index.insert(path.clone(), id);
        state.dirty = true;
        Ok(BackendHandle::new(id))
    }

    fn persist_data(
        &self,
        tx: &mut Transaction,
        value: &StructuredData,
    ) -> Result<BackendHandle> {
        let state = self.tx_state(tx)?;
        let id = state.work.mint_id();
        state.work.elements.insert(id, Element::Data(value.clone()));
        state.dirty = true;
        Ok(BackendHandle::new(id))
    }

    fn relate(
        &self,
        tx: &mut Transaction,
        source: BackendHandle,
        target: BackendHandle,
        name: &str,
        properties: &BTreeMap<String, Value>,
    ) -> Result<BackendHandle> {
        let state = self.tx_state(tx)?;
        if !state.work.elements.contains_key(&source.value()) {
            return Err(backend_err("relationship source does not exist"));
        }
        if !state.work.elements.contains_key(&target.value()) {
            return Err(backend_err("relationship target does not exist"));
        }

        let source_key = match state.work.elements.get(&source.value()) {
            Some(Element::Entity(e)) => e.path.to_string(),
            _ => format!("#{}", source.value()),
        };
        let target_key = match state.work.elements.get(&target.value()) {
            Some(Element::Entity(e)) => e.path.to_string(),
            _ => format!("#{}", target.value()),
        };

        let id = state.work.mint_id();
        let rel = StoredRelationship {
            id: relationship_id(&source_key, name, &target_key),
            name: name.to_string(),
            source: source.value(),
            target: target.value(),
            properties: properties.clone(),
        };
        state.work.elements.insert(id, Element::Relationship(rel));
        state
            .work
            .rels_by_source
            .entry(source.value())
            .or_default()
            .push(id);
        state
            .work
            .rels_by_target
            .entry(target.value())
            .or_default()
            .push(id);
        state.dirty = true;
        Ok(BackendHandle::new(id))
    }

    fn update(&self, tx: &mut Transaction, entity: BackendHandle, update: &Update) -> Result<()> {
        let state = self.tx_state(tx)?;

        if let Some(properties) = &update.properties {
            match state.work.elements.get_mut(&entity.value()) {
                Some(Element::Entity(stored)) => {
                    stored.properties = properties.clone();
                }
                _ => return Err(backend_err("element is not an entity")),
            }
        }

        if let Some(value) = &update.data {
            let Some((data_id, _)) = state.work.attached_data(entity.value()) else {
                return Err(backend_err("entity has no structured data attached"));
            };
            state
                .work
                .elements
                .insert(data_id, Element::Data(value.clone()));
        }

        state.dirty = true;
        Ok(())
    }

    fn delete(&self, tx: &mut Transaction, element: BackendHandle) -> Result<()> {
        let state = self.tx_state(tx)?;

        let entity_path = match state.work.elements.get(&element.value()) {
            Some(Element::Entity(entity)) => Some(entity.path.to_string()),
            Some(Element::Relationship(_)) => None,
            Some(Element::Data(_)) => {
                return Err(backend_err(
                    "structured data must be deleted via delete_structured_data",
                ));
            }
            None => return Err(backend_err("element does not exist")),
        };

        if let Some(path) = entity_path {
            // cascade is not this backend's business: refuse to orphan children
            let children = state
                .work
                .incident_rels(element.value(), Direction::Outgoing)
                .into_iter()
                .filter(|rel_id| {
                    matches!(
                        state.work.elements.get(rel_id),
                        Some(Element::Relationship(rel))
                            if rel.name == WellKnown::Contains.name()
                    )
                })
                .count();
            if children > 0 {
                return Err(backend_err(format!(
                    "entity {} still contains {} child(ren)",
                    path, children
                )));
            }
            let incident = state.work.incident_rels(element.value(), Direction::Both);
            for rel_id in incident {
                state.work.remove_element(rel_id);
            }
        }
        state.work.remove_element(element.value());
        state.dirty = true;
        Ok(())
    }

    fn delete_structured_data(&self, tx: &mut Transaction, data: BackendHandle) -> Result<()> {
        let state = self.tx_state(tx)?;
        match state.work.elements.get(&data.value()) {
            Some(Element::Data(_)) => {
                state.work.remove_element(data.value());
                state.dirty = true;
                Ok(())
            }
            _ => Err(backend_err("element is not structured data")),
        }
    }

    fn find(&self, tx: &mut Transaction, path: &CanonicalPath) -> Result<BackendHandle> {
        let state = self.tx_state(tx)?;
        state
            .work
            .path_index
            .get(path)
            .map(|id| BackendHandle::new(*id))
            .ok_or_else(|| TrellisError::EntityNotFound {
                path: path.to_string(),
            })
    }

    fn query(
        &self,
        tx: &mut Transaction,
        query: &Query,
        pager: &Pager,
    ) -> Result<Page<BackendHandle>> {
        let state = self.tx_state(tx)?;
        let mut matches = Self::eval(&state.work, query, None);

        let work = &state.work;
        matches.sort_by_key(|id| Self::sort_key(work, *id, &pager.order));
        if matches!(pager.order, SortOrder::Descending(_)) {
            matches.reverse();
        }

        let total = matches.len();
        let items = matches
            .into_iter()
            .skip(pager.offset())
            .take(pager.page_size)
            .map(BackendHandle::new)
            .collect();
        Ok(Page::new(items, total))
    }

    fn query_single(&self, tx: &mut Transaction, query: &Query) -> Result<Option<BackendHandle>> {
        let state = self.tx_state(tx)?;
        let mut matches = Self::eval(&state.work, query, None);
        matches.sort_unstable();
        Ok(matches.first().map(|id| BackendHandle::new(*id)))
    }

    fn traverse_to_single(
        &self,
        tx: &mut Transaction,
        start: BackendHandle,
        query: &Query,
    ) -> Result<Option<BackendHandle>> {
        let state = self.tx_state(tx)?;
        let mut matches = Self::eval(&state.work, query, Some(start.value()));
        matches.sort_unstable();
        Ok(matches.first().map(|id| BackendHandle::new(*id)))
    }

    fn get_relationships(
        &self,
        tx: &mut Transaction,
        entity: BackendHandle,
        direction: Direction,
        name: Option<&str>,
    ) -> Result<Vec<BackendHandle>> {
        let state = self.tx_state(tx)?;
        let mut rels: Vec<u64> = state
            .work
            .incident_rels(entity.value(), direction)
            .into_iter()
            .filter(|rel_id| match state.work.elements.get(rel_id) {
                Some(Element::Relationship(rel)) => {
                    name.map(|n| rel.name == n).unwrap_or(true)
                }
                _ => false,
            })
            .collect();
        rels.sort_unstable();
        rels.dedup();
        Ok(rels.into_iter().map(BackendHandle::new).collect())
    }

    fn relationship_source(
        &self,
        tx: &mut Transaction,
        rel: BackendHandle,
    ) -> Result<BackendHandle> {
        let state = self.tx_state(tx)?;
        Ok(BackendHandle::new(state.work.relationship(rel.value())?.source))
    }

    fn relationship_target(
        &self,
        tx: &mut Transaction,
        rel: BackendHandle,
    ) -> Result<BackendHandle> {
        let state = self.tx_state(tx)?;
        Ok(BackendHandle::new(state.work.relationship(rel.value())?.target))
    }

    fn extract_canonical_path(
        &self,
        tx: &mut Transaction,
        element: BackendHandle,
    ) -> Result<CanonicalPath> {
        let state = self.tx_state(tx)?;
        Ok(state.work.entity(element.value())?.path.clone())
    }

    fn entity(&self, tx: &mut Transaction, element: BackendHandle) -> Result<Entity> {
        let state = self.tx_state(tx)?;
        let stored = state.work.entity(element.value())?;
        let mut entity = Entity::new(stored.path.clone());
        entity.properties = stored.properties.clone();
        entity.data = state
            .work
            .attached_data(element.value())
            .map(|(_, value)| value.clone());
        Ok(entity)
    }

    fn relationship(&self, tx: &mut Transaction, rel: BackendHandle) -> Result<Relationship> {
        let state = self.tx_state(tx)?;
        let stored = state.work.relationship(rel.value())?;
        let source = state.work.entity(stored.source)?.path.clone();
        let target = state.work.entity(stored.target)?.path.clone();
        let mut relationship =
            Relationship::new(stored.id.clone(), stored.name.clone(), source, target);
        relationship.properties = stored.properties.clone();
        Ok(relationship)
    }

    fn descend_to_data(
        &self,
        tx: &mut Transaction,
        owner: BackendHandle,
        steps: &[DataStep],
    ) -> Result<Option<StructuredData>> {
        let state = self.tx_state(tx)?;
        Ok(state
            .work
            .attached_data(owner.value())
            .and_then(|(_, value)| value.descend(steps))
            .cloned())
    }

    fn transitive_closure(
        &self,
        tx: &mut Transaction,
        start: BackendHandle,
        direction: Direction,
        names: &[String],
    ) -> Result<Vec<BackendHandle>> {
        let state = self.tx_state(tx)?;
        let work = &state.work;

        let mut visited: HashSet<u64> = HashSet::from([start.value()]);
        let mut queue: VecDeque<u64> = VecDeque::from([start.value()]);
        let mut out: Vec<u64> = Vec::new();

        while let Some(current) = queue.pop_front() {
            let mut neighbors: Vec<u64> = Vec::new();
            for rel_id in work.incident_rels(current, direction) {
                let Some(Element::Relationship(rel)) = work.elements.get(&rel_id) else {
                    continue;
                };
                if !names.is_empty() && !names.iter().any(|n| *n == rel.name) {
                    continue;
                }
                let neighbor = if rel.source == current { rel.target } else { rel.source };
                if matches!(work.elements.get(&neighbor), Some(Element::Entity(_))) {
                    neighbors.push(neighbor);
                }
            }
            neighbors.sort_unstable();
            for neighbor in neighbors {
                if visited.insert(neighbor) {
                    out.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        Ok(out.into_iter().map(BackendHandle::new).collect())
    }

    fn ensure_indices(&self, specs: &[IndexSpec]) -> Result<()> {
        // everything is a HashMap lookup already; hints are advisory
        debug!(count = specs.len(), "index hints ignored by memory backend");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::model::Blueprint;

    fn tenant_path(id: &str) -> CanonicalPath {
        CanonicalPath::of_tenant(id)
    }

    #[test]
    fn test_persist_find_commit_round_trip() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        let path = tenant_path("acme");
        backend
            .persist(&mut tx, &path, &Blueprint::new("acme"))
            .unwrap();
        backend.commit(tx).unwrap();

        let mut read = backend.begin().unwrap();
        let handle = backend.find(&mut read, &path).unwrap();
        let entity = backend.entity(&mut read, handle).unwrap();
        assert_eq!(entity.path, path);
        backend.rollback(read).unwrap();
    }

    #[test]
    fn test_uncommitted_writes_are_invisible() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        backend
            .persist(&mut tx, &tenant_path("acme"), &Blueprint::new("acme"))
            .unwrap();

        // a parallel transaction sees the old snapshot
        let mut other = backend.begin().unwrap();
        assert!(backend.find(&mut other, &tenant_path("acme")).is_err());

        backend.rollback(tx).unwrap();
        let mut after = backend.begin().unwrap();
        assert!(backend.find(&mut after, &tenant_path("acme")).is_err());
    }

    #[test]
    fn test_interleaved_commits_conflict() {
        let backend = MemoryBackend::new();
        let mut tx1 = backend.begin().unwrap();
        let mut tx2 = backend.begin().unwrap();

        backend
            .persist(&mut tx1, &tenant_path("a"), &Blueprint::new("a"))
            .unwrap();
        backend
            .persist(&mut tx2, &tenant_path("b"), &Blueprint::new("b"))
            .unwrap();

        backend.commit(tx1).unwrap();
        let result = backend.commit(tx2);
        assert!(matches!(result, Err(TrellisError::Conflict { .. })));
    }

    #[test]
    fn test_read_only_transactions_never_conflict() {
        let backend = MemoryBackend::new();
        let read = backend.begin().unwrap();

        let mut write = backend.begin().unwrap();
        backend
            .persist(&mut write, &tenant_path("a"), &Blueprint::new("a"))
            .unwrap();
        backend.commit(write).unwrap();

        // the older read-only transaction still commits cleanly
        backend.commit(read).unwrap();
    }

    #[test]
    fn test_duplicate_path_is_a_conflict() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        backend
            .persist(&mut tx, &tenant_path("acme"), &Blueprint::new("acme"))
            .unwrap();
        backend.commit(tx).unwrap();

        let mut again = backend.begin().unwrap();
        let result = backend.persist(&mut again, &tenant_path("acme"), &Blueprint::new("acme"));
        assert!(matches!(result, Err(TrellisError::Conflict { .. })));
    }

    #[test]
    fn test_delete_refuses_to_orphan_children() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        let tenant = backend
            .persist(&mut tx, &tenant_path("acme"), &Blueprint::new("acme"))
            .unwrap();
        let env_path = tenant_path("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap();
        let env = backend
            .persist(&mut tx, &env_path, &Blueprint::new("prod"))
            .unwrap();
        backend
            .relate(
                &mut tx,
                tenant,
                env,
                WellKnown::Contains.name(),
                &BTreeMap::new(),
            )
            .unwrap();

        let result = backend.delete(&mut tx, tenant);
        assert!(matches!(result, Err(TrellisError::Backend { .. })));

        // deleting the leaf first works, then the parent goes too
        backend.delete(&mut tx, env).unwrap();
        backend.delete(&mut tx, tenant).unwrap();
        backend.commit(tx).unwrap();
    }

    #[test]
    fn test_relationship_ids_are_deterministic() {
        assert_eq!(
            relationship_id("/t;a", "contains", "/t;a/e;b"),
            relationship_id("/t;a", "contains", "/t;a/e;b")
        );
        assert_ne!(
            relationship_id("/t;a", "contains", "/t;a/e;b"),
            relationship_id("/t;a", "owns", "/t;a/e;b")
        );
    }

    #[test]
    fn test_query_by_type_and_related_by() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        let tenant = backend
            .persist(&mut tx, &tenant_path("acme"), &Blueprint::new("acme"))
            .unwrap();
        for env_id in ["dev", "prod"] {
            let env_path = tenant_path("acme")
                .extend(ElementKind::Environment, env_id)
                .unwrap();
            let env = backend
                .persist(&mut tx, &env_path, &Blueprint::new(env_id))
                .unwrap();
            backend
                .relate(
                    &mut tx,
                    tenant,
                    env,
                    WellKnown::Contains.name(),
                    &BTreeMap::new(),
                )
                .unwrap();
        }

        let query = Query::path()
            .with(Filter::kind(ElementKind::Tenant))
            .with(Filter::id("acme"))
            .with(Filter::related_by(
                WellKnown::Contains.name(),
                Direction::Outgoing,
            ))
            .with(Filter::kind(ElementKind::Environment))
            .get();
        let page = backend.query(&mut tx, &query, &Pager::all()).unwrap();
        assert_eq!(page.total, 2);
        backend.rollback(tx).unwrap();
    }

    #[test]
    fn test_descend_to_data() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        let res_path = tenant_path("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap()
            .extend(ElementKind::Resource, "web")
            .unwrap()
            .extend(ElementKind::DataEntity, "configuration")
            .unwrap();
        let owner = backend
            .persist(&mut tx, &res_path, &Blueprint::new("configuration"))
            .unwrap();
        let value = StructuredData::from_json(&serde_json::json!({"a": [1, 2, 3]}));
        let data = backend.persist_data(&mut tx, &value).unwrap();
        backend
            .relate(
                &mut tx,
                owner,
                data,
                WellKnown::HasData.name(),
                &BTreeMap::new(),
            )
            .unwrap();

        let read = backend
            .descend_to_data(
                &mut tx,
                owner,
                &[DataStep::Key("a".to_string()), DataStep::Index(1)],
            )
            .unwrap();
        assert_eq!(read, Some(StructuredData::Integral(2)));

        let missing = backend
            .descend_to_data(&mut tx, owner, &[DataStep::Key("b".to_string())])
            .unwrap();
        assert_eq!(missing, None);
        backend.rollback(tx).unwrap();
    }

    #[test]
    fn test_transitive_closure() {
        let backend = MemoryBackend::new();
        let mut tx = backend.begin().unwrap();
        let tenant = backend
            .persist(&mut tx, &tenant_path("acme"), &Blueprint::new("acme"))
            .unwrap();
        let env_path = tenant_path("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap();
        let env = backend
            .persist(&mut tx, &env_path, &Blueprint::new("prod"))
            .unwrap();
        let res_path = env_path.extend(ElementKind::Resource, "web").unwrap();
        let res = backend
            .persist(&mut tx, &res_path, &Blueprint::new("web"))
            .unwrap();
        backend
            .relate(&mut tx, tenant, env, "contains", &BTreeMap::new())
            .unwrap();
        backend
            .relate(&mut tx, env, res, "contains", &BTreeMap::new())
            .unwrap();

        let closure = backend
            .transitive_closure(
                &mut tx,
                tenant,
                Direction::Outgoing,
                &["contains".to_string()],
            )
            .unwrap();
        assert_eq!(closure.len(), 2);
        backend.rollback(tx).unwrap();
    }
}
