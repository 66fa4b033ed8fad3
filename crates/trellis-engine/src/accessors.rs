//! Typed read/write accessors over traversal contexts
//!
//! Accessors are thin wrappers that turn a bound context into the read and
//! write operations legal at that position. Multi-result accessors expose no
//! mutation; writes require narrowing to a single position first.

use std::collections::BTreeMap;

use serde_json::Value;

use trellis_core::errors::{Result, TrellisError};
use trellis_core::model::{
    Blueprint, CanonicalPath, DataRole, DataStep, Direction, ElementKind, Entity, Relationship,
    StructuredData, Update,
};
use trellis_core::query::Filter;
use trellis_core::spi::{Page, Pager};

use crate::mutator::Mutator;
use crate::traversal::TraversalContext;

/// Read/write access to the entities of one kind at one position
pub struct EntityAccessor {
    ctx: TraversalContext,
}

impl EntityAccessor {
    pub(crate) fn new(ctx: TraversalContext) -> Self {
        Self { ctx }
    }

    /// Narrow to the entity with the given id
    pub fn get(&self, id: &str) -> EntitySingle {
        EntitySingle {
            ctx: self.ctx.narrow_id(id),
        }
    }

    /// All candidates at this position
    pub fn all(&self) -> EntityMultiple {
        EntityMultiple {
            ctx: self.ctx.clone(),
        }
    }

    /// Candidates restricted by an OR of AND-groups of filters
    pub fn get_all(&self, groups: Vec<Vec<Filter>>) -> EntityMultiple {
        EntityMultiple {
            ctx: self.ctx.narrow_where_all(groups),
        }
    }

    /// Create a new entity here and hand back its single accessor
    pub fn create(&self, blueprint: Blueprint) -> Result<EntitySingle> {
        let query = Mutator::new(&self.ctx).create(blueprint)?;
        Ok(EntitySingle {
            ctx: self.ctx.resolved_to(query, self.ctx.kind),
        })
    }

    pub fn update(&self, id: &str, update: Update) -> Result<()> {
        Mutator::new(&self.ctx).update(Some(id), update)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        Mutator::new(&self.ctx).delete(Some(id))
    }
}

/// A single resolved entity position
pub struct EntitySingle {
    ctx: TraversalContext,
}

impl EntitySingle {
    pub fn entity(&self) -> Result<Entity> {
        let select = self.ctx.select();
        self.ctx.in_read_tx(|tx| {
            let backend = self.ctx.backend.as_ref();
            let handle = backend.query_single(tx, &select)?.ok_or_else(|| {
                TrellisError::EntityNotFound {
                    path: select.to_string(),
                }
            })?;
            backend.entity(tx, handle)
        })
    }

    pub fn exists(&self) -> bool {
        let select = self.ctx.select();
        self.ctx
            .in_read_tx(|tx| self.ctx.backend.query_single(tx, &select))
            .map(|found| found.is_some())
            .unwrap_or(false)
    }

    pub fn path(&self) -> Result<CanonicalPath> {
        Ok(self.entity()?.path)
    }

    pub fn update(&self, update: Update) -> Result<()> {
        Mutator::new(&self.ctx).update(None, update)
    }

    pub fn delete(&self) -> Result<()> {
        Mutator::new(&self.ctx).delete(None)
    }

    /// Relationship access relative to this entity
    pub fn relationships(&self, direction: Direction) -> RelationshipAccessor {
        RelationshipAccessor {
            ctx: self.ctx.clone(),
            direction,
        }
    }

    // ----- typed children -----

    pub fn environments(&self) -> EntityAccessor {
        self.children(ElementKind::Environment)
    }

    pub fn resource_types(&self) -> EntityAccessor {
        self.children(ElementKind::ResourceType)
    }

    pub fn metric_types(&self) -> EntityAccessor {
        self.children(ElementKind::MetricType)
    }

    pub fn feeds(&self) -> EntityAccessor {
        self.children(ElementKind::Feed)
    }

    pub fn resources(&self) -> EntityAccessor {
        self.children(ElementKind::Resource)
    }

    pub fn metrics(&self) -> EntityAccessor {
        self.children(ElementKind::Metric)
    }

    /// Structured-data entities attached under this entity
    pub fn data(&self) -> DataAccessor {
        DataAccessor {
            inner: self.children(ElementKind::DataEntity),
        }
    }

    fn children(&self, kind: ElementKind) -> EntityAccessor {
        EntityAccessor::new(self.ctx.proceed_to(kind))
    }
}

/// A multi-result traversal; read-only by construction
pub struct EntityMultiple {
    ctx: TraversalContext,
}

impl EntityMultiple {
    /// One page of matching entities
    pub fn entities(&self, pager: &Pager) -> Result<Page<Entity>> {
        let select = self.ctx.select();
        self.ctx.in_read_tx(|tx| {
            let backend = self.ctx.backend.as_ref();
            let page = backend.query(tx, &select, pager)?;
            let total = page.total;
            let mut entities = Vec::with_capacity(page.len());
            for handle in page {
                entities.push(backend.entity(tx, handle)?);
            }
            Ok(Page::new(entities, total))
        })
    }
}

/// Role-keyed access to the structured data of one entity
pub struct DataAccessor {
    inner: EntityAccessor,
}

impl DataAccessor {
    pub fn get(&self, role: DataRole) -> DataSingle {
        DataSingle {
            inner: self.inner.get(role.name()),
        }
    }

    /// Attach a structured-data value under the owner, validating it
    /// against the role's schema if one exists
    pub fn create(&self, role: DataRole, value: StructuredData) -> Result<DataSingle> {
        let single = self.inner.create(Blueprint::of_data(role, value))?;
        Ok(DataSingle { inner: single })
    }

    pub fn update(&self, role: DataRole, value: StructuredData) -> Result<()> {
        self.inner.update(role.name(), Update::data(value))
    }

    pub fn delete(&self, role: DataRole) -> Result<()> {
        self.inner.delete(role.name())
    }
}

/// A single resolved data entity
pub struct DataSingle {
    inner: EntitySingle,
}

impl DataSingle {
    pub fn entity(&self) -> Result<Entity> {
        self.inner.entity()
    }

    /// The full structured-data value
    pub fn value(&self) -> Result<StructuredData> {
        Ok(self.inner.entity()?.data.unwrap_or(StructuredData::Undefined))
    }

    /// Part of the value, addressed by key/index steps
    pub fn value_at(&self, steps: &[DataStep]) -> Result<Option<StructuredData>> {
        let select = self.inner.ctx.select();
        self.inner.ctx.in_read_tx(|tx| {
            let backend = self.inner.ctx.backend.as_ref();
            let handle = backend.query_single(tx, &select)?.ok_or_else(|| {
                TrellisError::EntityNotFound {
                    path: select.to_string(),
                }
            })?;
            backend.descend_to_data(tx, handle, steps)
        })
    }

    /// The value without its children (containers come back empty)
    pub fn flat_value(&self) -> Result<StructuredData> {
        Ok(self.value()?.shallow())
    }

    pub fn update(&self, value: StructuredData) -> Result<()> {
        self.inner.update(Update::data(value))
    }

    pub fn delete(&self) -> Result<()> {
        self.inner.delete()
    }
}

impl std::fmt::Debug for DataSingle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSingle").finish_non_exhaustive()
    }
}

/// Relationship traversal and linking relative to one entity
pub struct RelationshipAccessor {
    ctx: TraversalContext,
    direction: Direction,
}

impl RelationshipAccessor {
    /// All relationships of this entity in the accessor's direction
    pub fn all(&self) -> Result<Vec<Relationship>> {
        self.list(None)
    }

    /// Relationships restricted to one name
    pub fn named(&self, name: &str) -> Result<Vec<Relationship>> {
        self.list(Some(name))
    }

    pub fn get(&self, id: &str) -> Result<Relationship> {
        self.all()?
            .into_iter()
            .find(|rel| rel.id == id)
            .ok_or_else(|| TrellisError::RelationshipNotFound { id: id.to_string() })
    }

    /// Create a user-declared relationship to the entity at `target`
    pub fn link(
        &self,
        name: &str,
        target: &CanonicalPath,
        properties: BTreeMap<String, Value>,
    ) -> Result<Relationship> {
        Mutator::new(&self.ctx).link(self.direction, name, target, properties)
    }

    /// Delete a user-declared relationship by id
    pub fn unlink(&self, id: &str) -> Result<()> {
        Mutator::new(&self.ctx).unlink(id)
    }

    fn list(&self, name: Option<&str>) -> Result<Vec<Relationship>> {
        let select = self.ctx.select();
        self.ctx.in_read_tx(|tx| {
            let backend = self.ctx.backend.as_ref();
            let origin = backend.query_single(tx, &select)?.ok_or_else(|| {
                TrellisError::EntityNotFound {
                    path: select.to_string(),
                }
            })?;
            let handles = backend.get_relationships(tx, origin, self.direction, name)?;
            let mut out = Vec::with_capacity(handles.len());
            for handle in handles {
                // edges into structured data carry no relationship value
                if let Ok(rel) = backend.relationship(tx, handle) {
                    out.push(rel);
                }
            }
            Ok(out)
        })
    }
}
