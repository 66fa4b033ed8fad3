//! Domain model: paths, entities, relationships, structured data

pub mod data;
pub mod entity;
pub mod path;
pub mod relationship;

pub use data::{DataRole, DataStep, StructuredData};
pub use entity::{Blueprint, ElementKind, Entity, Update};
pub use path::{CanonicalPath, RelSegment, RelativePath, Segment};
pub use relationship::{Direction, Relationship, WellKnown};
