use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::path::CanonicalPath;

/// The list of well-known relationships (aka edges) between entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WellKnown {
    /// Expresses encapsulation of a set of entities in another entity.
    /// Used for example to express the relationship between a tenant and the
    /// set of its environments. Created automatically for every non-tenant
    /// entity and never user-creatable.
    Contains,

    /// Expresses "instantiation" of some entity based on the definition
    /// provided by the source entity. For example, there is a defines
    /// relationship between a resource type and all resources that conform
    /// to it.
    Defines,

    /// Expresses ownership. For example a resource owns a set of metrics.
    /// They do not contain them though, because more resources can own a
    /// single metric.
    Owns,

    /// Connects an entity to its structured-data value. Implicit and never
    /// user-creatable.
    HasData,
}

impl WellKnown {
    pub fn name(&self) -> &'static str {
        match self {
            WellKnown::Contains => "contains",
            WellKnown::Defines => "defines",
            WellKnown::Owns => "owns",
            WellKnown::HasData => "hasData",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contains" => Some(WellKnown::Contains),
            "defines" => Some(WellKnown::Defines),
            "owns" => Some(WellKnown::Owns),
            "hasData" => Some(WellKnown::HasData),
            _ => None,
        }
    }

    /// Whether the name is reserved for structural edges the core creates
    /// itself; such edges bypass relationship rules and may never be created
    /// or deleted through the public surface.
    pub fn is_structural(name: &str) -> bool {
        matches!(
            Self::from_name(name),
            Some(WellKnown::Contains) | Some(WellKnown::HasData)
        )
    }
}

impl std::fmt::Display for WellKnown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Direction of a relationship relative to the current traversal position.
/// Relationships themselves are never bidirectional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Relationships that have the current position as their source
    Outgoing,
    /// Relationships that have the current position as their target
    Incoming,
    /// All relationships the current position participates in
    Both,
}

/// A directed, named edge between two entities
///
/// Carries its own property map and its own synthetic id; the id is the only
/// way a relationship is addressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub name: String,
    pub source: CanonicalPath,
    pub target: CanonicalPath,
    pub properties: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source: CanonicalPath,
        target: CanonicalPath,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source,
            target,
            properties: BTreeMap::new(),
        }
    }
}
