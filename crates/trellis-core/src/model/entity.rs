use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::data::{DataRole, StructuredData};
use crate::model::path::CanonicalPath;

/// The kinds of addressable inventory elements
///
/// Every kind except `Relationship` can appear as a canonical path segment;
/// relationships are addressed by their synthetic id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Tenant,
    Environment,
    Feed,
    ResourceType,
    MetricType,
    Resource,
    Metric,
    DataEntity,
    Relationship,
}

impl ElementKind {
    /// The short segment prefix used in rendered paths (`/t;acme/e;prod`)
    pub fn short_name(&self) -> &'static str {
        match self {
            ElementKind::Tenant => "t",
            ElementKind::Environment => "e",
            ElementKind::Feed => "f",
            ElementKind::ResourceType => "rt",
            ElementKind::MetricType => "mt",
            ElementKind::Resource => "r",
            ElementKind::Metric => "m",
            ElementKind::DataEntity => "d",
            ElementKind::Relationship => "rl",
        }
    }

    pub fn from_short_name(s: &str) -> Option<Self> {
        match s {
            "t" => Some(ElementKind::Tenant),
            "e" => Some(ElementKind::Environment),
            "f" => Some(ElementKind::Feed),
            "rt" => Some(ElementKind::ResourceType),
            "mt" => Some(ElementKind::MetricType),
            "r" => Some(ElementKind::Resource),
            "m" => Some(ElementKind::Metric),
            "d" => Some(ElementKind::DataEntity),
            "rl" => Some(ElementKind::Relationship),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementKind::Tenant => "tenant",
            ElementKind::Environment => "environment",
            ElementKind::Feed => "feed",
            ElementKind::ResourceType => "resourceType",
            ElementKind::MetricType => "metricType",
            ElementKind::Resource => "resource",
            ElementKind::Metric => "metric",
            ElementKind::DataEntity => "dataEntity",
            ElementKind::Relationship => "relationship",
        };
        write!(f, "{}", name)
    }
}

/// An inventory entity
///
/// Identified solely by its canonical path; there is no secondary identity.
/// Data entities additionally carry their structured-data value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical path of this entity (the primary key)
    pub path: CanonicalPath,

    /// String-keyed property map
    pub properties: BTreeMap<String, Value>,

    /// Structured-data payload, populated for data entities only
    pub data: Option<StructuredData>,
}

impl Entity {
    pub fn new(path: CanonicalPath) -> Self {
        Self {
            path,
            properties: BTreeMap::new(),
            data: None,
        }
    }

    /// Kind of this entity, derived from its path
    pub fn kind(&self) -> Option<ElementKind> {
        self.path.target_kind()
    }

    /// Id of this entity, derived from its path
    pub fn id(&self) -> Option<&str> {
        self.path.target_id()
    }
}

/// Creation payload for a not-yet-created entity
///
/// Carries the proposed id, initial properties, optionally a structured-data
/// value (data entities only), and custom relationships to pre-declare. The
/// declared relationship targets are resolved inside the creation
/// transaction; an unresolvable target fails the whole creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub properties: BTreeMap<String, Value>,
    /// name -> target paths for edges pointing away from the new entity
    pub outgoing: BTreeMap<String, Vec<CanonicalPath>>,
    /// name -> source paths for edges pointing at the new entity
    pub incoming: BTreeMap<String, Vec<CanonicalPath>>,
    /// Structured-data value; only meaningful for data entities
    pub data: Option<StructuredData>,
}

impl Blueprint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            data: None,
        }
    }

    /// Blueprint for a data entity; the proposed id is the role name
    pub fn of_data(role: DataRole, value: StructuredData) -> Self {
        let mut blueprint = Self::new(role.name());
        blueprint.data = Some(value);
        blueprint
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_outgoing(mut self, name: impl Into<String>, target: CanonicalPath) -> Self {
        self.outgoing.entry(name.into()).or_default().push(target);
        self
    }

    pub fn with_incoming(mut self, name: impl Into<String>, source: CanonicalPath) -> Self {
        self.incoming.entry(name.into()).or_default().push(source);
        self
    }
}

/// Partial mutation payload for an existing entity
///
/// `properties`, when present, replaces the entity's property map.
/// `data`, when present, replaces a data entity's structured value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Update {
    pub properties: Option<BTreeMap<String, Value>>,
    pub data: Option<StructuredData>,
}

impl Update {
    pub fn properties(properties: BTreeMap<String, Value>) -> Self {
        Self {
            properties: Some(properties),
            data: None,
        }
    }

    pub fn data(value: StructuredData) -> Self {
        Self {
            properties: None,
            data: Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_kind_and_id_follow_path() {
        let path = CanonicalPath::of_tenant("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap();
        let entity = Entity::new(path);
        assert_eq!(entity.kind(), Some(ElementKind::Environment));
        assert_eq!(entity.id(), Some("prod"));
    }

    #[test]
    fn test_blueprint_builder() {
        let target = CanonicalPath::of_tenant("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap();
        let blueprint = Blueprint::new("web-1")
            .with_property("os", json!("linux"))
            .with_outgoing("monitoredBy", target.clone());

        assert_eq!(blueprint.id, "web-1");
        assert_eq!(blueprint.properties.get("os"), Some(&json!("linux")));
        assert_eq!(blueprint.outgoing.get("monitoredBy"), Some(&vec![target]));
    }

    #[test]
    fn test_data_blueprint_id_is_role_name() {
        let blueprint = Blueprint::of_data(DataRole::Configuration, StructuredData::Undefined);
        assert_eq!(blueprint.id, "configuration");
        assert!(blueprint.data.is_some());
    }

    #[test]
    fn test_short_name_round_trip() {
        for kind in [
            ElementKind::Tenant,
            ElementKind::Environment,
            ElementKind::Feed,
            ElementKind::ResourceType,
            ElementKind::MetricType,
            ElementKind::Resource,
            ElementKind::Metric,
            ElementKind::DataEntity,
            ElementKind::Relationship,
        ] {
            assert_eq!(ElementKind::from_short_name(kind.short_name()), Some(kind));
        }
    }
}
