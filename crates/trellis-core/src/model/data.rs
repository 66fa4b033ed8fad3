//! Structured data attached to inventory entities
//!
//! A structured-data value is a recursive tree of four scalar kinds, ordered
//! lists and string-keyed maps, plus an explicit `Undefined` variant used
//! when a value does not exist. Values are attached to their owning entity
//! through the implicit `hasData` relationship and addressed by role.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::model::entity::ElementKind;
use crate::model::path::RelativePath;

/// A recursive, schema-validatable value tree
///
/// Equality is structural. Map keys are order-irrelevant (kept sorted);
/// list order is significant.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredData {
    Undefined,
    Bool(bool),
    Integral(i64),
    FloatingPoint(f64),
    Str(String),
    List(Vec<StructuredData>),
    Map(BTreeMap<String, StructuredData>),
}

impl StructuredData {
    /// Human-readable kind name, used in validation findings
    pub fn kind_name(&self) -> &'static str {
        match self {
            StructuredData::Undefined => "undefined",
            StructuredData::Bool(_) => "boolean",
            StructuredData::Integral(_) => "integer",
            StructuredData::FloatingPoint(_) => "number",
            StructuredData::Str(_) => "string",
            StructuredData::List(_) => "list",
            StructuredData::Map(_) => "map",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, StructuredData::Undefined)
    }

    /// Convert to the JSON representation; `Undefined` maps to JSON null
    pub fn to_json(&self) -> Value {
        match self {
            StructuredData::Undefined => Value::Null,
            StructuredData::Bool(b) => Value::Bool(*b),
            StructuredData::Integral(i) => Value::from(*i),
            StructuredData::FloatingPoint(f) => {
                serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)
            }
            StructuredData::Str(s) => Value::String(s.clone()),
            StructuredData::List(items) => {
                Value::Array(items.iter().map(StructuredData::to_json).collect())
            }
            StructuredData::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Build from a JSON value; null maps to `Undefined`
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => StructuredData::Undefined,
            Value::Bool(b) => StructuredData::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    StructuredData::Integral(i)
                } else {
                    StructuredData::FloatingPoint(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => StructuredData::Str(s.clone()),
            Value::Array(items) => {
                StructuredData::List(items.iter().map(StructuredData::from_json).collect())
            }
            Value::Object(entries) => StructuredData::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), StructuredData::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// SHA-256 digest of the canonical JSON rendering, hex-encoded
    ///
    /// Map keys are sorted, so structurally equal values digest equally.
    pub fn digest(&self) -> String {
        let rendered = self.to_json().to_string();
        let mut hasher = Sha256::new();
        hasher.update(rendered.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// This node with child values pruned (containers come back empty)
    pub fn shallow(&self) -> Self {
        match self {
            StructuredData::List(_) => StructuredData::List(Vec::new()),
            StructuredData::Map(_) => StructuredData::Map(BTreeMap::new()),
            other => other.clone(),
        }
    }

    /// Descend into the value tree by key/index steps
    ///
    /// Returns `None` when a step does not match the shape of the value.
    pub fn descend(&self, steps: &[DataStep]) -> Option<&StructuredData> {
        let mut current = self;
        for step in steps {
            current = match (step, current) {
                (DataStep::Key(k), StructuredData::Map(entries)) => entries.get(k)?,
                (DataStep::Index(i), StructuredData::List(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl Serialize for StructuredData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StructuredData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| StructuredData::from_json(&v))
    }
}

impl From<bool> for StructuredData {
    fn from(v: bool) -> Self {
        StructuredData::Bool(v)
    }
}

impl From<i64> for StructuredData {
    fn from(v: i64) -> Self {
        StructuredData::Integral(v)
    }
}

impl From<f64> for StructuredData {
    fn from(v: f64) -> Self {
        StructuredData::FloatingPoint(v)
    }
}

impl From<&str> for StructuredData {
    fn from(v: &str) -> Self {
        StructuredData::Str(v.to_string())
    }
}

/// One step of a descent inside a structured value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataStep {
    Key(String),
    Index(usize),
}

/// Role of a data entity, scoped to its owning entity
///
/// A role whose payload *is* a schema is exempt from schema lookup; all
/// other roles designate the sibling schema role their payloads are
/// validated against, if such a sibling exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRole {
    Configuration,
    ConnectionConfiguration,
    ConfigurationSchema,
    ConnectionConfigurationSchema,
}

impl DataRole {
    pub fn name(&self) -> &'static str {
        match self {
            DataRole::Configuration => "configuration",
            DataRole::ConnectionConfiguration => "connectionConfiguration",
            DataRole::ConfigurationSchema => "configurationSchema",
            DataRole::ConnectionConfigurationSchema => "connectionConfigurationSchema",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "configuration" => Some(DataRole::Configuration),
            "connectionConfiguration" => Some(DataRole::ConnectionConfiguration),
            "configurationSchema" => Some(DataRole::ConfigurationSchema),
            "connectionConfigurationSchema" => Some(DataRole::ConnectionConfigurationSchema),
            _ => None,
        }
    }

    /// Whether payloads of this role are themselves schema documents
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            DataRole::ConfigurationSchema | DataRole::ConnectionConfigurationSchema
        )
    }

    /// The role holding the schema that payloads of this role validate
    /// against; `None` for schema roles themselves
    pub fn schema_role(&self) -> Option<DataRole> {
        match self {
            DataRole::Configuration => Some(DataRole::ConfigurationSchema),
            DataRole::ConnectionConfiguration => Some(DataRole::ConnectionConfigurationSchema),
            DataRole::ConfigurationSchema | DataRole::ConnectionConfigurationSchema => None,
        }
    }

    /// Relative path from a data entity of this role to its schema entity
    pub fn navigate_to_schema(&self) -> Option<RelativePath> {
        self.schema_role().map(|schema| {
            RelativePath::empty()
                .up()
                .down(ElementKind::DataEntity, schema.name())
        })
    }
}

impl std::fmt::Display for DataRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
