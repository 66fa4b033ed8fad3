use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{CanonicalPath, Direction, ElementKind};

/// A declarative predicate interpreted by the backend, never executed
/// in-core. This is what keeps the core storage-engine-independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Match elements with the given id
    WithId(String),

    /// Match elements of the given kind
    WithType(ElementKind),

    /// Match elements with the given property value
    WithProperty { name: String, value: Value },

    /// Move across relationships of the given name in the given direction,
    /// relative to the current traversal position
    RelatedBy { name: String, direction: Direction },

    /// Resolve directly to one known canonical path
    At(CanonicalPath),
}

impl Filter {
    pub fn id(id: impl Into<String>) -> Self {
        Filter::WithId(id.into())
    }

    pub fn kind(kind: ElementKind) -> Self {
        Filter::WithType(kind)
    }

    pub fn property(name: impl Into<String>, value: Value) -> Self {
        Filter::WithProperty {
            name: name.into(),
            value,
        }
    }

    pub fn related_by(name: impl Into<String>, direction: Direction) -> Self {
        Filter::RelatedBy {
            name: name.into(),
            direction,
        }
    }

    pub fn at(path: CanonicalPath) -> Self {
        Filter::At(path)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::WithId(id) => write!(f, "id={}", id),
            Filter::WithType(kind) => write!(f, "type={}", kind),
            Filter::WithProperty { name, value } => write!(f, "property[{}={}]", name, value),
            Filter::RelatedBy { name, direction } => {
                write!(f, "related[{} {:?}]", name, direction)
            }
            Filter::At(path) => write!(f, "at={}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Filter::id("abc"), Filter::WithId("abc".to_string()));
        assert_eq!(
            Filter::kind(ElementKind::Feed),
            Filter::WithType(ElementKind::Feed)
        );
    }

    #[test]
    fn test_display() {
        let rendered = Filter::related_by("contains", Direction::Outgoing).to_string();
        assert!(rendered.contains("contains"));
    }
}
