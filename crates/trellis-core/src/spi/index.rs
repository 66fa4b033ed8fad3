use serde::{Deserialize, Serialize};

use crate::model::ElementKind;

/// A hint that the backend should index elements of a kind by a property
///
/// Purely advisory: adapters without secondary indexes ignore these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub kind: ElementKind,
    pub property: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(kind: ElementKind, property: impl Into<String>) -> Self {
        Self {
            kind,
            property: property.into(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
