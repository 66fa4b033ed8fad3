//! Canonical and relative path addressing
//!
//! A canonical path is the sole stable primary key of an inventory entity:
//! an absolute, typed sequence of (kind, id) segments rooted at a tenant.
//! Paths are persistent values; extension yields a new path and never
//! mutates in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrellisError};
use crate::model::data::DataRole;
use crate::model::entity::ElementKind;

/// One (kind, id) step of a canonical path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub kind: ElementKind,
    pub id: String,
}

impl Segment {
    pub fn new(kind: ElementKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// The legal nesting grammar:
/// `tenant → [environment | resourceType | metricType] → [feed] → [resource]* → dataEntity-role`
///
/// Returns the child kinds legal under `parent` (`None` means the root).
pub fn legal_children(parent: Option<ElementKind>) -> &'static [ElementKind] {
    match parent {
        None => &[ElementKind::Tenant],
        Some(ElementKind::Tenant) => &[
            ElementKind::Environment,
            ElementKind::ResourceType,
            ElementKind::MetricType,
        ],
        Some(ElementKind::Environment) => &[
            ElementKind::Feed,
            ElementKind::Resource,
            ElementKind::Metric,
        ],
        Some(ElementKind::Feed) => &[ElementKind::Resource, ElementKind::Metric],
        Some(ElementKind::Resource) => &[ElementKind::Resource, ElementKind::DataEntity],
        Some(ElementKind::ResourceType) => &[ElementKind::DataEntity],
        Some(ElementKind::MetricType)
        | Some(ElementKind::Metric)
        | Some(ElementKind::DataEntity)
        | Some(ElementKind::Relationship) => &[],
    }
}

/// Absolute, typed, hierarchical identifier of an entity from the tenant root
///
/// Equality and hashing are structural: two canonical paths are equal iff
/// every segment matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CanonicalPath {
    segments: Vec<Segment>,
}

impl CanonicalPath {
    /// The empty root path; only tenants extend it
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Shorthand for `root().extend(Tenant, id)`, which can never fail
    pub fn of_tenant(id: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::new(ElementKind::Tenant, id)],
        }
    }

    /// Append one legally-typed segment, yielding a new path
    ///
    /// # Errors
    ///
    /// Returns `InvalidPathKind` if `kind` is not legal at this nesting depth.
    pub fn extend(&self, kind: ElementKind, id: impl Into<String>) -> Result<Self> {
        if !legal_children(self.target_kind()).contains(&kind) {
            return Err(TrellisError::InvalidPathKind {
                kind,
                under: match self.target_kind() {
                    Some(k) => k.to_string(),
                    None => "root".to_string(),
                },
            });
        }
        let mut segments = self.segments.clone();
        segments.push(Segment::new(kind, id));
        Ok(Self { segments })
    }

    /// The path one level up, or `None` for the root
    pub fn up(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Kind of the addressed entity, `None` for the root
    pub fn target_kind(&self) -> Option<ElementKind> {
        self.segments.last().map(|s| s.kind)
    }

    /// Id of the addressed entity, `None` for the root
    pub fn target_id(&self) -> Option<&str> {
        self.segments.last().map(|s| s.id.as_str())
    }

    /// Whether `other` is this path extended by one or more segments
    pub fn is_parent_of(&self, other: &CanonicalPath) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Typed accessor over the id components of this path
    pub fn ids(&self) -> PathIds<'_> {
        PathIds { path: self }
    }

    fn find_id(&self, kind: ElementKind) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.id.as_str())
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{};{}", segment.kind.short_name(), segment.id)?;
        }
        Ok(())
    }
}

impl FromStr for CanonicalPath {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self> {
        let parse_err = |reason: &str| TrellisError::PathParse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if !s.starts_with('/') {
            return Err(parse_err("path must be absolute"));
        }
        let mut path = CanonicalPath::root();
        for chunk in s[1..].split('/') {
            if chunk.is_empty() {
                continue;
            }
            let (prefix, id) = chunk
                .split_once(';')
                .ok_or_else(|| parse_err("segment must be '<type>;<id>'"))?;
            let kind = ElementKind::from_short_name(prefix)
                .ok_or_else(|| parse_err("unknown segment type"))?;
            if id.is_empty() {
                return Err(parse_err("segment id must not be empty"));
            }
            path = path.extend(kind, id)?;
        }
        Ok(path)
    }
}

/// Extracts the well-known id components of a canonical path, returning
/// `None` for levels the path does not reach.
pub struct PathIds<'a> {
    path: &'a CanonicalPath,
}

impl PathIds<'_> {
    pub fn tenant_id(&self) -> Option<&str> {
        self.path.find_id(ElementKind::Tenant)
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.path.find_id(ElementKind::Environment)
    }

    pub fn feed_id(&self) -> Option<&str> {
        self.path.find_id(ElementKind::Feed)
    }

    pub fn resource_type_id(&self) -> Option<&str> {
        self.path.find_id(ElementKind::ResourceType)
    }

    pub fn metric_type_id(&self) -> Option<&str> {
        self.path.find_id(ElementKind::MetricType)
    }

    /// Id of the innermost resource segment (resources may nest)
    pub fn resource_id(&self) -> Option<&str> {
        self.path
            .segments
            .iter()
            .rev()
            .find(|s| s.kind == ElementKind::Resource)
            .map(|s| s.id.as_str())
    }

    pub fn metric_id(&self) -> Option<&str> {
        self.path.find_id(ElementKind::Metric)
    }

    /// The data role, when the path addresses a data entity
    pub fn data_role(&self) -> Option<DataRole> {
        self.path
            .segments
            .last()
            .filter(|s| s.kind == ElementKind::DataEntity)
            .and_then(|s| DataRole::from_name(&s.id))
    }
}

/// One step of a relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelSegment {
    /// Go to the parent of the current position
    Up,
    /// Descend into a typed child
    Down(Segment),
}

/// A path expressed relative to an unspecified origin
///
/// Resolved against a concrete origin via [`RelativePath::apply_to`]. The
/// grammar is only checkable at resolution time, so construction never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct RelativePath {
    segments: Vec<RelSegment>,
}

impl RelativePath {
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Append an "up one level" step
    pub fn up(mut self) -> Self {
        self.segments.push(RelSegment::Up);
        self
    }

    /// Append a descent into `(kind, id)`
    pub fn down(mut self, kind: ElementKind, id: impl Into<String>) -> Self {
        self.segments.push(RelSegment::Down(Segment::new(kind, id)));
        self
    }

    /// Concatenate another relative path after this one
    pub fn then(mut self, other: RelativePath) -> Self {
        self.segments.extend(other.segments);
        self
    }

    pub fn segments(&self) -> &[RelSegment] {
        &self.segments
    }

    /// Resolve this relative path against a concrete origin
    ///
    /// # Errors
    ///
    /// * `PathAscendsAboveRoot` - an `Up` step walked above the empty root
    /// * `InvalidPathKind` - a descent violates the nesting grammar
    pub fn apply_to(&self, origin: &CanonicalPath) -> Result<CanonicalPath> {
        let mut current = origin.clone();
        for segment in &self.segments {
            match segment {
                RelSegment::Up => {
                    current = current.up().ok_or_else(|| {
                        TrellisError::PathAscendsAboveRoot {
                            origin: origin.to_string(),
                        }
                    })?;
                }
                RelSegment::Down(seg) => {
                    current = current.extend(seg.kind, seg.id.clone())?;
                }
            }
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_path() -> CanonicalPath {
        CanonicalPath::of_tenant("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap()
    }

    #[test]
    fn test_extend_follows_grammar() {
        let path = env_path();
        assert_eq!(path.target_kind(), Some(ElementKind::Environment));
        assert_eq!(path.ids().tenant_id(), Some("acme"));
        assert_eq!(path.ids().environment_id(), Some("prod"));
        assert_eq!(path.ids().feed_id(), None);
    }

    #[test]
    fn test_extend_rejects_illegal_kind() {
        let result = env_path().extend(ElementKind::Environment, "nested");
        assert!(matches!(
            result,
            Err(TrellisError::InvalidPathKind { .. })
        ));

        // only tenants are legal at the root
        let result = CanonicalPath::root().extend(ElementKind::Resource, "r");
        assert!(matches!(
            result,
            Err(TrellisError::InvalidPathKind { .. })
        ));
    }

    #[test]
    fn test_nested_resources_are_legal() {
        let nested = env_path()
            .extend(ElementKind::Resource, "host")
            .unwrap()
            .extend(ElementKind::Resource, "disk")
            .unwrap();
        assert_eq!(nested.ids().resource_id(), Some("disk"));
    }

    #[test]
    fn test_display_round_trip() {
        let path = env_path().extend(ElementKind::Resource, "web-1").unwrap();
        let rendered = path.to_string();
        assert_eq!(rendered, "/t;acme/e;prod/r;web-1");
        let parsed: CanonicalPath = rendered.parse().unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("t;acme".parse::<CanonicalPath>().is_err());
        assert!("/x;what".parse::<CanonicalPath>().is_err());
        assert!("/t;".parse::<CanonicalPath>().is_err());
        // grammar applies when parsing too
        assert!("/r;orphan".parse::<CanonicalPath>().is_err());
    }

    #[test]
    fn test_structural_equality() {
        let a = env_path();
        let b = CanonicalPath::of_tenant("acme")
            .extend(ElementKind::Environment, "prod")
            .unwrap();
        assert_eq!(a, b);
        let c = CanonicalPath::of_tenant("acme")
            .extend(ElementKind::Environment, "staging")
            .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_is_parent_of() {
        let tenant = CanonicalPath::of_tenant("acme");
        let env = env_path();
        assert!(tenant.is_parent_of(&env));
        assert!(!env.is_parent_of(&tenant));
        assert!(!env.is_parent_of(&env));
    }

    #[test]
    fn test_relative_path_resolution() {
        let resource = env_path().extend(ElementKind::Resource, "web-1").unwrap();
        let data = resource
            .extend(ElementKind::DataEntity, "configuration")
            .unwrap();

        // "up one level, then into the sibling schema role"
        let to_schema = RelativePath::empty()
            .up()
            .down(ElementKind::DataEntity, "configurationSchema");
        let schema_path = to_schema.apply_to(&data).unwrap();
        assert_eq!(
            schema_path,
            resource
                .extend(ElementKind::DataEntity, "configurationSchema")
                .unwrap()
        );
    }

    #[test]
    fn test_relative_path_cannot_ascend_above_root() {
        let rel = RelativePath::empty().up().up();
        let result = rel.apply_to(&CanonicalPath::of_tenant("acme"));
        assert!(matches!(
            result,
            Err(TrellisError::PathAscendsAboveRoot { .. })
        ));
    }

    #[test]
    fn test_relative_path_descent_checks_grammar() {
        let rel = RelativePath::empty().down(ElementKind::Feed, "f1");
        let result = rel.apply_to(&CanonicalPath::of_tenant("acme"));
        assert!(matches!(
            result,
            Err(TrellisError::InvalidPathKind { .. })
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        // Generate relative paths that stay within the resource sub-tree so
        // composition exercises both ups and legal descents.
        fn arb_rel() -> impl Strategy<Value = RelativePath> {
            prop::collection::vec(prop_oneof![Just(true), Just(false)], 0..4).prop_map(
                |steps| {
                    let mut rel = RelativePath::empty();
                    for (i, down) in steps.into_iter().enumerate() {
                        rel = if down {
                            rel.down(ElementKind::Resource, format!("r{}", i))
                        } else {
                            rel.up()
                        };
                    }
                    rel
                },
            )
        }

        proptest! {
            // Resolving `a.then(b)` equals resolving `a`, then resolving `b`
            // against the result, whenever either side resolves at all.
            #[test]
            fn apply_to_composes(a in arb_rel(), b in arb_rel()) {
                let origin = CanonicalPath::of_tenant("t")
                    .extend(ElementKind::Environment, "e").unwrap()
                    .extend(ElementKind::Resource, "base").unwrap();

                let composed = a.clone().then(b.clone()).apply_to(&origin);
                let sequential = a
                    .apply_to(&origin)
                    .and_then(|mid| b.apply_to(&mid));

                match (composed, sequential) {
                    (Ok(x), Ok(y)) => prop_assert_eq!(x, y),
                    (Err(_), Err(_)) => {}
                    (x, y) => prop_assert!(false, "divergence: {:?} vs {:?}", x, y),
                }
            }
        }
    }
}
