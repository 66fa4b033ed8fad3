//! Legality checks for user-declared relationships
//!
//! This is the single policy chokepoint: the mutation engine never persists
//! a custom edge without passing through [`RelationshipRules::check_create`].
//! The implicit structural edges (`contains`, `hasData`) are created by the
//! core itself and are never subject to these rules.

use std::sync::OnceLock;

use crate::errors::{Result, TrellisError};
use crate::model::{Direction, ElementKind, WellKnown};
use crate::spi::{BackendHandle, InventoryBackend, Transaction};

/// Kind constraints for one well-known relationship name
#[derive(Debug, Clone)]
struct NameRule {
    name: &'static str,
    /// Legal (source kind, target kind) pairs
    allowed: &'static [(ElementKind, ElementKind)],
    /// Whether a target may carry at most one incoming edge of this name
    singular_target: bool,
}

/// The immutable relationship policy table, assembled once
#[derive(Debug, Clone)]
pub struct RelationshipRules {
    rules: Vec<NameRule>,
}

impl RelationshipRules {
    /// The standard policy table
    pub fn standard() -> &'static RelationshipRules {
        static STANDARD: OnceLock<RelationshipRules> = OnceLock::new();
        STANDARD.get_or_init(|| RelationshipRules {
            rules: vec![
                NameRule {
                    name: WellKnown::Defines.name(),
                    allowed: &[
                        (ElementKind::ResourceType, ElementKind::Resource),
                        (ElementKind::MetricType, ElementKind::Metric),
                    ],
                    singular_target: true,
                },
                NameRule {
                    name: WellKnown::Owns.name(),
                    allowed: &[
                        (ElementKind::Resource, ElementKind::Metric),
                        (ElementKind::ResourceType, ElementKind::MetricType),
                    ],
                    singular_target: false,
                },
            ],
        })
    }

    /// Approve or reject a proposed relationship before it is persisted
    ///
    /// `direction` is relative to `origin`: `Outgoing` proposes
    /// `origin -name-> other`, `Incoming` proposes `other -name-> origin`.
    ///
    /// # Errors
    ///
    /// Returns `IllegalRelationship` when the name is reserved, the kinds
    /// are incompatible with the name, or the edge would be the second one
    /// of an already-singular relationship.
    pub fn check_create(
        &self,
        backend: &dyn InventoryBackend,
        tx: &mut Transaction,
        origin: BackendHandle,
        direction: Direction,
        name: &str,
        other: BackendHandle,
    ) -> Result<()> {
        let origin_path = backend.extract_canonical_path(tx, origin)?;
        let other_path = backend.extract_canonical_path(tx, other)?;

        let (source_path, target, target_path) = match direction {
            Direction::Outgoing | Direction::Both => (&origin_path, other, &other_path),
            Direction::Incoming => (&other_path, origin, &origin_path),
        };

        let illegal = |reason: &str| TrellisError::IllegalRelationship {
            name: name.to_string(),
            source_path: source_path.to_string(),
            target_path: target_path.to_string(),
            reason: reason.to_string(),
        };

        if WellKnown::is_structural(name) {
            return Err(illegal("name is reserved for implicit structural edges"));
        }

        let Some(rule) = self.rules.iter().find(|r| r.name == name) else {
            // custom names carry no kind policy
            return Ok(());
        };

        let source_kind = source_path.target_kind();
        let target_kind = target_path.target_kind();
        let pair_allowed = match (source_kind, target_kind) {
            (Some(s), Some(t)) => rule.allowed.contains(&(s, t)),
            _ => false,
        };
        if !pair_allowed {
            return Err(illegal("target kind incompatible with relationship name"));
        }

        if rule.singular_target {
            let existing =
                backend.get_relationships(tx, target, Direction::Incoming, Some(name))?;
            if !existing.is_empty() {
                return Err(illegal(
                    "would create a second edge of an already-singular relationship",
                ));
            }
        }

        Ok(())
    }

    /// Approve or reject deleting an existing relationship
    ///
    /// # Errors
    ///
    /// Returns `IllegalRelationship` for structural edges, which only the
    /// core may remove.
    pub fn check_delete(
        &self,
        backend: &dyn InventoryBackend,
        tx: &mut Transaction,
        rel: BackendHandle,
    ) -> Result<()> {
        let relationship = backend.relationship(tx, rel)?;
        if WellKnown::is_structural(&relationship.name) {
            return Err(TrellisError::IllegalRelationship {
                name: relationship.name.clone(),
                source_path: relationship.source.to_string(),
                target_path: relationship.target.to_string(),
                reason: "structural edges cannot be deleted".to_string(),
            });
        }
        Ok(())
    }
}
