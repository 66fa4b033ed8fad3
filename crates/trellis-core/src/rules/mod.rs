//! Relationship legality policy

pub mod relationship_rules;

pub use relationship_rules::RelationshipRules;
