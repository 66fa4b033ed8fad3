//! Trellis Core - Inventory kernel
//!
//! This crate provides the foundational data structures and contracts for
//! the Trellis inventory store, including:
//! - Canonical/relative path addressing with the legal nesting grammar
//! - Entity, relationship and structured-data models
//! - The backend-independent query/filter composition language
//! - The storage SPI every backend adapter implements
//! - Relationship legality rules
//! - Configuration, error taxonomy and the logging facility
//!
//! The transactional mutation engine and the inventory facade live in
//! `trellis-engine`; the in-memory reference backend lives in
//! `trellis-store`.

pub mod config;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod rules;
pub mod spi;

// Re-export commonly used types
pub use config::Configuration;
pub use errors::{Result, TrError, TrErrorKind, TrellisError, ValidationFinding};
pub use model::{
    Blueprint, CanonicalPath, DataRole, DataStep, Direction, ElementKind, Entity, Relationship,
    RelativePath, StructuredData, Update, WellKnown,
};
pub use query::{Filter, Query};
pub use rules::RelationshipRules;
pub use spi::{
    Action, BackendHandle, IndexSpec, InventoryBackend, Page, Pager, PendingNotification,
    Transaction,
};
