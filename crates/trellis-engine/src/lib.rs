//! Trellis Engine - The base inventory implementation
//!
//! Turns the contracts of `trellis-core` into a working inventory over any
//! backend adapter:
//! - Traversal contexts and typed per-kind accessors
//! - The transactional create/update/delete protocol with bounded retry
//! - Per-kind lifecycle hooks (structured-data wiring and validation)
//! - The post-commit notification pipeline
//! - Transaction frames and the top-level `Inventory` facade

pub mod accessors;
pub mod frame;
pub mod inventory;
pub mod lifecycle;
pub mod mutator;
pub mod observer;
pub mod traversal;
pub mod validator;

// Re-export commonly used types
pub use accessors::{
    DataAccessor, DataSingle, EntityAccessor, EntityMultiple, EntitySingle, RelationshipAccessor,
};
pub use frame::TransactionFrame;
pub use inventory::Inventory;
pub use observer::{EventStream, Interest, InventoryEvent, ObservableContext};
pub use traversal::TraversalContext;
