//! Backend-independent query and filter composition

pub mod filter;
#[allow(clippy::module_inception)]
pub mod query;

pub use filter::Filter;
pub use query::{FragmentKind, Query, QueryBuilder, QueryFragment};
