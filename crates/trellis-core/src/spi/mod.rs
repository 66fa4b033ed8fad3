//! Service provider interface for physical storage engines

pub mod backend;
pub mod index;
pub mod paging;
pub mod transaction;

pub use backend::{BackendHandle, InventoryBackend};
pub use index::IndexSpec;
pub use paging::{Page, Pager, SortOrder};
pub use transaction::{
    Action, NotificationPayload, PendingNotification, PreCommit, Transaction,
};
