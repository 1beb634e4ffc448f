//! Storage layer - disk I/O, page formats and the object store.
//!
//! - [`DiskManager`] - Low-level file I/O and page recycling
//! - [`page`] - Page types and layouts
//! - [`Storage`] - Object store over the buffer pool
//! - [`Persistent`] / [`Blob`] - Objects the index can refer to
//! - [`MarkSet`] - Reachability marks

mod disk_manager;
mod mark;
mod object;
pub mod page;
mod store;

pub use disk_manager::DiskManager;
pub use mark::MarkSet;
pub use object::{Blob, Persistent};
pub use store::{Storage, MAX_OBJECT_SIZE};
