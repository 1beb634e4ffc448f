//! Buffer pool management.
//!
//! The buffer pool is the page cache between the index and disk. Every page
//! the index touches is pinned through a guard for exactly as long as the
//! guard lives.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pins for page access
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
