//! pagedindex - a persistent B-tree index over a paged object store.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          pagedindex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                        │   │
//! │  │   Index (root, height, count)  +  Cursor (path stack)    │   │
//! │  │                 page_ops (split / merge)                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Object Store (storage/store)                   │   │
//! │  │        Storage + Persistent objects + MarkSet            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)                              │   │
//! │  │   BufferPoolManager + Frame + FIFO replacer + guards     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Disk Layer (storage/)                          │   │
//! │  │         DiskManager + Page + PageHeader                  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Oid, Error, config)
//! - [`buffer`] - Buffer pool and eviction
//! - [`storage`] - Disk I/O, page formats and the object store
//! - [`index`] - The B-tree index and its cursor
//!
//! # Quick Start
//! ```no_run
//! use pagedindex::common::config::StorageConfig;
//! use pagedindex::index::{Index, Key, KeyType};
//! use pagedindex::storage::{Blob, Storage};
//!
//! let storage = Storage::create("my_database.db", &StorageConfig::from_env()?)?;
//! let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I32, true)?;
//!
//! for v in [5, 3, 8, 1] {
//!     index.put(v, &mut Blob::new(v.to_string()))?;
//! }
//! let middle = index.range(Some(Key::I32(3)), Some(Key::I32(8)))?;
//! assert_eq!(middle.len(), 3);
//! storage.set_root_object(index.oid())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{StorageConfig, PAGE_SIZE};
pub use common::{Error, Oid, PageId, Result};

pub use index::{Cursor, Entry, Index, Key, KeyType};
pub use storage::{Blob, Persistent, Storage};
