//! Index layer - a persistent B-tree from typed keys to stored objects.
//!
//! - [`Index`] - root bookkeeping and the public operations
//! - [`Cursor`] - non-recursive ascending iteration
//! - [`page_ops`] - page-local insert, remove, split, merge and search
//! - [`Key`] / [`KeyType`] / [`Entry`] - typed keys
//! - [`Outcome`] - what a page mutation did to its subtree

mod btree;
mod cursor;
mod key;
mod meta;
mod node;
mod outcome;
pub mod page_ops;

pub use btree::Index;
pub use cursor::Cursor;
pub use key::{Entry, Key, KeyType};
pub use outcome::Outcome;
