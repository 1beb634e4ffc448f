//! Common types shared across the crate.
//!
//! - Configuration constants and [`StorageConfig`](config::StorageConfig)
//! - Error types
//! - Identifiers ([`PageId`], [`FrameId`], [`Oid`])

pub mod config;
pub mod error;
mod frame_id;
mod oid;
mod page_id;

pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use oid::Oid;
pub use page_id::PageId;
