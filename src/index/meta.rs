//! The persisted index record.
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬────────┐
//! │ root u32 │ height   │ type tag │ count    │ unique │
//! │          │ u32      │ u32      │ u32      │ u8     │
//! └──────────┴──────────┴──────────┴──────────┴────────┘
//! ```
//! All fields little-endian; 17 bytes in total.

use crate::common::{Error, Oid, PageId, Result};

use super::key::KeyType;

pub(crate) const META_SIZE: usize = 17;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexMeta {
    pub root: Option<PageId>,
    pub height: u32,
    pub key_type: KeyType,
    pub count: u32,
    pub unique: bool,
}

impl IndexMeta {
    pub fn empty(key_type: KeyType, unique: bool) -> Self {
        Self {
            root: None,
            height: 0,
            key_type,
            count: 0,
            unique,
        }
    }

    pub fn encode(&self) -> [u8; META_SIZE] {
        let mut buf = [0u8; META_SIZE];
        buf[0..4].copy_from_slice(&self.root.map_or(0, |id| id.0).to_le_bytes());
        buf[4..8].copy_from_slice(&self.height.to_le_bytes());
        buf[8..12].copy_from_slice(&self.key_type.tag().to_le_bytes());
        buf[12..16].copy_from_slice(&self.count.to_le_bytes());
        buf[16] = self.unique as u8;
        buf
    }

    /// # Errors
    /// - `Error::Decode` if the record is truncated or inconsistent
    /// - `Error::UnsupportedIndexType` if the type tag is unknown
    pub fn decode(oid: Oid, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_SIZE {
            return Err(decode_error(
                oid,
                format!("index record is {} bytes, expected {META_SIZE}", bytes.len()),
            ));
        }
        let field = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        let root = PageId::from_raw(field(0));
        let height = field(4);
        if root.is_none() != (height == 0) {
            return Err(decode_error(oid, format!("root {root:?} with height {height}")));
        }

        Ok(Self {
            root,
            height,
            key_type: KeyType::from_tag(field(8))?,
            count: field(12),
            unique: bytes[16] != 0,
        })
    }
}

fn decode_error(oid: Oid, reason: String) -> Error {
    Error::Decode { oid: oid.0, reason }
}
