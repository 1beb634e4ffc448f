//! B-tree node pages.
//!
//! # Scalar Keys
//! ```text
//! ┌────────┬─────────┬──────────────────────┬─────────┬──────────────────┐
//! │ header │ n_items │ key slots (8B) ───►  │  free   │ ◄─── refs (4B)   │
//! │ 13B    │ u16     │ from offset 20       │         │ ref 0 at the end │
//! └────────┴─────────┴──────────────────────┴─────────┴──────────────────┘
//! ```
//!
//! # String Keys
//! ```text
//! ┌────────┬─────────┬──────────────────────────┬──────┬──────────────────┐
//! │ header │ n_items │ table (8B) ───►          │ free │ ◄─── key bytes   │
//! │ 13B    │ u16     │ oid u32, off u16, len u16│      │                  │
//! └────────┴─────────┴──────────────────────────┴──────┴──────────────────┘
//! ```
//!
//! Leaves hold `n` entries whose references are object identifiers.
//! Internal nodes hold `n` keys and `n + 1` child page identifiers; on string
//! pages the extra child sits in a trailing table entry with an empty key.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::key::{Key, KeyType, SLOT_SIZE};

const OFFSET_N_ITEMS: usize = PageHeader::SIZE;
const DATA_START: usize = 20;
const REF_SIZE: usize = 4;
const TABLE_ENTRY_SIZE: usize = 8;

/// Bytes available to keys and references.
pub(crate) const USABLE_SPACE: usize = PAGE_SIZE - DATA_START;

/// Entries per scalar-keyed page.
pub const MAX_ITEMS: usize = (USABLE_SPACE - REF_SIZE) / (SLOT_SIZE + REF_SIZE);

/// Reads an identifier at a position of a node page.
pub type Locator = fn(&Page, usize) -> u32;

/// Number of keys on a node page.
#[inline]
pub fn item_count(page: &Page) -> usize {
    page.read_u16(OFFSET_N_ITEMS) as usize
}

/// Identifier in reference slot `pos` of a scalar-keyed page.
#[inline]
pub fn reference_at(page: &Page, pos: usize) -> u32 {
    page.read_u32(ref_offset(pos))
}

/// Identifier in string-key table entry `pos`.
#[inline]
pub fn str_key_oid(page: &Page, pos: usize) -> u32 {
    page.read_u32(table_offset(pos))
}

/// Accessor for identifiers on pages of `key_type`.
pub fn locator(key_type: KeyType) -> Locator {
    if key_type.is_string() {
        str_key_oid
    } else {
        reference_at
    }
}

#[inline]
fn ref_offset(pos: usize) -> usize {
    PAGE_SIZE - REF_SIZE * (pos + 1)
}

#[inline]
fn table_offset(pos: usize) -> usize {
    DATA_START + TABLE_ENTRY_SIZE * pos
}

/// A node page decoded into owned keys and references.
///
/// Nodes are read under a short pin, edited in memory and written back
/// whole.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    pub leaf: bool,
    pub keys: Vec<Key>,
    pub refs: Vec<u32>,
}

impl Node {
    pub fn new_leaf(keys: Vec<Key>, refs: Vec<u32>) -> Self {
        debug_assert_eq!(keys.len(), refs.len());
        Self {
            leaf: true,
            keys,
            refs,
        }
    }

    pub fn new_internal(keys: Vec<Key>, refs: Vec<u32>) -> Self {
        debug_assert_eq!(keys.len() + 1, refs.len());
        Self {
            leaf: false,
            keys,
            refs,
        }
    }

    /// Decode a node page.
    ///
    /// # Errors
    /// - `Error::Corrupted` if the page is not a node of `key_type`
    pub fn read(page: &Page, page_id: PageId, key_type: KeyType) -> Result<Self> {
        let leaf = match page.page_type() {
            PageType::BTreeLeaf => true,
            PageType::BTreeInternal => false,
            _ => return Err(Error::Corrupted(page_id.0)),
        };
        let n = item_count(page);
        let n_refs = if leaf { n } else { n + 1 };
        let corrupted = || Error::Corrupted(page_id.0);

        let mut keys = Vec::with_capacity(n);
        let mut refs = Vec::with_capacity(n_refs);

        if key_type.is_string() {
            if table_offset(n_refs) > PAGE_SIZE {
                return Err(corrupted());
            }
            let data = page.as_slice();
            for pos in 0..n_refs {
                let at = table_offset(pos);
                refs.push(page.read_u32(at));
                if pos == n {
                    break;
                }
                let offset = page.read_u16(at + 4) as usize;
                let len = page.read_u16(at + 6) as usize;
                if offset < table_offset(n_refs) || offset + len > PAGE_SIZE {
                    return Err(corrupted());
                }
                let text = std::str::from_utf8(&data[offset..offset + len]).map_err(|_| corrupted())?;
                keys.push(Key::String(text.to_string()));
            }
        } else {
            if DATA_START + n * SLOT_SIZE + n_refs * REF_SIZE > PAGE_SIZE {
                return Err(corrupted());
            }
            for pos in 0..n {
                let slot = page.read_u64(DATA_START + pos * SLOT_SIZE);
                keys.push(Key::from_slot(key_type, slot).ok_or_else(corrupted)?);
            }
            for pos in 0..n_refs {
                refs.push(reference_at(page, pos));
            }
        }

        Ok(Self { leaf, keys, refs })
    }

    /// Encode the node into `page`, replacing its contents.
    pub fn write(&self, page: &mut Page, key_type: KeyType) {
        debug_assert!(self.fits(key_type));
        page.format(if self.leaf {
            PageType::BTreeLeaf
        } else {
            PageType::BTreeInternal
        });
        page.write_u16(OFFSET_N_ITEMS, self.keys.len() as u16);

        if key_type.is_string() {
            let mut end = PAGE_SIZE;
            for (pos, &oid) in self.refs.iter().enumerate() {
                let bytes = match self.keys.get(pos) {
                    Some(Key::String(s)) => s.as_bytes(),
                    _ => &[],
                };
                end -= bytes.len();
                page.as_mut_slice()[end..end + bytes.len()].copy_from_slice(bytes);

                let at = table_offset(pos);
                page.write_u32(at, oid);
                page.write_u16(at + 4, end as u16);
                page.write_u16(at + 6, bytes.len() as u16);
            }
        } else {
            for (pos, key) in self.keys.iter().enumerate() {
                page.write_u64(DATA_START + pos * SLOT_SIZE, key.to_slot());
            }
            for (pos, &oid) in self.refs.iter().enumerate() {
                page.write_u32(ref_offset(pos), oid);
            }
        }
    }

    pub fn used_bytes(&self, key_type: KeyType) -> usize {
        let keys: usize = self.keys.iter().map(|k| entry_size(key_type, k)).sum();
        keys + self.fixed_bytes(key_type)
    }

    /// Whether the node can be written to a single page.
    pub fn fits(&self, key_type: KeyType) -> bool {
        self.used_bytes(key_type) <= USABLE_SPACE && self.keys.len() <= u16::MAX as usize
    }

    /// Whether the node occupies less than half a page.
    pub fn is_underfull(&self, key_type: KeyType) -> bool {
        self.used_bytes(key_type) * 2 < USABLE_SPACE
    }

    /// First position whose key is not less than `key`.
    pub fn lower_bound(&self, key: &Key) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// First position whose key is greater than `key`.
    pub fn upper_bound(&self, key: &Key) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    /// Split an over-full node into `(left, separator, right)` of roughly
    /// equal byte size.
    ///
    /// Leaf separators are the largest key of the left half and stay in
    /// the leaf. Internal separators move up out of both halves.
    pub fn split(mut self, key_type: KeyType) -> (Node, Key, Node) {
        let n = self.keys.len();
        debug_assert!(n >= 2);

        let sizes: Vec<usize> = self.keys.iter().map(|k| entry_size(key_type, k)).collect();
        let total: usize = sizes.iter().sum();

        // First position whose running total reaches half.
        let mut through = 0;
        let mut mid = n - 1;
        for (pos, size) in sizes.iter().enumerate() {
            through += size;
            if through * 2 >= total {
                mid = pos;
                break;
            }
        }

        if self.leaf {
            let before = through - sizes[mid];
            let cut = if before.max(total - before) <= through.max(total - through) {
                mid
            } else {
                mid + 1
            };
            let cut = cut.clamp(1, n - 1);

            let right_keys = self.keys.split_off(cut);
            let right_refs = self.refs.split_off(cut);
            let separator = self.keys[cut - 1].clone();
            (
                Node::new_leaf(self.keys, self.refs),
                separator,
                Node::new_leaf(right_keys, right_refs),
            )
        } else {
            let mid = mid.clamp(1, n.saturating_sub(2).max(1));

            let right_keys = self.keys.split_off(mid + 1);
            let right_refs = self.refs.split_off(mid + 1);
            let separator = self.keys.remove(mid);
            (
                Node::new_internal(self.keys, self.refs),
                separator,
                Node::new_internal(right_keys, right_refs),
            )
        }
    }

    /// Bytes spent on the extra child reference of internal nodes.
    fn fixed_bytes(&self, key_type: KeyType) -> usize {
        match (self.leaf, key_type.is_string()) {
            (true, _) => 0,
            (false, true) => TABLE_ENTRY_SIZE,
            (false, false) => REF_SIZE,
        }
    }
}

fn entry_size(key_type: KeyType, key: &Key) -> usize {
    if key_type.is_string() {
        TABLE_ENTRY_SIZE + key.stored_len()
    } else {
        SLOT_SIZE + REF_SIZE
    }
}
