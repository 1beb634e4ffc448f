//! Page identifier type.

use std::fmt;

/// Identifies a page in the database file.
///
/// Page N lives at file offset `N × PAGE_SIZE`. Page 0 is always the storage
/// header, so no B-tree node or object ever has id 0 and the value doubles as
/// "no page" in persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// The storage header page.
    pub const HEADER: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Decode a persisted page reference where 0 means "none".
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        (raw != 0).then_some(PageId(raw))
    }

    /// Byte offset of this page within the database file.
    #[inline]
    pub fn file_offset(self, page_size: usize) -> u64 {
        u64::from(self.0) * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}
