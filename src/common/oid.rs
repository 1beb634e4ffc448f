//! Object identifier type.

use std::fmt;

use super::PageId;

/// Identifies a stored object.
///
/// Every object occupies one page, so an object id is the id of that page.
/// [`Oid::NULL`] (0) never names an object; index entries use it when no
/// specific object is being distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(pub u32);

impl Oid {
    /// The absent object.
    pub const NULL: Oid = Oid(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// The page holding this object.
    #[inline]
    pub fn page_id(self) -> PageId {
        PageId(self.0)
    }
}

impl From<PageId> for Oid {
    fn from(page_id: PageId) -> Self {
        Oid(page_id.0)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.0)
    }
}
