//! Results of page-level mutations.

use super::key::Entry;

/// What a page-level insert or remove did to the subtree it was applied to.
///
/// This is the only way structural changes below the root reach the
/// [`Index`](super::Index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Applied; the subtree root is neither over- nor underfull.
    Done,
    /// The subtree root split. The entry's key is the separator and its
    /// identifier names the new left sibling page.
    Overflow(Entry),
    /// Applied; the subtree root fell under half occupancy.
    Underflow,
    /// Nothing matched the entry to remove.
    NotFound,
    /// An equal key exists and replacing it was not requested.
    Duplicate,
    /// An equal key existed and its object identifier was replaced.
    Overwrite,
}
