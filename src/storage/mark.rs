//! Reachability marks collected by tree walks.

use std::collections::HashSet;

use crate::common::{Oid, PageId};

/// Pages and objects found live during a marking pass.
#[derive(Debug, Default)]
pub struct MarkSet {
    pages: HashSet<PageId>,
    objects: HashSet<Oid>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a page. Returns `false` if it was already marked.
    pub fn mark_page(&mut self, page_id: PageId) -> bool {
        self.pages.insert(page_id)
    }

    /// Mark an object. Returns `false` if it was already marked.
    pub fn mark_object(&mut self, oid: Oid) -> bool {
        self.objects.insert(oid)
    }

    pub fn is_page_marked(&self, page_id: PageId) -> bool {
        self.pages.contains(&page_id)
    }

    pub fn is_object_marked(&self, oid: Oid) -> bool {
        self.objects.contains(&oid)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_are_idempotent() {
        let mut marks = MarkSet::new();
        assert!(marks.mark_page(PageId::new(3)));
        assert!(!marks.mark_page(PageId::new(3)));
        assert!(marks.mark_object(Oid(4)));

        assert!(marks.is_page_marked(PageId::new(3)));
        assert!(!marks.is_object_marked(Oid(3)));
        assert_eq!(marks.page_count(), 1);
        assert_eq!(marks.object_count(), 1);
    }
}
