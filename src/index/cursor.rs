//! Forward iteration with an explicit path stack.

use std::marker::PhantomData;

use crate::common::{Error, Oid, PageId, Result};
use crate::storage::{Persistent, Storage};

use super::node::{item_count, Locator};

/// Ascending, read-only cursor over an index's objects.
///
/// The cursor keeps the path from the root to the current leaf as
/// `(page, position)` frames, one per tree level. Pages are pinned only
/// while a frame is read. Build a new cursor with
/// [`Index::iter`](super::Index::iter) to start over.
pub struct Cursor<'a, T> {
    storage: &'a Storage,
    locate: Locator,
    height: usize,
    stack: Vec<(PageId, usize)>,
    /// Item count of the leaf on top of the stack.
    end: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Persistent> Cursor<'a, T> {
    pub(crate) fn new(
        storage: &'a Storage,
        root: Option<PageId>,
        height: u32,
        locate: Locator,
    ) -> Result<Self> {
        let height = height as usize;
        let mut cursor = Self {
            storage,
            locate,
            height,
            stack: Vec::with_capacity(height),
            end: 0,
            _marker: PhantomData,
        };
        if let Some(root) = root {
            cursor.descend(root)?;
            if cursor.end == 0 {
                cursor.next_leaf()?;
            }
        }
        Ok(cursor)
    }

    /// Whether another object remains.
    pub fn has_next(&self) -> bool {
        self.stack.last().is_some_and(|&(_, pos)| pos < self.end)
    }

    /// Return the next object and move past it.
    ///
    /// # Errors
    /// - `Error::NoSuchElement` once the cursor is exhausted
    pub fn advance(&mut self) -> Result<T> {
        if !self.has_next() {
            return Err(Error::NoSuchElement);
        }
        let oid = {
            let Some(frame) = self.stack.last_mut() else {
                return Err(Error::NoSuchElement);
            };
            let page = self.storage.fetch_page_read(frame.0)?;
            let oid = Oid((self.locate)(&page, frame.1));
            frame.1 += 1;
            oid
        };
        if self.stack.last().is_some_and(|&(_, pos)| pos == self.end) {
            self.next_leaf()?;
        }
        self.storage.load(oid)
    }

    /// Cursors are read-only.
    pub fn remove(&mut self) -> Result<()> {
        Err(Error::UnsupportedOperation("cursor remove"))
    }

    /// Push leftmost frames from `page_id` down to a leaf.
    fn descend(&mut self, mut page_id: PageId) -> Result<()> {
        while self.stack.len() < self.height {
            let page = self.storage.fetch_page_read(page_id)?;
            self.stack.push((page_id, 0));
            if self.stack.len() == self.height {
                self.end = item_count(&page);
            } else {
                page_id = PageId::new((self.locate)(&page, 0));
            }
        }
        Ok(())
    }

    /// Pop the exhausted leaf and move to the next non-empty one. Leaves the
    /// stack empty when there is none.
    fn next_leaf(&mut self) -> Result<()> {
        loop {
            self.stack.pop();
            let child = loop {
                let Some(frame) = self.stack.last_mut() else {
                    return Ok(());
                };
                frame.1 += 1;
                let (page_id, pos) = *frame;
                let page = self.storage.fetch_page_read(page_id)?;
                if pos <= item_count(&page) {
                    break PageId::new((self.locate)(&page, pos));
                }
                drop(page);
                self.stack.pop();
            };
            self.descend(child)?;
            if self.end > 0 {
                return Ok(());
            }
        }
    }
}

impl<T: Persistent> Iterator for Cursor<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.has_next().then(|| self.advance())
    }
}
