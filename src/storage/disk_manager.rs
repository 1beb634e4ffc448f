//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating pages, recycling released ones first
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageType};

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ header  │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// Released pages are stamped [`PageType::Free`] on disk and kept on an
/// in-memory free list. Opening an existing file rebuilds that list by
/// scanning each page's type byte.
///
/// # Thread Safety
/// `DiskManager` is single-threaded. The `BufferPoolManager` serializes
/// access to it.
///
/// # Durability
/// Page writes are buffered by the OS; [`DiskManager::sync`] forces them out.
pub struct DiskManager {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
    /// Released pages available for reuse (LIFO).
    free_pages: Vec<PageId>,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        let mut dm = Self {
            file,
            page_count,
            free_pages: Vec::new(),
        };
        dm.rebuild_free_list()?;
        Ok(dm)
    }

    fn rebuild_free_list(&mut self) -> Result<()> {
        let mut type_byte = [0u8; 1];
        for raw in 1..self.page_count {
            let page_id = PageId::new(raw);
            self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
            self.file.read_exact(&mut type_byte)?;
            if PageType::from_u8(type_byte[0]) == PageType::Free {
                self.free_pages.push(page_id);
            }
        }
        Ok(())
    }

    /// Read a page from disk, verifying its checksum.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist
    /// - `Error::Corrupted` if the checksum does not match
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        if !page.verify_checksum() {
            return Err(Error::Corrupted(page_id.0));
        }
        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// The page must have been allocated with `allocate_page()`. Callers seal
    /// the checksum first.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }

        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(page.as_slice())?;
        Ok(())
    }

    /// Allocate a page, reusing a released one when available.
    ///
    /// Fresh pages extend the file with zeros. Recycled pages keep their
    /// `Free` stamp on disk until the caller writes them.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if let Some(page_id) = self.free_pages.pop() {
            return Ok(page_id);
        }

        let page_id = PageId::new(self.page_count);
        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Release a page: stamp it free on disk and queue it for reuse.
    pub fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        let mut page = Page::new();
        page.format(PageType::Free);
        page.update_checksum();
        self.write_page(page_id, &page)?;
        self.free_pages.push(page_id);
        Ok(())
    }

    /// Flush OS buffers for the file.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of pages in the file, including free ones.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of released pages awaiting reuse.
    #[inline]
    pub fn free_page_count(&self) -> usize {
        self.free_pages.len()
    }
}
