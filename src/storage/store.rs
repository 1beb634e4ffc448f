//! Object store over the buffer pool.
//!
//! [`Storage`] owns the page cache and gives the index everything it needs
//! from below: pinned page access, page allocation and release, and
//! one-object-per-page persistence keyed by [`Oid`].

use std::path::Path;

use tracing::{info, warn};

use crate::buffer::{BufferPoolManager, PageReadGuard, PageWriteGuard};
use crate::common::config::{StorageConfig, PAGE_SIZE};
use crate::common::{Error, Oid, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::{DiskManager, Persistent};

const MAGIC: &[u8; 4] = b"BIDX";
const FORMAT_VERSION: u32 = 1;

// Header page (page 0) layout, after the common page header.
const OFFSET_MAGIC: usize = PageHeader::SIZE;
const OFFSET_VERSION: usize = OFFSET_MAGIC + 4;
const OFFSET_ROOT_OBJECT: usize = OFFSET_VERSION + 4;

// Object page layout.
const OFFSET_OBJECT_LEN: usize = PageHeader::SIZE;
const OFFSET_OBJECT_DATA: usize = OFFSET_OBJECT_LEN + 4;

/// Largest payload a single object may carry.
pub const MAX_OBJECT_SIZE: usize = PAGE_SIZE - OFFSET_OBJECT_DATA;

/// A database file: header page, B-tree pages and stored objects.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────────────────────────────────────┐
/// │ Page 0   │ Pages 1..N                               │
/// │ header   │ objects, B-tree nodes, free pages        │
/// └──────────┴──────────────────────────────────────────┘
/// ```
///
/// Because page 0 is the header, identifier 0 never names an object or a
/// node and is free to mean "none".
///
/// Dirty pages are written back on eviction, on [`flush`](Self::flush) and
/// when the storage is dropped.
pub struct Storage {
    pool: BufferPoolManager,
}

impl Storage {
    /// Create a new database file.
    ///
    /// # Errors
    /// - `Error::Config` if `config` fails validation
    /// - `Error::Io` if the file already exists
    pub fn create<P: AsRef<Path>>(path: P, config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let dm = DiskManager::create(path.as_ref())?;
        let storage = Self {
            pool: BufferPoolManager::new(config.pool_size, dm),
        };

        {
            let mut header = storage.pool.new_page()?;
            debug_assert_eq!(header.page_id(), PageId::HEADER);
            header.format(PageType::Header);
            header.as_mut_slice()[OFFSET_MAGIC..OFFSET_MAGIC + 4].copy_from_slice(MAGIC);
            header.write_u32(OFFSET_VERSION, FORMAT_VERSION);
            header.write_u32(OFFSET_ROOT_OBJECT, Oid::NULL.0);
        }
        storage.flush()?;

        info!(path = %path.as_ref().display(), pool_size = config.pool_size, "created storage");
        Ok(storage)
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// - `Error::BadHeader` if page 0 is not a storage header
    /// - `Error::Config` if `config` fails validation
    pub fn open<P: AsRef<Path>>(path: P, config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let dm = DiskManager::open(path.as_ref())?;
        let storage = Self {
            pool: BufferPoolManager::new(config.pool_size, dm),
        };

        {
            let header = storage.pool.fetch_page_read(PageId::HEADER)?;
            if header.page_type() != PageType::Header
                || &header.as_slice()[OFFSET_MAGIC..OFFSET_MAGIC + 4] != MAGIC
            {
                return Err(Error::BadHeader("missing magic".to_string()));
            }
            let version = header.read_u32(OFFSET_VERSION);
            if version != FORMAT_VERSION {
                return Err(Error::BadHeader(format!("unsupported version {version}")));
            }
        }

        info!(path = %path.as_ref().display(), pool_size = config.pool_size, "opened storage");
        Ok(storage)
    }

    // ========================================================================
    // Root object
    // ========================================================================

    /// The application's entry point object, if one was set.
    pub fn root_object(&self) -> Result<Option<Oid>> {
        let header = self.pool.fetch_page_read(PageId::HEADER)?;
        let oid = Oid(header.read_u32(OFFSET_ROOT_OBJECT));
        Ok((!oid.is_null()).then_some(oid))
    }

    pub fn set_root_object(&self, oid: Oid) -> Result<()> {
        let mut header = self.pool.fetch_page_write(PageId::HEADER)?;
        header.write_u32(OFFSET_ROOT_OBJECT, oid.0);
        Ok(())
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// Pin a page for reading.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        self.pool.fetch_page_read(page_id)
    }

    /// Pin a page for writing.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        self.pool.fetch_page_write(page_id)
    }

    /// Allocate a zeroed page, pinned for writing.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        self.pool.new_page()
    }

    /// Release a page for reuse.
    pub fn free_page(&self, page_id: PageId) -> Result<()> {
        self.pool.free_page(page_id)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Store a payload as a new object and return its identifier.
    ///
    /// # Errors
    /// - `Error::ObjectTooLarge` if the payload exceeds [`MAX_OBJECT_SIZE`]
    pub fn store_new_object(&self, bytes: &[u8]) -> Result<Oid> {
        check_object_size(bytes)?;
        let mut page = self.pool.new_page()?;
        write_object(&mut page, bytes);
        Ok(Oid::from(page.page_id()))
    }

    /// Overwrite the payload of an existing object.
    pub fn store_object(&self, oid: Oid, bytes: &[u8]) -> Result<()> {
        check_object_size(bytes)?;
        let mut page = self.fetch_object_page_write(oid)?;
        write_object(&mut page, bytes);
        Ok(())
    }

    /// Raw payload of an object.
    pub fn load_bytes(&self, oid: Oid) -> Result<Vec<u8>> {
        let page = self.fetch_object_page_read(oid)?;
        let len = (page.read_u32(OFFSET_OBJECT_LEN) as usize).min(MAX_OBJECT_SIZE);
        Ok(page.as_slice()[OFFSET_OBJECT_DATA..OFFSET_OBJECT_DATA + len].to_vec())
    }

    /// Materialize an object.
    pub fn load<T: Persistent>(&self, oid: Oid) -> Result<T> {
        let bytes = self.load_bytes(oid)?;
        T::decode(oid, &bytes)
    }

    /// Store `obj` if it has no identifier yet, binding the new one.
    pub fn persist<T: Persistent>(&self, obj: &mut T) -> Result<Oid> {
        if let Some(oid) = obj.oid() {
            return Ok(oid);
        }
        let oid = self.store_new_object(&obj.encode())?;
        obj.bind(oid);
        Ok(oid)
    }

    /// Release an object's page.
    pub fn free_object(&self, oid: Oid) -> Result<()> {
        drop(self.fetch_object_page_read(oid)?);
        self.pool.free_page(oid.page_id())
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Write back every dirty page and sync the file.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all_pages()
    }

    /// Number of pages currently pinned by live guards.
    pub fn pinned_page_count(&self) -> usize {
        self.pool.pinned_frame_count()
    }

    /// Pages in the file that are in use (everything but free pages).
    pub fn live_page_count(&self) -> usize {
        self.pool.disk_page_count() as usize - self.pool.disk_free_page_count()
    }

    /// The underlying page cache.
    pub fn pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    fn fetch_object_page_read(&self, oid: Oid) -> Result<PageReadGuard<'_>> {
        if oid.is_null() {
            return Err(Error::ObjectNotFound(oid.0));
        }
        let page = self.pool.fetch_page_read(oid.page_id()).map_err(|e| match e {
            Error::PageNotFound(_) => Error::ObjectNotFound(oid.0),
            other => other,
        })?;
        if page.page_type() != PageType::Object {
            return Err(Error::ObjectNotFound(oid.0));
        }
        Ok(page)
    }

    fn fetch_object_page_write(&self, oid: Oid) -> Result<PageWriteGuard<'_>> {
        drop(self.fetch_object_page_read(oid)?);
        self.pool.fetch_page_write(oid.page_id())
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("failed to flush storage on drop: {e}");
        }
    }
}

fn check_object_size(bytes: &[u8]) -> Result<()> {
    if bytes.len() > MAX_OBJECT_SIZE {
        return Err(Error::ObjectTooLarge {
            size: bytes.len(),
            max: MAX_OBJECT_SIZE,
        });
    }
    Ok(())
}

fn write_object(page: &mut Page, bytes: &[u8]) {
    page.format(PageType::Object);
    page.write_u32(OFFSET_OBJECT_LEN, bytes.len() as u32);
    page.as_mut_slice()[OFFSET_OBJECT_DATA..OFFSET_OBJECT_DATA + bytes.len()]
        .copy_from_slice(bytes);
}
