//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting through RAII guards
//! - Dirty page write-back with checksum sealing
//! - Page release back to the disk free list

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames for caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock`, many readers and few writers
/// - `free_list`, `replacer`, `disk_manager`: `Mutex`
/// - `frames`: fixed size, each Frame has internal locks
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    /// Unused frames (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<FifoReplacer>,
    disk_manager: Mutex<DiskManager>,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager with `pool_size` frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        Self {
            frames: (0..pool_size).map(|_| Frame::new()).collect(),
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new((0..pool_size).map(FrameId::new).collect()),
            replacer: Mutex::new(FifoReplacer::new()),
            disk_manager: Mutex::new(disk_manager),
        }
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Pin a page for shared reading.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.index()].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page for exclusive writing. The page is marked dirty when the
    /// guard drops.
    ///
    /// # Errors
    /// Same as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.index()].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Allocate and release
    // ========================================================================

    /// Allocate a page on disk and return it zeroed and pinned for writing.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from disk allocation
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.get_free_frame()?;

        let page_id = match self.disk_manager.lock().allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.index()];
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));
        frame.pin();

        self.page_table.write().insert(page_id, frame_id);
        self.record_pinned_access(frame_id);

        trace!(%page_id, %frame_id, "allocated page");
        Ok(PageWriteGuard::new(self, frame_id, page_id, frame.page_mut()))
    }

    /// Drop a page from the pool and return it to the disk free list.
    ///
    /// The page's cached contents are discarded without write-back.
    ///
    /// # Errors
    /// - `Error::PagePinned` if a guard for the page is still alive
    pub fn free_page(&self, page_id: PageId) -> Result<()> {
        {
            let mut pt = self.page_table.write();
            if let Some(&frame_id) = pt.get(&page_id) {
                let frame = &self.frames[frame_id.index()];
                if frame.is_pinned() {
                    return Err(Error::PagePinned(page_id.0));
                }
                pt.remove(&page_id);
                drop(pt);

                frame.set_page_id(None);
                frame.clear_dirty();
                self.replacer.lock().remove(frame_id);
                self.free_list.lock().push(frame_id);
            }
        }

        self.disk_manager.lock().deallocate_page(page_id)?;
        debug!(%page_id, "freed page");
        Ok(())
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Write back every dirty page and sync the file.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = self
            .page_table
            .read()
            .iter()
            .map(|(&pid, &fid)| (pid, fid))
            .collect();

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }
        self.disk_manager.lock().sync()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Number of frames with at least one live guard.
    pub fn pinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_pinned()).count()
    }

    /// Pin count of a cached page, or `None` if it is not in the pool.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = *self.page_table.read().get(&page_id)?;
        Some(self.frames[frame_id.index()].pin_count())
    }

    /// Pages in the file, including free ones.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    /// Released pages waiting for reuse.
    pub fn disk_free_page_count(&self) -> usize {
        self.disk_manager.lock().free_page_count()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    /// Unpin a page. Called by the guards on drop.
    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.index()];
        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if let Some(&frame_id) = self.page_table.read().get(&page_id) {
            self.frames[frame_id.index()].pin();
            self.record_pinned_access(frame_id);
            return Ok(frame_id);
        }

        let frame_id = self.get_free_frame()?;
        let page_data = match self.disk_manager.lock().read_page(page_id) {
            Ok(page) => page,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.index()];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        frame.set_page_id(Some(page_id));
        frame.pin();

        self.page_table.write().insert(page_id, frame_id);
        self.record_pinned_access(frame_id);
        Ok(frame_id)
    }

    fn record_pinned_access(&self, frame_id: FrameId) {
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }
        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.index()];

        if let Some(old_page_id) = frame.page_id() {
            self.flush_frame(frame_id, old_page_id)?;
            self.page_table.write().remove(&old_page_id);
            trace!(page_id = %old_page_id, %frame_id, "evicted page");
        }

        frame.clear_dirty();
        frame.set_page_id(None);
        Ok(frame_id)
    }

    /// Seal the checksum and write a dirty frame to disk.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.index()];
        if !frame.is_dirty() {
            return Ok(());
        }

        let mut page = frame.page_mut();
        page.update_checksum();
        self.disk_manager.lock().write_page(page_id, &page)?;
        drop(page);

        frame.clear_dirty();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PageType;
    use tempfile::tempdir;

    fn create_test_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        (BufferPoolManager::new(pool_size, dm), dir)
    }

    #[test]
    fn test_new_page_is_pinned_until_guard_drops() {
        let (bpm, _dir) = create_test_bpm(4);

        let guard = bpm.new_page().unwrap();
        let page_id = guard.page_id();
        assert_eq!(bpm.pin_count(page_id), Some(1));
        assert_eq!(bpm.pinned_frame_count(), 1);
        drop(guard);

        assert_eq!(bpm.pin_count(page_id), Some(0));
        assert_eq!(bpm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_dirty_page_survives_eviction() {
        let (bpm, _dir) = create_test_bpm(1);

        let first = {
            let mut guard = bpm.new_page().unwrap();
            guard.format(PageType::Object);
            guard.write_u32(20, 0x42);
            guard.page_id()
        };

        // Single frame: allocating again evicts and flushes the first page.
        drop(bpm.new_page().unwrap());

        let guard = bpm.fetch_page_read(first).unwrap();
        assert_eq!(guard.read_u32(20), 0x42);
        assert!(guard.verify_checksum());
    }

    #[test]
    fn test_no_free_frames() {
        let (bpm, _dir) = create_test_bpm(2);

        let _guard1 = bpm.new_page().unwrap();
        let _guard2 = bpm.new_page().unwrap();

        assert!(matches!(bpm.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_free_page_rejects_pinned() {
        let (bpm, _dir) = create_test_bpm(4);

        let guard = bpm.new_page().unwrap();
        let page_id = guard.page_id();
        assert!(matches!(bpm.free_page(page_id), Err(Error::PagePinned(_))));

        drop(guard);
        bpm.free_page(page_id).unwrap();
        assert_eq!(bpm.page_count(), 0);
        assert_eq!(bpm.free_frame_count(), 4);
        assert_eq!(bpm.disk_free_page_count(), 1);
    }

    #[test]
    fn test_freed_page_is_recycled() {
        let (bpm, _dir) = create_test_bpm(4);

        let page_id = bpm.new_page().unwrap().page_id();
        drop(bpm.new_page().unwrap());
        bpm.free_page(page_id).unwrap();

        let guard = bpm.new_page().unwrap();
        assert_eq!(guard.page_id(), page_id);
        assert_eq!(guard.page_type(), PageType::Invalid);
    }

    #[test]
    fn test_page_not_found_releases_frame() {
        let (bpm, _dir) = create_test_bpm(2);

        assert!(matches!(
            bpm.fetch_page_read(PageId::new(999)),
            Err(Error::PageNotFound(999))
        ));
        assert_eq!(bpm.free_frame_count(), 2);
    }

    #[test]
    fn test_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        let (bpm, _dir) = create_test_bpm(4);
        let bpm = Arc::new(bpm);

        let page_id = {
            let mut guard = bpm.new_page().unwrap();
            guard.write_u32(20, 7);
            guard.page_id()
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bpm = Arc::clone(&bpm);
                thread::spawn(move || {
                    let guard = bpm.fetch_page_read(page_id).unwrap();
                    assert_eq!(guard.read_u32(20), 7);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(bpm.pinned_frame_count(), 0);
    }
}
