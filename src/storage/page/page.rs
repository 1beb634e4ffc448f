//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O between
//! disk and memory. Typed views (B-tree nodes, stored objects) read and write
//! it through the little-endian accessors below.

use crate::common::config::PAGE_SIZE;

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// `Page` does not implement `Clone` outside tests; copying 4KB should be
/// explicit.
///
/// # Example
/// ```
/// use pagedindex::storage::page::Page;
///
/// let mut page = Page::new();
/// page.write_u32(20, 0xDEAD_BEEF);
/// assert_eq!(page.read_u32(20), 0xDEAD_BEEF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Zero the page and stamp a fresh header of the given type.
    pub fn format(&mut self, page_type: PageType) {
        self.reset();
        self.data[PageHeader::OFFSET_PAGE_TYPE] = page_type as u8;
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    #[inline]
    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[PageHeader::OFFSET_PAGE_TYPE])
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    #[inline]
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(buf)
    }

    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn read_u64(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    #[inline]
    pub fn write_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Compute and store the checksum. Call after all modifications.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.write_u32(PageHeader::OFFSET_CHECKSUM, checksum);
    }

    /// Verify the stored checksum.
    ///
    /// Pages that were allocated but never written carry no checksum and
    /// always verify.
    pub fn verify_checksum(&self) -> bool {
        self.page_type() == PageType::Invalid || self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}
