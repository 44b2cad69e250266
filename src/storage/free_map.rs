//! Free page bitmap.

use crate::common::{Error, PageId, Result};

/// Tracks which pages are in use, one bit per page.
///
/// A set bit means the page holds live data. Page 0 (metadata) is always in
/// use. Allocation picks the lowest clear bit so freed pages are reused
/// before the file grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeMap {
    bits: Vec<u8>,
    max_pages: u32,
}

impl FreeMap {
    /// Create a map where only the metadata page is in use.
    pub fn new(max_pages: u32) -> Self {
        let mut map = Self {
            bits: vec![0u8; Self::byte_len(max_pages)],
            max_pages,
        };
        map.set(PageId::META.0, true);
        map
    }

    /// Number of bytes needed to describe `max_pages` pages.
    pub fn byte_len(max_pages: u32) -> usize {
        (max_pages as usize).div_ceil(8)
    }

    /// Rebuild a map from its persisted bytes.
    ///
    /// The persisted map may be longer or shorter than `max_pages` needs, but
    /// every page it marks in use must fall below `max_pages`.
    pub fn from_bytes(bytes: &[u8], max_pages: u32) -> Result<Self> {
        let mut map = Self::new(max_pages);
        for (byte_idx, &byte) in bytes.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) == 0 {
                    continue;
                }
                let page = (byte_idx * 8 + bit) as u32;
                if page >= max_pages {
                    return Err(Error::PageOutOfRange { page, max_pages });
                }
                map.set(page, true);
            }
        }
        Ok(map)
    }

    /// The persisted form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn is_used(&self, page: PageId) -> bool {
        page.0 < self.max_pages && self.get(page.0)
    }

    pub fn mark_used(&mut self, page: PageId) {
        self.set(page.0, true);
    }

    pub fn mark_free(&mut self, page: PageId) {
        self.set(page.0, false);
    }

    /// Lowest page number not in use.
    pub fn first_free(&self) -> Option<PageId> {
        self.bits
            .iter()
            .enumerate()
            .find(|(_, &byte)| byte != u8::MAX)
            .map(|(idx, &byte)| (idx * 8) as u32 + byte.trailing_ones())
            .filter(|&page| page < self.max_pages)
            .map(PageId::new)
    }

    /// Pages still available for allocation.
    pub fn free_count(&self) -> u32 {
        self.max_pages - self.used_count()
    }

    pub fn used_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    fn get(&self, page: u32) -> bool {
        self.bits[(page / 8) as usize] & (1 << (page % 8)) != 0
    }

    fn set(&mut self, page: u32, used: bool) {
        let byte = &mut self.bits[(page / 8) as usize];
        if used {
            *byte |= 1 << (page % 8);
        } else {
            *byte &= !(1 << (page % 8));
        }
    }
}
