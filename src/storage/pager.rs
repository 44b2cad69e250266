//! Pager - page cache and free-page tracking over one database file.
//!
//! The [`Pager`] handles all direct file operations:
//! - Lazily loading pages into resident buffers
//! - Allocating and freeing pages through a bitmap
//! - Flushing page buffers back to the file

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::{Config, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::free_map::FreeMap;
use crate::storage::page::Page;
use crate::storage::stats::PagerStats;

/// Maps page numbers to resident 4KB buffers backed by a single file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (meta)  │ (node)  │ (node)  │         │ (node)  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// # Flush discipline
/// Buffers returned by [`get_page_mut`](Self::get_page_mut) are changed in
/// memory only. The on-disk page is a snapshot of the last
/// [`flush`](Self::flush) of that page; nothing is written implicitly.
///
/// # Residency
/// There is no eviction: every page touched stays resident until the pager
/// is closed.
///
/// # Thread Safety
/// `Pager` is **single-threaded**. Every method takes `&mut self`.
pub struct Pager {
    file: File,
    /// Tracked file length in bytes; grows when pages past the end are allocated.
    file_length: u64,
    pages: HashMap<PageId, Box<Page>>,
    dirty: HashSet<PageId>,
    free_map: FreeMap,
    max_pages: u32,
    sync_on_flush: bool,
    stats: PagerStats,
}

impl Pager {
    /// Open a database file, creating it if it doesn't exist.
    ///
    /// The free map starts with only page 0 in use; callers that persist the
    /// map restore it with [`load_free_map`](Self::load_free_map).
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let file_length = file.metadata()?.len();
        tracing::trace!(path = %path.as_ref().display(), file_length, "pager opened");

        Ok(Self {
            file,
            file_length,
            pages: HashMap::new(),
            dirty: HashSet::new(),
            free_map: FreeMap::new(config.max_pages),
            max_pages: config.max_pages,
            sync_on_flush: config.sync_on_flush,
            stats: PagerStats::default(),
        })
    }

    // ========================================================================
    // Page access
    // ========================================================================

    /// Get the resident buffer for a page, loading it on first access.
    ///
    /// Pages past the end of the file come back zero-filled.
    ///
    /// # Errors
    /// Returns `Error::PageOutOfRange` if `page_id` is not below the
    /// configured maximum.
    pub fn get_page(&mut self, page_id: PageId) -> Result<&Page> {
        self.ensure_resident(page_id)?;
        self.pages
            .get(&page_id)
            .map(|page| page.as_ref())
            .ok_or(Error::NullPageAccess(page_id.0))
    }

    /// Get the resident buffer for writing. The page is marked dirty.
    pub fn get_page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        self.ensure_resident(page_id)?;
        self.dirty.insert(page_id);
        self.pages
            .get_mut(&page_id)
            .map(|page| page.as_mut())
            .ok_or(Error::NullPageAccess(page_id.0))
    }

    fn ensure_resident(&mut self, page_id: PageId) -> Result<()> {
        self.check_range(page_id)?;
        if self.pages.contains_key(&page_id) {
            return Ok(());
        }

        let mut page = Box::new(Page::new());
        let offset = page_id.offset(PAGE_SIZE);
        if offset < self.file_length {
            // Read up to the real end of file; the tracked length can run
            // ahead of it for pages allocated but never flushed
            self.file.seek(SeekFrom::Start(offset))?;
            let loaded = read_until_eof(&mut self.file, page.as_mut_slice())?;
            if loaded > 0 {
                self.stats.pages_read += 1;
            }
            tracing::trace!(page = page_id.0, bytes = loaded, "page loaded");
        }

        self.pages.insert(page_id, page);
        Ok(())
    }

    fn check_range(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.max_pages {
            return Err(Error::PageOutOfRange {
                page: page_id.0,
                max_pages: self.max_pages,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate the lowest-numbered free page.
    ///
    /// The page gets a fresh zeroed buffer; whatever the file held there is
    /// garbage from an earlier owner.
    ///
    /// # Errors
    /// Returns `Error::NoFreePages` if every page below the maximum is in use.
    pub fn allocate_free_page(&mut self) -> Result<PageId> {
        let page_id = self.free_map.first_free().ok_or(Error::NoFreePages)?;
        self.free_map.mark_used(page_id);

        let end = page_id.offset(PAGE_SIZE) + PAGE_SIZE as u64;
        if end > self.file_length {
            self.file_length = end;
        }

        self.pages.insert(page_id, Box::new(Page::new()));
        self.dirty.insert(page_id);
        self.stats.allocations += 1;

        tracing::debug!(page = page_id.0, "page allocated");
        Ok(page_id)
    }

    /// Return a page to the free map and drop its buffer.
    ///
    /// The file content is left as is.
    pub fn free_page(&mut self, page_id: PageId) -> Result<()> {
        self.check_range(page_id)?;
        if page_id == PageId::META {
            return Err(Error::NullPageAccess(page_id.0));
        }
        if !self.free_map.is_used(page_id) {
            tracing::warn!(page = page_id.0, "freeing a page that is already free");
        }

        self.free_map.mark_free(page_id);
        self.pages.remove(&page_id);
        self.dirty.remove(&page_id);
        self.stats.frees += 1;

        tracing::debug!(page = page_id.0, "page freed");
        Ok(())
    }

    /// Whether the page is currently handed out.
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        self.free_map.is_used(page_id)
    }

    /// Pages still available for allocation.
    pub fn free_page_count(&self) -> u32 {
        self.free_map.free_count()
    }

    pub fn free_map(&self) -> &FreeMap {
        &self.free_map
    }

    /// Replace the free map with one restored from disk.
    pub fn load_free_map(&mut self, free_map: FreeMap) {
        self.free_map = free_map;
    }

    // ========================================================================
    // Flushing
    // ========================================================================

    /// Write a whole page to the file.
    pub fn write_page(&mut self, page_id: PageId) -> Result<()> {
        self.flush(page_id, PAGE_SIZE)
    }

    /// Write the first `byte_count` bytes of a page buffer at `page × PAGE_SIZE`.
    ///
    /// # Errors
    /// - `Error::NullPageAccess` if the page is not resident
    /// - I/O errors from the write; a failed flush is never reported as success
    pub fn flush(&mut self, page_id: PageId, byte_count: usize) -> Result<()> {
        self.check_range(page_id)?;
        let page = self
            .pages
            .get(&page_id)
            .ok_or(Error::NullPageAccess(page_id.0))?;
        let byte_count = byte_count.min(PAGE_SIZE);

        let offset = page_id.offset(PAGE_SIZE);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&page.as_slice()[..byte_count])?;
        if self.sync_on_flush {
            self.file.sync_data()?;
        }

        let end = offset + byte_count as u64;
        if end > self.file_length {
            self.file_length = end;
        }
        self.dirty.remove(&page_id);
        self.stats.pages_written += 1;

        tracing::trace!(page = page_id.0, bytes = byte_count, "page flushed");
        Ok(())
    }

    /// Flush every dirty page, lowest page number first.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut dirty: Vec<PageId> = self.dirty.iter().copied().collect();
        dirty.sort();
        for page_id in dirty {
            self.write_page(page_id)?;
        }
        Ok(())
    }

    /// Force written data to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Flush anything still dirty, sync, and release the file handle.
    pub fn close(mut self) -> Result<()> {
        if !self.dirty.is_empty() {
            tracing::debug!(dirty = self.dirty.len(), "flushing dirty pages on close");
        }
        self.flush_all()?;
        self.sync()?;
        tracing::trace!(resident = self.resident_count(), "pager closed");
        Ok(())
    }

    // ========================================================================
    // Info
    // ========================================================================

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Tracked file length in bytes.
    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    /// Number of pages currently held in memory.
    pub fn resident_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_dirty(&self, page_id: PageId) -> bool {
        self.dirty.contains(&page_id)
    }

    pub fn stats(&self) -> PagerStats {
        self.stats
    }
}

/// Fill `buf` from `file` until it is full or the file ends.
///
/// Bytes past the end are left untouched. Returns the number of bytes read.
fn read_until_eof(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
