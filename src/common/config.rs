//! Configuration constants and the open-time [`Config`] for pagedb.

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every node and the metadata block occupy exactly one page. Page N lives at
/// file offset `N × PAGE_SIZE`.
pub const PAGE_SIZE: usize = 4096;

/// Default maximum number of pages in one database file.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Default B-tree order (maximum children per node).
pub const DEFAULT_ORDER: usize = 4;

/// Smallest order the tree accepts.
pub const MIN_ORDER: usize = 4;

// ============================================================================
// Fixed record schema
// ============================================================================

/// Width of the username column in bytes.
pub const COLUMN_USERNAME_SIZE: usize = 32;

/// Width of the email column in bytes.
pub const COLUMN_EMAIL_SIZE: usize = 255;

/// Encoded size of a record: id + username + email.
pub const RECORD_SIZE: usize = 4 + COLUMN_USERNAME_SIZE + COLUMN_EMAIL_SIZE;

/// Encoded size of a key.
pub const KEY_SIZE: usize = 4;

// ============================================================================
// Node layout
// ============================================================================

/// Node header: order (4) + size (4) + leaf flag (1) + page number (8).
pub const NODE_HEADER_SIZE: usize = 4 + 4 + 1 + 8;

/// Encoded size of one child pointer.
pub const CHILD_POINTER_SIZE: usize = 8;

/// Bytes needed by the largest node of the given order for the given
/// key and value widths.
pub const fn node_capacity(order: usize, key_size: usize, value_size: usize) -> usize {
    NODE_HEADER_SIZE + (order - 1) * (key_size + value_size) + order * CHILD_POINTER_SIZE
}

/// Largest order whose full internal node of the fixed schema fits in a page.
pub const fn max_record_order() -> usize {
    let mut order = MIN_ORDER;
    while node_capacity(order + 1, KEY_SIZE, RECORD_SIZE) <= PAGE_SIZE {
        order += 1;
    }
    order
}

// ============================================================================
// Metadata layout (page 0)
// ============================================================================

/// Offset of the root page number (i32, -1 for an empty tree).
pub const META_ROOT_OFFSET: usize = 0;
/// Offset of the tree order (i32).
pub const META_ORDER_OFFSET: usize = 4;
/// Offset of the free bitmap length in bytes (u32).
pub const META_BITMAP_LEN_OFFSET: usize = 8;
/// Offset where the free bitmap bytes start.
pub const META_BITMAP_OFFSET: usize = 12;
/// Offset of the CRC32 of bytes `0..META_CHECKSUM_OFFSET`.
pub const META_CHECKSUM_OFFSET: usize = PAGE_SIZE - 4;

/// Most pages the metadata bitmap can describe.
pub const MAX_PAGES_LIMIT: u32 = ((META_CHECKSUM_OFFSET - META_BITMAP_OFFSET) * 8) as u32;

/// Options fixed for the lifetime of an open table.
///
/// # Example
/// ```
/// use pagedb::Config;
///
/// let config = Config::builder().order(6).max_pages(500).build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum children per node. Must be even and at least [`MIN_ORDER`].
    pub order: usize,

    /// Upper bound on pages in the file, metadata page included.
    pub max_pages: u32,

    /// Call `sync_data` after every page flush instead of only on close.
    pub sync_on_flush: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            max_pages: DEFAULT_MAX_PAGES,
            sync_on_flush: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the options describe a tree the page format can hold.
    ///
    /// The order must be even: with split-before-descend insertion, a full
    /// node of an odd order cannot be divided into two halves that both meet
    /// the minimum fill.
    pub fn validate(&self) -> Result<()> {
        if self.order < MIN_ORDER {
            return Err(Error::InvalidConfig(format!(
                "order {} is below the minimum of {}",
                self.order, MIN_ORDER
            )));
        }
        if self.order % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "order {} must be even",
                self.order
            )));
        }
        if self.order > max_record_order() {
            return Err(Error::InvalidConfig(format!(
                "order {} does not fit a {}-byte page (max {})",
                self.order,
                PAGE_SIZE,
                max_record_order()
            )));
        }
        if self.max_pages < 2 {
            return Err(Error::InvalidConfig(
                "max_pages must leave room for metadata and a root".to_string(),
            ));
        }
        if self.max_pages > MAX_PAGES_LIMIT {
            return Err(Error::InvalidConfig(format!(
                "max_pages {} exceeds the bitmap limit of {}",
                self.max_pages, MAX_PAGES_LIMIT
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the tree order
    pub fn order(mut self, order: usize) -> Self {
        self.config.order = order;
        self
    }

    /// Set the maximum page count
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Sync file data after every page flush
    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.config.sync_on_flush = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_record_size() {
        assert_eq!(RECORD_SIZE, 291);
    }

    #[test]
    fn test_max_record_order_fits() {
        let max = max_record_order();
        assert!(node_capacity(max, KEY_SIZE, RECORD_SIZE) <= PAGE_SIZE);
        assert!(node_capacity(max + 1, KEY_SIZE, RECORD_SIZE) > PAGE_SIZE);
        assert_eq!(max, 14);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.order, 4);
        assert_eq!(config.max_pages, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_orders() {
        for order in [0, 2, 3, 5, 7, 16] {
            let config = Config::builder().order(order).build();
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "order {} should be rejected",
                order
            );
        }
    }

    #[test]
    fn test_rejects_bad_max_pages() {
        let config = Config::builder().max_pages(1).build();
        assert!(config.validate().is_err());

        let config = Config::builder().max_pages(MAX_PAGES_LIMIT + 1).build();
        assert!(config.validate().is_err());

        let config = Config::builder().max_pages(MAX_PAGES_LIMIT).build();
        assert!(config.validate().is_ok());
    }
}
