//! Page identifier type.

use std::fmt;

/// Identifies a page in the database file.
///
/// Page 0 is always the metadata page; B-tree nodes live on pages 1 and up.
/// On disk a page number is a signed integer where `-1` means "no page",
/// which has the same bit pattern as [`PageId::INVALID`].
///
/// # Example
/// ```
/// use pagedb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.0, 42);
/// assert_eq!(PageId::from_disk_i32(-1), PageId::INVALID);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Used for the root of an empty tree.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The metadata page.
    pub const META: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Byte offset of this page in the file.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        (self.0 as u64) * (page_size as u64)
    }

    /// Signed 32-bit form used by the metadata page.
    #[inline]
    pub fn to_disk_i32(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub fn from_disk_i32(raw: i32) -> Self {
        if raw < 0 {
            Self::INVALID
        } else {
            PageId(raw as u32)
        }
    }

    /// Signed 64-bit form used inside node pages.
    #[inline]
    pub fn to_disk_i64(self) -> i64 {
        if self.is_valid() {
            self.0 as i64
        } else {
            -1
        }
    }

    /// Parse a 64-bit page number, returning `None` when it cannot name a page.
    #[inline]
    pub fn from_disk_i64(raw: i64) -> Option<Self> {
        if raw < 0 || raw >= u32::MAX as i64 {
            None
        } else {
            Some(PageId(raw as u32))
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(42);
        assert_eq!(pid.0, 42);
        assert!(pid.is_valid());
    }

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
    }

    #[test]
    fn test_disk_forms() {
        assert_eq!(PageId::INVALID.to_disk_i32(), -1);
        assert_eq!(PageId::INVALID.to_disk_i64(), -1);
        assert_eq!(PageId::from_disk_i32(7), PageId::new(7));
        assert_eq!(PageId::from_disk_i64(7), Some(PageId::new(7)));
        assert_eq!(PageId::from_disk_i64(-1), None);
        assert_eq!(PageId::from_disk_i64(i64::MAX), None);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageId::new(3).offset(4096), 3 * 4096);
    }
}
