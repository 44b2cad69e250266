//! Metadata page (page 0) layout.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     root page number (i32, -1 for an empty tree)
//! 4       4     tree order (i32)
//! 8       4     free bitmap length in bytes (u32)
//! 12      n     free bitmap, one bit per page, set = in use
//! 4092    4     CRC32 of bytes 0..4092
//! ```

use crate::common::config::{
    META_BITMAP_LEN_OFFSET, META_BITMAP_OFFSET, META_CHECKSUM_OFFSET, META_ORDER_OFFSET,
    META_ROOT_OFFSET,
};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Decoded contents of the metadata page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub root: PageId,
    pub order: i32,
    pub free_bitmap: Vec<u8>,
}

impl Metadata {
    /// Parse and checksum-verify the metadata page.
    pub fn read(page: &Page) -> Result<Self> {
        let stored = page.read_u32_at(META_CHECKSUM_OFFSET);
        let computed = page.checksum(META_CHECKSUM_OFFSET);
        if stored != computed {
            return Err(Error::CorruptMetadata(format!(
                "checksum {:#010x} does not match contents {:#010x}",
                stored, computed
            )));
        }

        let root = page.read_i32_at(META_ROOT_OFFSET);
        if root < -1 || root == 0 {
            return Err(Error::CorruptMetadata(format!("root page {}", root)));
        }
        let order = page.read_i32_at(META_ORDER_OFFSET);
        let bitmap_len = page.read_u32_at(META_BITMAP_LEN_OFFSET) as usize;
        if META_BITMAP_OFFSET + bitmap_len > META_CHECKSUM_OFFSET {
            return Err(Error::CorruptMetadata(format!(
                "bitmap of {} bytes overruns the page",
                bitmap_len
            )));
        }

        Ok(Self {
            root: PageId::from_disk_i32(root),
            order,
            free_bitmap: page.as_slice()[META_BITMAP_OFFSET..META_BITMAP_OFFSET + bitmap_len]
                .to_vec(),
        })
    }

    /// Lay out the metadata and seal it with a checksum.
    pub fn write(&self, page: &mut Page) -> Result<()> {
        let len = self.free_bitmap.len();
        if META_BITMAP_OFFSET + len > META_CHECKSUM_OFFSET {
            return Err(Error::InvalidConfig(format!(
                "bitmap of {} bytes does not fit the metadata page",
                len
            )));
        }

        page.reset();
        page.write_i32_at(META_ROOT_OFFSET, self.root.to_disk_i32());
        page.write_i32_at(META_ORDER_OFFSET, self.order);
        page.write_u32_at(META_BITMAP_LEN_OFFSET, len as u32);
        page.as_mut_slice()[META_BITMAP_OFFSET..META_BITMAP_OFFSET + len]
            .copy_from_slice(&self.free_bitmap);

        let checksum = page.checksum(META_CHECKSUM_OFFSET);
        page.write_u32_at(META_CHECKSUM_OFFSET, checksum);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            root: PageId::new(3),
            order: 4,
            free_bitmap: vec![0b0000_1111, 0, 0b1000_0000],
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut page = Page::new();
        sample().write(&mut page).unwrap();
        assert_eq!(Metadata::read(&page).unwrap(), sample());
    }

    #[test]
    fn test_empty_tree_root_is_minus_one() {
        let meta = Metadata {
            root: PageId::INVALID,
            order: 4,
            free_bitmap: vec![1],
        };
        let mut page = Page::new();
        meta.write(&mut page).unwrap();

        assert_eq!(page.read_i32_at(0), -1);
        assert_eq!(page.read_i32_at(4), 4);
        assert_eq!(Metadata::read(&page).unwrap().root, PageId::INVALID);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut page = Page::new();
        sample().write(&mut page).unwrap();
        page.as_mut_slice()[5] ^= 0x01;

        assert!(matches!(
            Metadata::read(&page),
            Err(Error::CorruptMetadata(_))
        ));
    }

    #[test]
    fn test_zeroed_page_is_corrupt() {
        // CRC32 of zeros is not zero
        assert!(Metadata::read(&Page::new()).is_err());
    }

    #[test]
    fn test_oversized_bitmap_rejected() {
        let meta = Metadata {
            root: PageId::INVALID,
            order: 4,
            free_bitmap: vec![0; 5000],
        };
        assert!(meta.write(&mut Page::new()).is_err());
    }
}
