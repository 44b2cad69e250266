//! B-tree node and its page encoding.
//!
//! # Layout
//! ```text
//! Offset  Size                 Field
//! ------  -------------------  -----
//! 0       4                    order (i32)
//! 4       4                    size = number of keys (i32)
//! 8       1                    leaf flag (0 or 1)
//! 9       8                    page number of this node (i64)
//! 17      size × (K + V)       (key, value) pairs in ascending key order
//! ...     (size + 1) × 8       child page numbers (i64), internal nodes only
//! ```
//! All integers are little-endian.

use crate::common::config::{CHILD_POINTER_SIZE, NODE_HEADER_SIZE};
use crate::common::{Error, PageId, Result};
use crate::index::btree::codec::{IndexKey, IndexValue};

/// Fewest keys a non-root node of `order` may hold: ⌈order/2⌉ − 1.
pub fn min_keys(order: usize) -> usize {
    order.div_ceil(2) - 1
}

/// Most keys any node of `order` may hold.
pub fn max_keys(order: usize) -> usize {
    order - 1
}

/// Encoded size of a node holding `len` keys.
pub fn encoded_len<K: IndexKey, V: IndexValue>(len: usize, is_leaf: bool) -> usize {
    let pairs = len * (K::ENCODED_SIZE + V::ENCODED_SIZE);
    let children = if is_leaf { 0 } else { (len + 1) * CHILD_POINTER_SIZE };
    NODE_HEADER_SIZE + pairs + children
}

/// Most keys an internal node can hold within `buf_len` bytes.
fn max_fitting_keys<K: IndexKey, V: IndexValue>(buf_len: usize) -> usize {
    let fixed = NODE_HEADER_SIZE + CHILD_POINTER_SIZE;
    let per_key = K::ENCODED_SIZE + V::ENCODED_SIZE + CHILD_POINTER_SIZE;
    buf_len.saturating_sub(fixed) / per_key
}

/// One B-tree vertex, decoded from exactly one page.
///
/// A node is a short-lived copy: the tree reads it, changes it and writes it
/// back within a single operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<K, V> {
    pub page_id: PageId,
    pub order: usize,
    pub is_leaf: bool,
    pub keys: Vec<K>,
    pub values: Vec<V>,
    /// `keys.len() + 1` entries for internal nodes, empty for leaves.
    pub children: Vec<PageId>,
}

impl<K: IndexKey, V: IndexValue> Node<K, V> {
    pub fn new(page_id: PageId, order: usize, is_leaf: bool) -> Self {
        Self {
            page_id,
            order,
            is_leaf,
            keys: Vec::with_capacity(order - 1),
            values: Vec::with_capacity(order - 1),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.keys.len() >= max_keys(self.order)
    }

    /// `Ok(i)` if `key` sits at slot `i`, otherwise `Err(i)` with the child
    /// slot to descend into.
    #[inline]
    pub fn search(&self, key: &K) -> std::result::Result<usize, usize> {
        self.keys.binary_search(key)
    }

    pub fn encoded_len(&self) -> usize {
        encoded_len::<K, V>(self.keys.len(), self.is_leaf)
    }

    /// Encode into a new buffer of exactly [`encoded_len`](Self::encoded_len) bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.keys.len() != self.values.len() {
            return Err(self.corrupt("key and value counts differ"));
        }
        let expected_children = if self.is_leaf { 0 } else { self.keys.len() + 1 };
        if self.children.len() != expected_children {
            return Err(self.corrupt(format!(
                "{} children for {} keys",
                self.children.len(),
                self.keys.len()
            )));
        }

        let mut buf = vec![0u8; self.encoded_len()];
        let mut pos = 0;
        put(&mut buf, &mut pos, &(self.order as i32).to_le_bytes());
        put(&mut buf, &mut pos, &(self.keys.len() as i32).to_le_bytes());
        put(&mut buf, &mut pos, &[self.is_leaf as u8]);
        put(&mut buf, &mut pos, &self.page_id.to_disk_i64().to_le_bytes());

        for (key, value) in self.keys.iter().zip(&self.values) {
            key.encode_into(&mut buf[pos..pos + K::ENCODED_SIZE]);
            pos += K::ENCODED_SIZE;
            value.encode_into(&mut buf[pos..pos + V::ENCODED_SIZE]);
            pos += V::ENCODED_SIZE;
        }
        for child in &self.children {
            put(&mut buf, &mut pos, &child.to_disk_i64().to_le_bytes());
        }

        Ok(buf)
    }

    /// Decode the node stored on `page_id`.
    ///
    /// # Errors
    /// `Error::CorruptNode` when the order is too large for the buffer, the
    /// header disagrees with the buffer length,
    /// the leaf flag is not 0/1, keys are not strictly ascending, or the node
    /// claims a different page.
    pub fn decode(page_id: PageId, buf: &[u8]) -> Result<Self> {
        let corrupt = |reason: String| Error::CorruptNode {
            page: page_id.0,
            reason,
        };
        if buf.len() < NODE_HEADER_SIZE {
            return Err(corrupt(format!("{} bytes is shorter than a header", buf.len())));
        }

        let order = i32::from_le_bytes(take(buf, 0));
        let size = i32::from_le_bytes(take(buf, 4));
        let flag = buf[8];
        let stored_page = i64::from_le_bytes(take(buf, 9));

        if order < 3 {
            return Err(corrupt(format!("order {}", order)));
        }
        let order = order as usize;
        if order - 1 > max_fitting_keys::<K, V>(buf.len()) {
            return Err(corrupt(format!(
                "order {} cannot fit a {}-byte buffer",
                order,
                buf.len()
            )));
        }
        if size < 0 || size as usize > max_keys(order) {
            return Err(corrupt(format!("size {} for order {}", size, order)));
        }
        let size = size as usize;
        let is_leaf = match flag {
            0 => false,
            1 => true,
            other => return Err(corrupt(format!("leaf flag {}", other))),
        };
        if PageId::from_disk_i64(stored_page) != Some(page_id) {
            return Err(corrupt(format!("node claims page {}", stored_page)));
        }
        let needed = encoded_len::<K, V>(size, is_leaf);
        if needed > buf.len() {
            return Err(corrupt(format!(
                "size {} needs {} bytes, buffer has {}",
                size,
                needed,
                buf.len()
            )));
        }

        let mut node = Node {
            page_id,
            order,
            is_leaf,
            keys: Vec::with_capacity(size),
            values: Vec::with_capacity(size),
            children: Vec::new(),
        };
        let mut pos = NODE_HEADER_SIZE;
        for _ in 0..size {
            let key = K::decode_from(&buf[pos..pos + K::ENCODED_SIZE])
                .map_err(|e| corrupt(e.to_string()))?;
            pos += K::ENCODED_SIZE;
            let value = V::decode_from(&buf[pos..pos + V::ENCODED_SIZE])
                .map_err(|e| corrupt(e.to_string()))?;
            pos += V::ENCODED_SIZE;

            if node.keys.last().is_some_and(|last| *last >= key) {
                return Err(corrupt("keys not strictly ascending".to_string()));
            }
            node.keys.push(key);
            node.values.push(value);
        }
        if !is_leaf {
            for _ in 0..=size {
                let raw = i64::from_le_bytes(take(buf, pos));
                pos += CHILD_POINTER_SIZE;
                let child = PageId::from_disk_i64(raw)
                    .ok_or_else(|| corrupt(format!("child pointer {}", raw)))?;
                node.children.push(child);
            }
        }

        Ok(node)
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::CorruptNode {
            page: self.page_id.0,
            reason: reason.into(),
        }
    }
}

fn put(buf: &mut [u8], pos: &mut usize, bytes: &[u8]) {
    buf[*pos..*pos + bytes.len()].copy_from_slice(bytes);
    *pos += bytes.len();
}

/// Copy `N` bytes starting at `pos`; callers have checked the length.
fn take<const N: usize>(buf: &[u8], pos: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[pos..pos + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{max_record_order, PAGE_SIZE};
    use crate::table::Record;

    type TestNode = Node<i32, u64>;

    fn leaf(page: u32, keys: &[i32]) -> TestNode {
        let mut node = Node::new(PageId::new(page), 4, true);
        for &k in keys {
            node.keys.push(k);
            node.values.push(k as u64 * 100);
        }
        node
    }

    #[test]
    fn test_min_max_keys() {
        assert_eq!(min_keys(4), 1);
        assert_eq!(max_keys(4), 3);
        assert_eq!(min_keys(6), 2);
        assert_eq!(min_keys(14), 6);
    }

    #[test]
    fn test_leaf_roundtrip() {
        let node = leaf(3, &[1, 5, 9]);
        let bytes = node.encode().unwrap();
        assert_eq!(bytes.len(), NODE_HEADER_SIZE + 3 * 12);

        let decoded = TestNode::decode(PageId::new(3), &bytes).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_internal_roundtrip_in_page_buffer() {
        let mut node = leaf(7, &[10, 20]);
        node.is_leaf = false;
        node.children = vec![PageId::new(1), PageId::new(2), PageId::new(9)];

        let bytes = node.encode().unwrap();
        let mut page = vec![0xEEu8; PAGE_SIZE];
        page[..bytes.len()].copy_from_slice(&bytes);

        // Trailing garbage past the declared size is ignored
        let decoded = TestNode::decode(PageId::new(7), &page).unwrap();
        assert_eq!(decoded.children, node.children);
        assert_eq!(decoded.keys, vec![10, 20]);
        assert!(!decoded.is_leaf);
    }

    #[test]
    fn test_empty_leaf_roundtrip() {
        let node = leaf(2, &[]);
        let decoded = TestNode::decode(PageId::new(2), &node.encode().unwrap()).unwrap();
        assert!(decoded.is_empty());
        assert!(decoded.is_leaf);
    }

    #[test]
    fn test_header_layout() {
        let bytes = leaf(5, &[1]).encode().unwrap();
        assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(bytes[8], 1);
        assert_eq!(&bytes[9..17], &5i64.to_le_bytes());
    }

    #[test]
    fn test_encode_rejects_bad_child_count() {
        let mut node = leaf(1, &[1, 2]);
        node.is_leaf = false;
        node.children = vec![PageId::new(2)];
        assert!(matches!(node.encode(), Err(Error::CorruptNode { .. })));
    }

    #[test]
    fn test_decode_zeroed_page_is_corrupt() {
        let page = vec![0u8; PAGE_SIZE];
        assert!(matches!(
            TestNode::decode(PageId::new(1), &page),
            Err(Error::CorruptNode { page: 1, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_count() {
        let mut bytes = leaf(1, &[1]).encode().unwrap();
        bytes[4..8].copy_from_slice(&7i32.to_le_bytes());
        assert!(TestNode::decode(PageId::new(1), &bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_buffer() {
        let bytes = leaf(1, &[1, 2, 3]).encode().unwrap();
        let result = TestNode::decode(PageId::new(1), &bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(Error::CorruptNode { .. })));
    }

    #[test]
    fn test_decode_rejects_absurd_order() {
        let mut page = vec![0u8; PAGE_SIZE];
        page[0..4].copy_from_slice(&i32::MAX.to_le_bytes());
        page[8] = 1;
        page[9..17].copy_from_slice(&1i64.to_le_bytes());

        let result = Node::<i32, Record>::decode(PageId::new(1), &page);
        assert!(matches!(result, Err(Error::CorruptNode { page: 1, .. })));
    }

    #[test]
    fn test_decode_accepts_largest_fitting_order() {
        let node: Node<i32, Record> = Node::new(PageId::new(1), max_record_order(), true);
        let bytes = node.encode().unwrap();
        let mut page = vec![0u8; PAGE_SIZE];
        page[..bytes.len()].copy_from_slice(&bytes);
        assert!(Node::<i32, Record>::decode(PageId::new(1), &page).is_ok());

        page[0..4].copy_from_slice(&(max_record_order() as i32 + 2).to_le_bytes());
        assert!(Node::<i32, Record>::decode(PageId::new(1), &page).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_flag() {
        let mut bytes = leaf(1, &[1]).encode().unwrap();
        bytes[8] = 2;
        assert!(TestNode::decode(PageId::new(1), &bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_page() {
        let bytes = leaf(1, &[1]).encode().unwrap();
        assert!(TestNode::decode(PageId::new(2), &bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_unordered_keys() {
        let mut node = leaf(1, &[1, 2]);
        node.keys.swap(0, 1);
        let bytes = node.encode().unwrap();
        assert!(TestNode::decode(PageId::new(1), &bytes).is_err());
    }

    #[test]
    fn test_search_slots() {
        let node = leaf(1, &[10, 20, 30]);
        assert_eq!(node.search(&20), Ok(1));
        assert_eq!(node.search(&5), Err(0));
        assert_eq!(node.search(&25), Err(2));
        assert_eq!(node.search(&99), Err(3));
        assert!(node.is_full());
    }
}
