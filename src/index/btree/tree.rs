//! Disk-resident B-tree index.
//!
//! The [`Pager`] is the node arena: every child reference is a page number,
//! and every node is decoded fresh from its page when the tree needs it.
//! [`BTreeIndex`] itself only remembers the root page and the order.

use std::marker::PhantomData;

use crate::common::{Error, PageId, Result};
use crate::index::btree::codec::{IndexKey, IndexValue};
use crate::index::btree::node::{max_keys, min_keys, Node};
use crate::storage::Pager;

/// Shape reported by [`BTreeIndex::verify`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeShape {
    /// Levels from root to leaf; 0 for an empty tree.
    pub height: usize,
    /// Number of node pages.
    pub nodes: usize,
    /// Number of keys across all nodes.
    pub keys: usize,
}

/// Ordered key → value index stored as one node per page.
///
/// # Invariants
/// - `root` is [`PageId::INVALID`] exactly when the tree is empty
/// - keys within a node are strictly ascending and unique across the tree
/// - every non-root node holds between ⌈order/2⌉−1 and order−1 keys
/// - all leaves sit at the same depth
///
/// # Example
/// ```no_run
/// use pagedb::index::btree::BTreeIndex;
/// use pagedb::storage::Pager;
/// use pagedb::Config;
///
/// let config = Config::default();
/// let mut pager = Pager::open("index.db", &config).unwrap();
/// let mut index: BTreeIndex<i32, u64> = BTreeIndex::new(config.order);
///
/// index.insert(&mut pager, 7, 700).unwrap();
/// assert_eq!(index.search(&mut pager, &7).unwrap(), Some(700));
/// ```
#[derive(Debug)]
pub struct BTreeIndex<K, V> {
    root: PageId,
    order: usize,
    _marker: PhantomData<(K, V)>,
}

impl<K: IndexKey, V: IndexValue> BTreeIndex<K, V> {
    /// An empty tree.
    pub fn new(order: usize) -> Self {
        Self::open(PageId::INVALID, order)
    }

    /// A tree whose root already lives on `root`.
    pub fn open(root: PageId, order: usize) -> Self {
        Self {
            root,
            order,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn root(&self) -> PageId {
        self.root
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.root.is_valid()
    }

    // ========================================================================
    // Node I/O
    // ========================================================================

    fn read_node(&self, pager: &mut Pager, page_id: PageId) -> Result<Node<K, V>> {
        if !pager.is_allocated(page_id) {
            return Err(Error::NullPageAccess(page_id.0));
        }
        let node = Node::decode(page_id, pager.get_page(page_id)?.as_slice())?;
        if node.order != self.order {
            return Err(Error::CorruptNode {
                page: page_id.0,
                reason: format!("node order {} in a tree of order {}", node.order, self.order),
            });
        }
        Ok(node)
    }

    /// Encode a node into its page and flush the encoded bytes.
    fn write_node(&self, pager: &mut Pager, node: &Node<K, V>) -> Result<()> {
        let bytes = node.encode()?;
        let page = pager.get_page_mut(node.page_id)?;
        page.as_mut_slice()[..bytes.len()].copy_from_slice(&bytes);
        pager.flush(node.page_id, bytes.len())
    }

    fn allocate_node(&self, pager: &mut Pager, is_leaf: bool) -> Result<Node<K, V>> {
        let page_id = pager.allocate_free_page()?;
        Ok(Node::new(page_id, self.order, is_leaf))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Value stored under `key`, if any.
    pub fn search(&self, pager: &mut Pager, key: &K) -> Result<Option<V>> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut page_id = self.root;
        loop {
            let node = self.read_node(pager, page_id)?;
            match node.search(key) {
                Ok(idx) => return Ok(Some(node.values[idx].clone())),
                Err(_) if node.is_leaf => return Ok(None),
                Err(idx) => page_id = node.children[idx],
            }
        }
    }

    /// Smallest key in the tree.
    pub fn min_key(&self, pager: &mut Pager) -> Result<Option<K>> {
        if self.is_empty() {
            return Ok(None);
        }
        let node = self.read_node(pager, self.root)?;
        Ok(self.leftmost_entry(pager, node)?.map(|(k, _)| k))
    }

    /// Largest key in the tree.
    pub fn max_key(&self, pager: &mut Pager) -> Result<Option<K>> {
        if self.is_empty() {
            return Ok(None);
        }
        let node = self.read_node(pager, self.root)?;
        Ok(self.rightmost_entry(pager, node)?.map(|(k, _)| k))
    }

    /// Smallest key strictly greater than `key`.
    ///
    /// Walks a single root-to-leaf path; the closest greater key seen at a
    /// higher level is the answer unless a deeper level offers a closer one.
    pub fn next_key(&self, pager: &mut Pager, key: &K) -> Result<Option<K>> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut best = None;
        let mut page_id = self.root;
        loop {
            let node = self.read_node(pager, page_id)?;
            let idx = node.keys.partition_point(|k| k <= key);
            if idx < node.len() {
                best = Some(node.keys[idx]);
            }
            if node.is_leaf {
                return Ok(best);
            }
            page_id = node.children[idx];
        }
    }

    fn leftmost_entry(&self, pager: &mut Pager, mut node: Node<K, V>) -> Result<Option<(K, V)>> {
        while !node.is_leaf {
            node = self.read_node(pager, node.children[0])?;
        }
        Ok(node.keys.first().copied().zip(node.values.first().cloned()))
    }

    fn rightmost_entry(&self, pager: &mut Pager, mut node: Node<K, V>) -> Result<Option<(K, V)>> {
        while !node.is_leaf {
            let last = node.children.len() - 1;
            node = self.read_node(pager, node.children[last])?;
        }
        Ok(node.keys.last().copied().zip(node.values.last().cloned()))
    }

    /// Levels from root to leaf; 0 when empty.
    pub fn height(&self, pager: &mut Pager) -> Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let mut height = 1;
        let mut node = self.read_node(pager, self.root)?;
        while !node.is_leaf {
            node = self.read_node(pager, node.children[0])?;
            height += 1;
        }
        Ok(height)
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert a new key.
    ///
    /// Full nodes are split on the way down, so the leaf that receives the key
    /// always has room and no split ever propagates upward.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if `key` is already present; the tree is unchanged
    /// - `Error::TableFull` if the worst-case number of splits would need
    ///   more pages than remain; the tree is unchanged
    pub fn insert(&mut self, pager: &mut Pager, key: K, value: V) -> Result<()> {
        if self.search(pager, &key)?.is_some() {
            return Err(Error::DuplicateKey(format!("{:?}", key)));
        }

        // One page per level that may split, plus a new root
        let needed = self.height(pager)? + 1;
        if (pager.free_page_count() as usize) < needed {
            return Err(Error::TableFull);
        }

        if self.is_empty() {
            let mut root = self.allocate_node(pager, true)?;
            root.keys.push(key);
            root.values.push(value);
            self.write_node(pager, &root)?;
            self.root = root.page_id;
            tracing::debug!(root = root.page_id.0, "tree created");
            return Ok(());
        }

        let mut root = self.read_node(pager, self.root)?;
        if root.is_full() {
            let mut new_root = self.allocate_node(pager, false)?;
            new_root.children.push(root.page_id);
            self.split_child(pager, &mut new_root, 0)?;
            tracing::debug!(old = root.page_id.0, new = new_root.page_id.0, "root split");
            self.root = new_root.page_id;
            root = new_root;
        }

        self.insert_non_full(pager, root, key, value)
    }

    fn insert_non_full(&self, pager: &mut Pager, mut node: Node<K, V>, key: K, value: V) -> Result<()> {
        loop {
            let mut idx = match node.search(&key) {
                Ok(_) => return Err(Error::DuplicateKey(format!("{:?}", key))),
                Err(idx) => idx,
            };

            if node.is_leaf {
                node.keys.insert(idx, key);
                node.values.insert(idx, value);
                return self.write_node(pager, &node);
            }

            let mut child = self.read_node(pager, node.children[idx])?;
            if child.is_full() {
                self.split_child(pager, &mut node, idx)?;
                if key > node.keys[idx] {
                    idx += 1;
                }
                child = self.read_node(pager, node.children[idx])?;
            }
            node = child;
        }
    }

    /// Split the full child at `idx` of `parent`.
    ///
    /// With t = ⌊(order−1)/2⌋ the child keeps keys `0..t`, key `t` moves up
    /// into `parent`, and keys after `t` (with the last t+1 children) move to
    /// a newly allocated right sibling. All three pages are written.
    fn split_child(&self, pager: &mut Pager, parent: &mut Node<K, V>, idx: usize) -> Result<()> {
        let mut left = self.read_node(pager, parent.children[idx])?;
        let mut right = self.allocate_node(pager, left.is_leaf)?;
        let t = (self.order - 1) / 2;

        right.keys = left.keys.split_off(t + 1);
        right.values = left.values.split_off(t + 1);
        let (median_key, median_value) = match (left.keys.pop(), left.values.pop()) {
            (Some(k), Some(v)) => (k, v),
            _ => {
                return Err(Error::CorruptNode {
                    page: left.page_id.0,
                    reason: "split of a node with too few keys".to_string(),
                })
            }
        };
        if !left.is_leaf {
            right.children = left.children.split_off(t + 1);
        }

        parent.keys.insert(idx, median_key);
        parent.values.insert(idx, median_value);
        parent.children.insert(idx + 1, right.page_id);

        self.write_node(pager, &left)?;
        self.write_node(pager, &right)?;
        self.write_node(pager, parent)?;

        tracing::debug!(
            parent = parent.page_id.0,
            left = left.page_id.0,
            right = right.page_id.0,
            "node split"
        );
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Remove `key`, returning its value if it was present.
    ///
    /// Underfull nodes left behind are fixed on the way back up by borrowing
    /// from a sibling or merging with one. An emptied internal root is
    /// replaced by its only child; an emptied leaf root empties the tree.
    pub fn delete(&mut self, pager: &mut Pager, key: &K) -> Result<Option<V>> {
        if self.is_empty() {
            return Ok(None);
        }

        let removed = self.delete_from(pager, self.root, key)?;
        if removed.is_none() {
            return Ok(None);
        }

        let root = self.read_node(pager, self.root)?;
        if root.is_empty() {
            let old_root = root.page_id;
            if root.is_leaf {
                self.root = PageId::INVALID;
                tracing::debug!(old = old_root.0, "tree emptied");
            } else {
                self.root = root.children[0];
                tracing::debug!(old = old_root.0, new = self.root.0, "root collapsed");
            }
            pager.free_page(old_root)?;
        }

        Ok(removed)
    }

    fn delete_from(&self, pager: &mut Pager, page_id: PageId, key: &K) -> Result<Option<V>> {
        let mut node = self.read_node(pager, page_id)?;

        match node.search(key) {
            Ok(idx) if node.is_leaf => {
                node.keys.remove(idx);
                let value = node.values.remove(idx);
                self.write_node(pager, &node)?;
                Ok(Some(value))
            }
            Ok(idx) => {
                let min = min_keys(self.order);
                let left = self.read_node(pager, node.children[idx])?;
                let right = self.read_node(pager, node.children[idx + 1])?;

                // Take the predecessor unless only the right side can spare a key
                let (child_idx, replacement) = if left.len() > min || right.len() <= min {
                    (idx, self.rightmost_entry(pager, left)?)
                } else {
                    (idx + 1, self.leftmost_entry(pager, right)?)
                };
                let (rep_key, rep_value) = replacement.ok_or_else(|| Error::CorruptNode {
                    page: node.children[child_idx].0,
                    reason: "empty subtree under an internal key".to_string(),
                })?;

                node.keys[idx] = rep_key;
                let removed = std::mem::replace(&mut node.values[idx], rep_value);
                self.write_node(pager, &node)?;

                self.delete_from(pager, node.children[child_idx], &rep_key)?;
                self.rebalance(pager, page_id, child_idx)?;
                Ok(Some(removed))
            }
            Err(_) if node.is_leaf => Ok(None),
            Err(idx) => {
                let removed = self.delete_from(pager, node.children[idx], key)?;
                if removed.is_some() {
                    self.rebalance(pager, page_id, idx)?;
                }
                Ok(removed)
            }
        }
    }

    /// Restore the minimum fill of child `idx` of the node on `parent_id`.
    fn rebalance(&self, pager: &mut Pager, parent_id: PageId, idx: usize) -> Result<()> {
        let min = min_keys(self.order);
        let mut parent = self.read_node(pager, parent_id)?;
        let mut child = self.read_node(pager, parent.children[idx])?;
        if child.len() >= min {
            return Ok(());
        }

        let left = if idx > 0 {
            Some(self.read_node(pager, parent.children[idx - 1])?)
        } else {
            None
        };
        if let Some(mut left) = left.filter(|l| l.len() > min) {
            // Rotate right: parent separator down, left's last key up
            let (Some(up_key), Some(up_value)) = (left.keys.pop(), left.values.pop()) else {
                return Err(self.underflow(&left));
            };
            let down_key = std::mem::replace(&mut parent.keys[idx - 1], up_key);
            let down_value = std::mem::replace(&mut parent.values[idx - 1], up_value);
            child.keys.insert(0, down_key);
            child.values.insert(0, down_value);
            if !child.is_leaf {
                let moved = left.children.pop().ok_or_else(|| self.underflow(&left))?;
                child.children.insert(0, moved);
            }

            self.write_node(pager, &left)?;
            self.write_node(pager, &child)?;
            self.write_node(pager, &parent)?;
            tracing::debug!(from = left.page_id.0, to = child.page_id.0, "borrowed from left");
            return Ok(());
        }

        let right = if idx < parent.len() {
            Some(self.read_node(pager, parent.children[idx + 1])?)
        } else {
            None
        };
        if let Some(mut right) = right.filter(|r| r.len() > min) {
            // Rotate left: parent separator down, right's first key up
            let up_key = right.keys.remove(0);
            let up_value = right.values.remove(0);
            let down_key = std::mem::replace(&mut parent.keys[idx], up_key);
            let down_value = std::mem::replace(&mut parent.values[idx], up_value);
            child.keys.push(down_key);
            child.values.push(down_value);
            if !child.is_leaf {
                child.children.push(right.children.remove(0));
            }

            self.write_node(pager, &right)?;
            self.write_node(pager, &child)?;
            self.write_node(pager, &parent)?;
            tracing::debug!(from = right.page_id.0, to = child.page_id.0, "borrowed from right");
            return Ok(());
        }

        // Neither sibling can spare a key
        if idx > 0 {
            let left = self.read_node(pager, parent.children[idx - 1])?;
            self.merge(pager, parent, left, child, idx - 1)
        } else {
            let right = self.read_node(pager, parent.children[idx + 1])?;
            self.merge(pager, parent, child, right, idx)
        }
    }

    /// Fold `right` and the separator at `sep` into `left`, then free `right`.
    fn merge(
        &self,
        pager: &mut Pager,
        mut parent: Node<K, V>,
        mut left: Node<K, V>,
        right: Node<K, V>,
        sep: usize,
    ) -> Result<()> {
        left.keys.push(parent.keys.remove(sep));
        left.values.push(parent.values.remove(sep));
        parent.children.remove(sep + 1);

        let freed = right.page_id;
        left.keys.extend(right.keys);
        left.values.extend(right.values);
        left.children.extend(right.children);

        self.write_node(pager, &left)?;
        self.write_node(pager, &parent)?;
        pager.free_page(freed)?;

        tracing::debug!(into = left.page_id.0, freed = freed.0, "nodes merged");
        Ok(())
    }

    fn underflow(&self, node: &Node<K, V>) -> Error {
        Error::CorruptNode {
            page: node.page_id.0,
            reason: "sibling ran out of keys while lending".to_string(),
        }
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Walk the whole tree and check every structural invariant.
    ///
    /// # Errors
    /// `Error::CorruptNode` naming the first page that breaks an invariant.
    pub fn verify(&self, pager: &mut Pager) -> Result<TreeShape> {
        if self.is_empty() {
            return Ok(TreeShape::default());
        }

        let mut shape = TreeShape::default();
        let mut leaf_depth = None;
        self.verify_node(pager, self.root, 1, None, None, &mut leaf_depth, &mut shape)?;
        shape.height = leaf_depth.unwrap_or(0);
        Ok(shape)
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_node(
        &self,
        pager: &mut Pager,
        page_id: PageId,
        depth: usize,
        lower: Option<K>,
        upper: Option<K>,
        leaf_depth: &mut Option<usize>,
        shape: &mut TreeShape,
    ) -> Result<()> {
        let node = self.read_node(pager, page_id)?;
        let fail = |reason: String| Error::CorruptNode {
            page: page_id.0,
            reason,
        };

        let is_root = page_id == self.root;
        if node.len() > max_keys(self.order) {
            return Err(fail(format!("{} keys exceeds the maximum", node.len())));
        }
        if is_root && node.is_empty() {
            return Err(fail("empty root".to_string()));
        }
        if !is_root && node.len() < min_keys(self.order) {
            return Err(fail(format!("{} keys is below the minimum", node.len())));
        }
        if let (Some(lo), Some(first)) = (lower, node.keys.first()) {
            if *first <= lo {
                return Err(fail(format!("key {:?} not above bound {:?}", first, lo)));
            }
        }
        if let (Some(hi), Some(last)) = (upper, node.keys.last()) {
            if *last >= hi {
                return Err(fail(format!("key {:?} not below bound {:?}", last, hi)));
            }
        }

        shape.nodes += 1;
        shape.keys += node.len();

        if node.is_leaf {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(fail(format!("leaf at depth {} but others at {}", depth, d)))
                }
                Some(_) => {}
            }
            return Ok(());
        }

        for (i, &child) in node.children.iter().enumerate() {
            let lo = if i == 0 { lower } else { Some(node.keys[i - 1]) };
            let hi = if i == node.len() { upper } else { Some(node.keys[i]) };
            self.verify_node(pager, child, depth + 1, lo, hi, leaf_depth, shape)?;
        }
        Ok(())
    }
}
