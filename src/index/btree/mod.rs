//! B-tree index implementation.
//!
//! - [`BTreeIndex`] - Search, insert-with-split, delete-with-rebalance, ordered
//!   successor lookups
//! - [`Node`] - One node and its page encoding
//! - [`FixedCodec`] - Fixed-width encoding for keys and values

mod codec;
mod node;
mod tree;

pub use codec::{FixedCodec, IndexKey, IndexValue};
pub use node::{encoded_len, max_keys, min_keys, Node};
pub use tree::{BTreeIndex, TreeShape};
