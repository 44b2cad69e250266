//! Index structures.
//!
//! - [`btree`] - Disk-resident B-tree keyed by any [`IndexKey`](btree::IndexKey)

pub mod btree;
