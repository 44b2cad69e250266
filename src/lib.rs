//! pagedb - An embedded record store on a disk-resident B-tree.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             pagedb                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Table Layer (table/)                        │   │
//! │  │     StorageTable + Record + Cursor + Metadata page       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                        │   │
//! │  │   BTreeIndex: split on descent, borrow/merge on delete   │   │
//! │  │         Node codec + FixedCodec keys and values          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │     Pager + FreeMap + Page + PagerStats                  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`storage`] - Page cache, free-page bitmap and file I/O
//! - [`index`] - The B-tree
//! - [`table`] - Records, metadata and cursors
//!
//! # Quick Start
//! ```no_run
//! use pagedb::{Config, Record, StorageTable};
//!
//! let config = Config::builder().order(4).max_pages(100).build();
//! let mut table = StorageTable::open_with("my_database.db", config).unwrap();
//!
//! table.insert(Record::new(1, "alice", "alice@example.com")).unwrap();
//! assert!(table.search(1).unwrap().is_some());
//!
//! table.close().unwrap();
//! ```

pub mod common;
pub mod index;
pub mod storage;
pub mod table;

// Re-export commonly used items at crate root for convenience
pub use common::config::{Config, PAGE_SIZE};
pub use common::{Error, PageId, Result};

pub use index::btree::BTreeIndex;
pub use storage::Pager;
pub use table::{Cursor, Record, StorageTable};
