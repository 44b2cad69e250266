//! Storage layer - page management over the database file.
//!
//! This module handles persistent storage:
//! - [`Pager`] - Page cache, allocation and flushing
//! - [`FreeMap`] - Bitmap of pages in use
//! - [`page`] - The raw page buffer

mod free_map;
pub mod page;
mod pager;
mod stats;

pub use free_map::FreeMap;
pub use pager::Pager;
pub use stats::PagerStats;
