//! Table layer - records, metadata and cursors over the B-tree index.
//!
//! - [`StorageTable`] - Open/close, insert/search/delete, cursor movement
//! - [`Record`] - The fixed 291-byte row
//! - [`Cursor`] - A key-order position that survives tree restructuring
//! - [`Metadata`] - Page 0: root, order and free bitmap

mod cursor;
mod meta;
mod record;
#[allow(clippy::module_inception)]
mod table;

pub use cursor::{Cursor, Rows};
pub use meta::Metadata;
pub use record::Record;
pub use table::StorageTable;
