//! Cursor over the table's key order.

use crate::common::Result;
use crate::table::record::Record;
use crate::table::StorageTable;

/// A logical position in key order.
///
/// The cursor stores a key, not a page or slot, so it stays meaningful while
/// the tree splits and merges underneath it. Moving and reading go through
/// [`StorageTable::advance`] and [`StorageTable::cursor_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub(crate) current_key: Option<i32>,
    pub(crate) end_of_table: bool,
}

impl Cursor {
    pub(crate) fn at(key: Option<i32>, end_of_table: bool) -> Self {
        Self {
            current_key: key,
            end_of_table: end_of_table || key.is_none(),
        }
    }

    /// Key the cursor points at.
    pub fn current_key(&self) -> Option<i32> {
        self.current_key
    }

    /// True once the cursor has moved past the last key.
    pub fn is_end(&self) -> bool {
        self.end_of_table
    }
}

/// Records in ascending id order, read one at a time through a [`Cursor`].
///
/// Created by [`StorageTable::rows`]. Stops after the first error.
pub struct Rows<'a> {
    table: &'a mut StorageTable,
    cursor: Cursor,
    failed: bool,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(table: &'a mut StorageTable, cursor: Cursor) -> Self {
        Self {
            table,
            cursor,
            failed: false,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && !self.cursor.is_end() {
            let step = self
                .table
                .cursor_value(&self.cursor)
                .and_then(|value| self.table.advance(&mut self.cursor).map(|()| value));

            match step {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
