//! StorageTable - the record-level interface over one database file.

use std::path::Path;

use crate::common::config::{Config, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::index::btree::{BTreeIndex, TreeShape};
use crate::storage::{FreeMap, Pager, PagerStats};
use crate::table::cursor::{Cursor, Rows};
use crate::table::meta::Metadata;
use crate::table::record::Record;

/// A single table of [`Record`]s keyed by id.
///
/// Owns the [`Pager`] and the [`BTreeIndex`] for as long as the file is
/// open. After every change to the tree the metadata page (root, order and
/// free bitmap) is rewritten and flushed, so a reopened file sees the same
/// tree without replaying anything.
///
/// # Example
/// ```no_run
/// use pagedb::{Record, StorageTable};
///
/// let mut table = StorageTable::open("users.db").unwrap();
/// table.insert(Record::new(1, "alice", "alice@example.com")).unwrap();
///
/// for record in table.rows().unwrap() {
///     println!("{}", record.unwrap());
/// }
/// table.close().unwrap();
/// ```
pub struct StorageTable {
    pager: Pager,
    index: BTreeIndex<i32, Record>,
}

impl StorageTable {
    /// Open or create a table with the default [`Config`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, Config::default())
    }

    /// Open or create a table.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if `config` fails validation
    /// - `Error::OrderMismatch` if the file was built with another order
    /// - `Error::CorruptMetadata` if page 0 fails its checksum
    pub fn open_with<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        config.validate()?;
        let mut pager = Pager::open(path.as_ref(), &config)?;

        if pager.file_length() == 0 {
            let mut table = Self {
                pager,
                index: BTreeIndex::new(config.order),
            };
            table.persist_metadata()?;
            tracing::info!(path = %path.as_ref().display(), order = config.order, "table created");
            return Ok(table);
        }

        let meta = Metadata::read(pager.get_page(PageId::META)?)?;
        if meta.order != config.order as i32 {
            return Err(Error::OrderMismatch {
                stored: meta.order,
                configured: config.order as i32,
            });
        }
        pager.load_free_map(FreeMap::from_bytes(&meta.free_bitmap, config.max_pages)?);
        if meta.root.is_valid() && !pager.is_allocated(meta.root) {
            return Err(Error::CorruptMetadata(format!(
                "root {} is not an allocated page",
                meta.root
            )));
        }
        let index = BTreeIndex::open(meta.root, config.order);

        tracing::info!(
            path = %path.as_ref().display(),
            root = index.root().to_disk_i32(),
            order = config.order,
            max_pages = pager.max_pages(),
            "table opened"
        );
        Ok(Self { pager, index })
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Insert a record under its id.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if the id is already present
    /// - `Error::TableFull` if the page budget cannot hold the insert
    pub fn insert(&mut self, record: Record) -> Result<()> {
        let id = record.id;
        match self.index.insert(&mut self.pager, id, record) {
            Ok(()) => {}
            Err(Error::NoFreePages) => return Err(Error::TableFull),
            Err(e) => return Err(e),
        }
        self.persist_metadata()?;
        tracing::trace!(id, "record inserted");
        Ok(())
    }

    /// Record stored under `id`, if any.
    pub fn search(&mut self, id: i32) -> Result<Option<Record>> {
        self.index.search(&mut self.pager, &id)
    }

    /// Remove the record under `id`, returning it if it was present.
    pub fn delete(&mut self, id: i32) -> Result<Option<Record>> {
        let removed = self.index.delete(&mut self.pager, &id)?;
        if removed.is_some() {
            self.persist_metadata()?;
            tracing::trace!(id, "record deleted");
        }
        Ok(removed)
    }

    // ========================================================================
    // Cursor
    // ========================================================================

    /// Cursor on the smallest id, or at end-of-table if the table is empty.
    pub fn cursor_start(&mut self) -> Result<Cursor> {
        let key = self.index.min_key(&mut self.pager)?;
        Ok(Cursor::at(key, false))
    }

    /// Cursor on the largest id, flagged end-of-table.
    pub fn cursor_end(&mut self) -> Result<Cursor> {
        let key = self.index.max_key(&mut self.pager)?;
        Ok(Cursor::at(key, true))
    }

    /// Move to the next larger id, or flag end-of-table if there is none.
    pub fn advance(&mut self, cursor: &mut Cursor) -> Result<()> {
        let current = match cursor.current_key {
            Some(key) if !cursor.end_of_table => key,
            _ => {
                cursor.end_of_table = true;
                return Ok(());
            }
        };

        match self.index.next_key(&mut self.pager, &current)? {
            Some(next) => cursor.current_key = Some(next),
            None => cursor.end_of_table = true,
        }
        Ok(())
    }

    /// Record under the cursor, looked up afresh.
    ///
    /// Returns `None` at end-of-table or if the key has since been deleted.
    pub fn cursor_value(&mut self, cursor: &Cursor) -> Result<Option<Record>> {
        match cursor.current_key {
            Some(key) if !cursor.end_of_table => self.search(key),
            _ => Ok(None),
        }
    }

    /// All records in ascending id order.
    pub fn rows(&mut self) -> Result<Rows<'_>> {
        let cursor = self.cursor_start()?;
        Ok(Rows::new(self, cursor))
    }

    // ========================================================================
    // Lifecycle and info
    // ========================================================================

    /// Write root, order and free bitmap to page 0 and flush it.
    fn persist_metadata(&mut self) -> Result<()> {
        let meta = Metadata {
            root: self.index.root(),
            order: self.index.order() as i32,
            free_bitmap: self.pager.free_map().as_bytes().to_vec(),
        };
        meta.write(self.pager.get_page_mut(PageId::META)?)?;
        self.pager.flush(PageId::META, PAGE_SIZE)
    }

    /// Persist metadata, flush every dirty page and release the file.
    pub fn close(mut self) -> Result<()> {
        self.persist_metadata()?;
        let stats = self.pager.stats();
        self.pager.close()?;
        tracing::info!(%stats, "table closed");
        Ok(())
    }

    /// Check every structural invariant of the index.
    pub fn verify(&mut self) -> Result<TreeShape> {
        self.index.verify(&mut self.pager)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn root(&self) -> PageId {
        self.index.root()
    }

    pub fn order(&self) -> usize {
        self.index.order()
    }

    /// Pages still available to the index.
    pub fn free_pages(&self) -> u32 {
        self.pager.free_page_count()
    }

    pub fn stats(&self) -> PagerStats {
        self.pager.stats()
    }
}
