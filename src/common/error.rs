//! Error types for pagedb.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pagedb.
///
/// Pager and codec errors are never recovered internally; they travel up to
/// the caller of [`StorageTable`](crate::table::StorageTable) unchanged.
///
/// A key that is not present is not an error: `search` and `delete` report it
/// as `None`.
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Page Manager Errors
    // -------------------------------------------------------------------------
    /// Page number lies at or beyond the configured maximum page count.
    #[error("Page {page} out of range (max pages: {max_pages})")]
    PageOutOfRange { page: u32, max_pages: u32 },

    /// Every page within the configured maximum is in use.
    #[error("No free pages available")]
    NoFreePages,

    /// Operation on a page that was never allocated or loaded.
    #[error("Access to null page {0}")]
    NullPageAccess(u32),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// A node page decoded to an internally inconsistent shape.
    #[error("Corrupt node on page {page}: {reason}")]
    CorruptNode { page: u32, reason: String },

    /// The metadata page failed its checksum or holds impossible values.
    #[error("Corrupt metadata page: {0}")]
    CorruptMetadata(String),

    /// A fixed-width value could not be decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The file was built with a different tree order than configured.
    ///
    /// This is fatal: the table refuses to open.
    #[error("Order mismatch: file has order {stored}, configured order is {configured}")]
    OrderMismatch { stored: i32, configured: i32 },

    // -------------------------------------------------------------------------
    // Table Errors
    // -------------------------------------------------------------------------
    /// An insert would need more pages than remain under the maximum.
    #[error("Table full")]
    TableFull,

    /// An insert named a key that is already present.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageOutOfRange {
            page: 120,
            max_pages: 100,
        };
        assert_eq!(format!("{}", err), "Page 120 out of range (max pages: 100)");

        let err = Error::OrderMismatch {
            stored: 6,
            configured: 4,
        };
        assert_eq!(
            format!("{}", err),
            "Order mismatch: file has order 6, configured order is 4"
        );

        assert_eq!(format!("{}", Error::TableFull), "Table full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: Error = io_err.into();
        assert!(err.source().is_some());
        assert!(Error::NoFreePages.source().is_none());
    }
}
