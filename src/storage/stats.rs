//! Pager I/O statistics.

use std::fmt;

/// Counters kept by the [`Pager`](crate::storage::Pager).
///
/// The pager is single-threaded, so these are plain integers updated through
/// `&mut self`; callers get a copy via [`Pager::stats`](crate::storage::Pager::stats).
///
/// # Example
/// ```
/// use pagedb::storage::PagerStats;
///
/// let stats = PagerStats::default();
/// assert_eq!(stats.pages_read, 0);
/// println!("{}", stats);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PagerStats {
    /// Pages loaded from the file (zero-filled pages past the end don't count).
    pub pages_read: u64,

    /// Page flushes issued to the file.
    pub pages_written: u64,

    /// Successful `allocate_free_page` calls.
    pub allocations: u64,

    /// `free_page` calls.
    pub frees: u64,
}

impl PagerStats {
    /// Net pages handed out since open.
    pub fn net_allocations(&self) -> i64 {
        self.allocations as i64 - self.frees as i64
    }
}

impl fmt::Display for PagerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ read: {}, written: {}, allocated: {}, freed: {} }}",
            self.pages_read, self.pages_written, self.allocations, self.frees
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = PagerStats::default();
        assert_eq!(stats.pages_read, 0);
        assert_eq!(stats.net_allocations(), 0);
    }

    #[test]
    fn test_net_allocations() {
        let stats = PagerStats {
            allocations: 7,
            frees: 3,
            ..Default::default()
        };
        assert_eq!(stats.net_allocations(), 4);
    }

    #[test]
    fn test_stats_display() {
        let stats = PagerStats {
            pages_read: 80,
            pages_written: 20,
            allocations: 5,
            frees: 1,
        };
        let display = format!("{}", stats);

        assert!(display.contains("read: 80"));
        assert!(display.contains("written: 20"));
        assert!(display.contains("freed: 1"));
    }
}
