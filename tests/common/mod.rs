//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;

use pagedb::Record;

static INIT: Once = Once::new();

/// Install a tracing subscriber once per test binary.
///
/// Output is captured per test and filtered by `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn record(id: i32) -> Record {
    Record::new(id, format!("user{}", id), format!("user{}@example.com", id))
}

pub fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}
