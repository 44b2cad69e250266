//! The fixed-schema record.

use std::fmt;

use crate::common::config::{COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, RECORD_SIZE};
use crate::common::{Error, Result};
use crate::index::btree::FixedCodec;

const USERNAME_OFFSET: usize = 4;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + COLUMN_USERNAME_SIZE;

/// One row: an integer id plus two bounded text columns.
///
/// # Layout (291 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     id (i32, little-endian)
/// 4       32    username (UTF-8, null-padded)
/// 36      255   email (UTF-8, null-padded)
/// ```
///
/// Text longer than its column is cut at the last character boundary that
/// fits, both in [`Record::new`] and when encoding.
///
/// # Example
/// ```
/// use pagedb::Record;
///
/// let record = Record::new(1, "alice", "alice@example.com");
/// assert_eq!(record.to_string(), "(1, alice, alice@example.com)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl Record {
    pub fn new(id: i32, username: impl Into<String>, email: impl Into<String>) -> Self {
        let mut username = username.into();
        let mut email = email.into();
        username.truncate(fit(&username, COLUMN_USERNAME_SIZE).len());
        email.truncate(fit(&email, COLUMN_EMAIL_SIZE).len());
        Self {
            id,
            username,
            email,
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
fn fit(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn write_column(buf: &mut [u8], text: &str) {
    let text = fit(text, buf.len());
    buf[..text.len()].copy_from_slice(text.as_bytes());
    buf[text.len()..].fill(0);
}

fn read_column(buf: &[u8], name: &str) -> Result<String> {
    let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8(buf[..end].to_vec())
        .map_err(|e| Error::Codec(format!("{} column is not UTF-8: {}", name, e)))
}

impl FixedCodec for Record {
    const ENCODED_SIZE: usize = RECORD_SIZE;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[..USERNAME_OFFSET].copy_from_slice(&self.id.to_le_bytes());
        write_column(&mut buf[USERNAME_OFFSET..EMAIL_OFFSET], &self.username);
        write_column(&mut buf[EMAIL_OFFSET..RECORD_SIZE], &self.email);
    }

    fn decode_from(buf: &[u8]) -> Result<Self> {
        if buf.len() != RECORD_SIZE {
            return Err(Error::Codec(format!(
                "record needs {} bytes, got {}",
                RECORD_SIZE,
                buf.len()
            )));
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&buf[..USERNAME_OFFSET]);

        Ok(Self {
            id: i32::from_le_bytes(id),
            username: read_column(&buf[USERNAME_OFFSET..EMAIL_OFFSET], "username")?,
            email: read_column(&buf[EMAIL_OFFSET..RECORD_SIZE], "email")?,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}
