//! Fixed-width encodings for keys and values stored in B-tree nodes.

use std::fmt;

use crate::common::{Error, Result};

/// A type with a constant-size binary encoding.
///
/// Every key and value in a node occupies exactly `ENCODED_SIZE` bytes, which
/// lets the node layout be computed from the order alone.
pub trait FixedCodec: Sized {
    /// Bytes written by [`encode_into`](Self::encode_into).
    const ENCODED_SIZE: usize;

    /// Write the encoding into `buf`, which is exactly `ENCODED_SIZE` long.
    fn encode_into(&self, buf: &mut [u8]);

    /// Read a value back from exactly `ENCODED_SIZE` bytes.
    fn decode_from(buf: &[u8]) -> Result<Self>;
}

/// Keys: totally ordered, cheap to copy, fixed width.
pub trait IndexKey: FixedCodec + Ord + Copy + fmt::Debug {}

impl<T: FixedCodec + Ord + Copy + fmt::Debug> IndexKey for T {}

/// Values: fixed width and clonable out of a decoded node.
pub trait IndexValue: FixedCodec + Clone {}

impl<T: FixedCodec + Clone> IndexValue for T {}

fn fixed<const N: usize>(buf: &[u8]) -> Result<[u8; N]> {
    buf.try_into().map_err(|_| {
        Error::Codec(format!("expected {} bytes, got {}", N, buf.len()))
    })
}

impl FixedCodec for i32 {
    const ENCODED_SIZE: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        buf.copy_from_slice(&self.to_le_bytes());
    }

    fn decode_from(buf: &[u8]) -> Result<Self> {
        Ok(i32::from_le_bytes(fixed::<4>(buf)?))
    }
}

impl FixedCodec for u64 {
    const ENCODED_SIZE: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        buf.copy_from_slice(&self.to_le_bytes());
    }

    fn decode_from(buf: &[u8]) -> Result<Self> {
        Ok(u64::from_le_bytes(fixed::<8>(buf)?))
    }
}
