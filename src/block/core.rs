use std::io::{self, Read};

use crate::common::error::CountError;
use crate::common::io::{DEFAULT_PAGE_SIZE, read_full};

/// Block size used when none is configured: one nominal memory page.
pub const DEFAULT_BLOCK_SIZE: usize = DEFAULT_PAGE_SIZE;

/// Pick a tail padding byte that can never match `delimiter`.
/// Zero for every delimiter except NUL itself.
#[inline]
pub const fn pad_byte_for(delimiter: u8) -> u8 {
    if delimiter == 0 { 0xFF } else { 0x00 }
}

/// Owned, reusable read buffer of a fixed block size.
///
/// Kernels always see the full `block_size` bytes. After a short read the
/// unread tail holds `pad` bytes, so no kernel needs to know how much of the
/// block is real data.
pub struct BlockBuffer {
    data: Box<[u8]>,
    pad: u8,
}

impl BlockBuffer {
    /// Allocate a block of `block_size` bytes whose stride must cover whole
    /// units of `unit` bytes (word size or vector lane width).
    pub fn new(block_size: usize, unit: usize, pad: u8) -> Result<Self, CountError> {
        if block_size == 0 || unit == 0 || block_size % unit != 0 {
            return Err(CountError::Configuration { block_size, unit });
        }
        Ok(BlockBuffer {
            data: vec![pad; block_size].into_boxed_slice(),
            pad,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn pad(&self) -> u8 {
        self.pad
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access for callers that fill the block themselves.
    /// The padding invariant is theirs to keep.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Outcome of one `read_block` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRead {
    pub bytes_read: usize,
    /// Set on the short read that ends the stream. `bytes_read == 0` with
    /// `is_final` means there was nothing left to count.
    pub is_final: bool,
}

/// Fill `buf` with the next block of `reader`, padding any unread tail.
///
/// Short reads from pipes are retried until the block is full or the
/// stream reports EOF, so a short block really is the last one.
pub fn read_block<R: Read>(reader: &mut R, buf: &mut BlockBuffer) -> io::Result<BlockRead> {
    let pad = buf.pad;
    let bytes_read = read_full(reader, &mut buf.data)?;
    let is_final = bytes_read < buf.data.len();
    if is_final {
        buf.data[bytes_read..].fill(pad);
    }
    Ok(BlockRead {
        bytes_read,
        is_final,
    })
}
