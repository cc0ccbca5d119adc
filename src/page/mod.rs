//! Page layer: fixed-size page buffers and the B+Tree node codecs.
//!
//! Every node occupies exactly one [`PAGE_SIZE`] page:
//!
//! ```text
//! leaf page:      [85 x (key:i32, page_id:i32, slot_id:i32)][next_leaf:i32]
//! internal page:  [child:i32][85 x (key:i32, child:i32)][padding]
//! ```
//!
//! All integers are little-endian. Unused slots and padding hold the `-1`
//! sentinel byte pattern (`0xFF`).

mod entry;
mod internal;
mod leaf;

pub use entry::{InternalEntry, LeafEntry};
pub use internal::InternalNode;
pub use leaf::LeafNode;

use crate::error::{IndexError, Result};
use crate::types::{PAGE_SIZE, SENTINEL_BYTE};

/// A raw page buffer
#[derive(Clone, PartialEq, Eq)]
pub struct PageBuf {
    data: [u8; PAGE_SIZE],
}

impl PageBuf {
    /// Create a page buffer filled with the sentinel pattern
    pub fn new() -> Self {
        Self {
            data: [SENTINEL_BYTE; PAGE_SIZE],
        }
    }

    /// Create a page buffer from raw bytes; missing tail bytes stay sentinel
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = Self::new();
        let len = bytes.len().min(PAGE_SIZE);
        buf.data[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Get a reference to the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = Self::checked_end(offset, len)?;
        Ok(&self.data[offset..end])
    }

    /// Mutably borrow `len` bytes starting at `offset`
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = Self::checked_end(offset, len)?;
        Ok(&mut self.data[offset..end])
    }

    /// Read a little-endian `i32`
    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.bytes(offset, 4)?);
        Ok(i32::from_le_bytes(word))
    }

    /// Write a little-endian `i32`
    pub fn write_i32(&mut self, offset: usize, value: i32) -> Result<()> {
        self.bytes_mut(offset, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Read a little-endian `u32`
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.bytes(offset, 4)?);
        Ok(u32::from_le_bytes(word))
    }

    /// Write a little-endian `u32`
    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.bytes_mut(offset, 4)?.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn checked_end(offset: usize, len: usize) -> Result<usize> {
        offset
            .checked_add(len)
            .filter(|end| *end <= PAGE_SIZE)
            .ok_or_else(|| {
                IndexError::corruption(format!(
                    "access of {} bytes at offset {} exceeds page size {}",
                    len, offset, PAGE_SIZE
                ))
            })
    }
}

impl Default for PageBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PageBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuf")
            .field("head", &&self.data[..16])
            .finish_non_exhaustive()
    }
}

impl AsRef<[u8]> for PageBuf {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
