//! Typed fixed-size entry records stored in node pages.
//!
//! A key slot holding [`SENTINEL`] marks the slot as unused; both record
//! kinds decode such a slot to `None`.

use crate::error::{IndexError, Result};
use crate::page::PageBuf;
use crate::types::{PageId, RecordId, KEY_SIZE, PAGE_ID_SIZE, SENTINEL};

/// One leaf entry: a key and the record it indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: i32,
    pub rid: RecordId,
}

impl LeafEntry {
    /// Encoded size of one leaf entry
    pub const SIZE: usize = KEY_SIZE + RecordId::SIZE;

    pub fn new(key: i32, rid: RecordId) -> Self {
        Self { key, rid }
    }

    /// Decode the entry at `offset`, or `None` if the key slot is unset
    pub fn read(page: &PageBuf, offset: usize) -> Result<Option<Self>> {
        let key = page.read_i32(offset)?;
        if key == SENTINEL {
            return Ok(None);
        }
        let mut rid = [0u8; RecordId::SIZE];
        rid.copy_from_slice(page.bytes(offset + KEY_SIZE, RecordId::SIZE)?);
        Ok(Some(Self {
            key,
            rid: RecordId::from_bytes(rid),
        }))
    }

    /// Encode this entry at `offset`
    pub fn write(&self, page: &mut PageBuf, offset: usize) -> Result<()> {
        page.write_i32(offset, self.key)?;
        page.bytes_mut(offset + KEY_SIZE, RecordId::SIZE)?
            .copy_from_slice(&self.rid.to_bytes());
        Ok(())
    }
}

/// One internal entry: a separator key and the child covering keys at or
/// above it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalEntry {
    pub key: i32,
    pub child: PageId,
}

impl InternalEntry {
    /// Encoded size of one internal entry
    pub const SIZE: usize = KEY_SIZE + PAGE_ID_SIZE;

    pub fn new(key: i32, child: PageId) -> Self {
        Self { key, child }
    }

    /// Decode the entry at `offset`, or `None` if the key slot is unset
    pub fn read(page: &PageBuf, offset: usize) -> Result<Option<Self>> {
        let key = page.read_i32(offset)?;
        if key == SENTINEL {
            return Ok(None);
        }
        let raw_child = page.read_i32(offset + KEY_SIZE)?;
        let child = PageId::from_disk(raw_child)?.ok_or_else(|| {
            IndexError::corruption(format!("separator {} has no child pointer", key))
        })?;
        Ok(Some(Self { key, child }))
    }

    /// Encode this entry at `offset`
    pub fn write(&self, page: &mut PageBuf, offset: usize) -> Result<()> {
        page.write_i32(offset, self.key)?;
        page.write_i32(offset + KEY_SIZE, PageId::to_disk(Some(self.child)))
    }
}
