//! Flat table file of fixed-size `(key, value)` record slots.

use crate::error::{IndexError, Result};
use crate::page::PageBuf;
use crate::storage::{OpenMode, PageFile, PageStore};
use crate::types::{PageId, RecordId, KEY_SIZE, PAGE_SIZE};
use std::path::Path;
use tracing::{debug, trace};

/// Maximum encoded length of a record value in bytes
pub const MAX_VALUE_LEN: usize = 100;

/// Record slots per table page
pub const SLOTS_PER_PAGE: u32 = 9;

/// Size of one record slot: key plus NUL-padded value
const SLOT_SIZE: usize = KEY_SIZE + MAX_VALUE_LEN;

const COUNT_OFFSET: usize = 0;
const CHECKSUM_OFFSET: usize = 4;
const SLOTS_OFFSET: usize = 8;
const SLOTS_END: usize = SLOTS_OFFSET + SLOT_SIZE * SLOTS_PER_PAGE as usize;

const _: () = assert!(SLOTS_END <= PAGE_SIZE);

/// One page of a table file
///
/// Layout:
/// ```text
/// Offset  Size  Description
/// 0       4     Number of used slots
/// 4       4     CRC32 of the slot region
/// 8       936   9 slots of (key i32, value [u8; 100])
/// 944     80    Padding
/// ```
struct RecordPage {
    buf: PageBuf,
}

impl RecordPage {
    fn empty() -> Result<Self> {
        let mut page = Self {
            buf: PageBuf::new(),
        };
        page.buf.write_u32(COUNT_OFFSET, 0)?;
        page.seal()?;
        Ok(page)
    }

    fn decode(buf: PageBuf, page_id: PageId) -> Result<Self> {
        let page = Self { buf };
        let stored = page.buf.read_u32(CHECKSUM_OFFSET)?;
        let computed = crc32fast::hash(page.buf.bytes(SLOTS_OFFSET, SLOTS_END - SLOTS_OFFSET)?);
        if stored != computed {
            return Err(IndexError::corruption(format!(
                "record page {} checksum mismatch",
                page_id
            )));
        }
        if page.count()? > SLOTS_PER_PAGE {
            return Err(IndexError::corruption(format!(
                "record page {} claims {} slots",
                page_id,
                page.count()?
            )));
        }
        Ok(page)
    }

    fn count(&self) -> Result<u32> {
        self.buf.read_u32(COUNT_OFFSET)
    }

    fn slot_offset(slot: u32) -> usize {
        SLOTS_OFFSET + slot as usize * SLOT_SIZE
    }

    fn read_slot(&self, slot: u32) -> Result<(i32, String)> {
        let offset = Self::slot_offset(slot);
        let key = self.buf.read_i32(offset)?;
        let raw = self.buf.bytes(offset + KEY_SIZE, MAX_VALUE_LEN)?;
        let len = raw.iter().position(|b| *b == 0).unwrap_or(MAX_VALUE_LEN);
        let value = std::str::from_utf8(&raw[..len])
            .map_err(|e| IndexError::corruption(format!("record value is not UTF-8: {}", e)))?;
        Ok((key, value.to_string()))
    }

    fn append_slot(&mut self, key: i32, value: &[u8]) -> Result<u32> {
        let slot = self.count()?;
        let offset = Self::slot_offset(slot);
        self.buf.write_i32(offset, key)?;
        let dst = self.buf.bytes_mut(offset + KEY_SIZE, MAX_VALUE_LEN)?;
        dst.fill(0);
        dst[..value.len()].copy_from_slice(value);
        self.buf.write_u32(COUNT_OFFSET, slot + 1)?;
        self.seal()?;
        Ok(slot)
    }

    fn seal(&mut self) -> Result<()> {
        let crc = crc32fast::hash(self.buf.bytes(SLOTS_OFFSET, SLOTS_END - SLOTS_OFFSET)?);
        self.buf.write_u32(CHECKSUM_OFFSET, crc)
    }
}

/// Append-only table of `(key, value)` records
pub struct RecordFile<S: PageStore = PageFile> {
    store: S,
    end_rid: RecordId,
}

impl RecordFile<PageFile> {
    /// Open a table file. In [`OpenMode::Write`] a missing file is created.
    pub fn open(path: &Path, mode: OpenMode, sync_on_write: bool) -> Result<Self> {
        Self::with_store(PageFile::open(path, mode, sync_on_write)?)
    }

    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}

impl<S: PageStore> RecordFile<S> {
    pub fn with_store(store: S) -> Result<Self> {
        let end_pid = store.end_pid();
        let end_rid = match end_pid.value().checked_sub(1) {
            None => RecordId::new(0, 0),
            Some(last) => {
                let last_pid = PageId::new(last);
                let page = RecordPage::decode(store.read_page(last_pid)?, last_pid)?;
                match page.count()? {
                    SLOTS_PER_PAGE => RecordId::new(end_pid.value(), 0),
                    count => RecordId::new(last, count),
                }
            }
        };
        debug!(%end_rid, "opened record file");
        Ok(Self { store, end_rid })
    }

    /// Locator one past the last record
    pub fn end_rid(&self) -> RecordId {
        self.end_rid
    }

    /// Append a record and return its locator
    pub fn append(&mut self, key: i32, value: &str) -> Result<RecordId> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_VALUE_LEN {
            return Err(IndexError::ValueTooLarge {
                size: bytes.len(),
                max: MAX_VALUE_LEN,
            });
        }
        if bytes.contains(&0) {
            return Err(IndexError::precondition("record value contains a NUL byte"));
        }

        let rid = self.end_rid;
        let mut page = if rid.slot_id == 0 {
            RecordPage::empty()?
        } else {
            RecordPage::decode(self.store.read_page(rid.page_id)?, rid.page_id)?
        };
        page.append_slot(key, bytes)?;
        self.store.write_page(rid.page_id, &page.buf)?;

        trace!(key, %rid, "appended record");
        self.end_rid = rid.next(SLOTS_PER_PAGE);
        Ok(rid)
    }

    /// Read the record at `rid`
    pub fn read(&self, rid: RecordId) -> Result<(i32, String)> {
        if rid >= self.end_rid || rid.slot_id >= SLOTS_PER_PAGE {
            return Err(IndexError::NoSuchRecord);
        }
        let page = RecordPage::decode(self.store.read_page(rid.page_id)?, rid.page_id)?;
        if rid.slot_id >= page.count()? {
            return Err(IndexError::NoSuchRecord);
        }
        page.read_slot(rid.slot_id)
    }

    /// Iterate over all records in file order
    pub fn iter(&self) -> impl Iterator<Item = Result<(RecordId, i32, String)>> + '_ {
        let end = self.end_rid;
        std::iter::successors(Some(RecordId::new(0, 0)), |rid| {
            Some(rid.next(SLOTS_PER_PAGE))
        })
        .take_while(move |rid| *rid < end)
        .map(move |rid| self.read(rid).map(|(key, value)| (rid, key, value)))
    }
}
