//! In-memory page store.

use crate::error::{IndexError, Result};
use crate::page::PageBuf;
use crate::storage::PageStore;
use crate::types::PageId;
use parking_lot::RwLock;

/// Page store kept entirely in memory, with the same append-only allocation
/// rules as [`crate::storage::PageFile`]
#[derive(Default)]
pub struct MemPageStore {
    pages: RwLock<Vec<PageBuf>>,
}

impl MemPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated pages
    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }
}

impl PageStore for MemPageStore {
    fn read_page(&self, page_id: PageId) -> Result<PageBuf> {
        self.pages
            .read()
            .get(page_id.value() as usize)
            .cloned()
            .ok_or(IndexError::PageNotFound(page_id))
    }

    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()> {
        let mut pages = self.pages.write();
        let idx = page_id.value() as usize;
        match idx.cmp(&pages.len()) {
            std::cmp::Ordering::Less => pages[idx] = page.clone(),
            std::cmp::Ordering::Equal => pages.push(page.clone()),
            std::cmp::Ordering::Greater => {
                return Err(IndexError::NonContiguousWrite {
                    page_id,
                    next: PageId::new(pages.len() as u32),
                })
            }
        }
        Ok(())
    }

    fn end_pid(&self) -> PageId {
        PageId::new(self.pages.read().len() as u32)
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
