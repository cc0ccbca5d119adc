//! Index metadata page.
//!
//! Page 0 of an index file records where the tree starts.

use crate::error::{IndexError, Result};
use crate::page::PageBuf;
use crate::types::PageId;

/// Index metadata stored in page 0
///
/// Layout:
/// ```text
/// Offset  Size  Description
/// 0       4     Root page id (-1 for an empty tree)
/// 4       4     Tree height (0 for an empty tree)
/// 8       1016  Sentinel padding (0xFF)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileHeader {
    /// Root page of the tree
    pub root_page: Option<PageId>,
    /// Node levels from root to leaf inclusive; never 1
    pub tree_height: u32,
}

impl FileHeader {
    /// Header of an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a header from page 0
    pub fn read(page: &PageBuf) -> Result<Self> {
        let root_page = PageId::from_disk(page.read_i32(0)?)?;
        let raw_height = page.read_i32(4)?;
        let tree_height = u32::try_from(raw_height)
            .map_err(|_| IndexError::invalid_db(format!("negative tree height {}", raw_height)))?;

        let header = Self {
            root_page,
            tree_height,
        };
        header.validate()?;
        Ok(header)
    }

    /// Write this header into a fresh page
    pub fn write(&self) -> Result<PageBuf> {
        let mut page = PageBuf::new();
        page.write_i32(0, PageId::to_disk(self.root_page))?;
        page.write_i32(4, self.tree_height as i32)?;
        Ok(page)
    }

    /// True for an index with no entries yet
    pub fn is_empty(&self) -> bool {
        self.root_page.is_none()
    }

    fn validate(&self) -> Result<()> {
        match (self.root_page, self.tree_height) {
            (None, 0) => Ok(()),
            (Some(root), h) if h >= 2 && root != PageId::META => Ok(()),
            (root, h) => Err(IndexError::invalid_db(format!(
                "inconsistent root {:?} for tree height {}",
                root, h
            ))),
        }
    }
}
