//! Page identifier type.

use crate::error::{IndexError, Result};
use crate::types::SENTINEL;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a fixed-size page in an index or table file.
///
/// Page IDs are 0-indexed. In index files page 0 holds the tree metadata and
/// tree nodes start at page 1. On disk a page id is a little-endian `i32`, and
/// an absent id (no next leaf, empty tree) is written as `-1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl PageId {
    /// Page holding the index metadata
    pub const META: PageId = PageId(0);

    /// Create a new page ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw page ID value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Calculate the byte offset of this page in the file
    pub const fn file_offset(self, page_size: usize) -> u64 {
        self.0 as u64 * page_size as u64
    }

    /// The page following this one
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Encode an optional page id into its on-disk form
    pub fn to_disk(id: Option<PageId>) -> i32 {
        match id {
            Some(id) => id.0 as i32,
            None => SENTINEL,
        }
    }

    /// Decode an on-disk page id; `-1` means absent
    pub fn from_disk(raw: i32) -> Result<Option<PageId>> {
        match raw {
            SENTINEL => Ok(None),
            n if n >= 0 => Ok(Some(PageId(n as u32))),
            n => Err(IndexError::corruption(format!("negative page id {}", n))),
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<PageId> for u32 {
    fn from(id: PageId) -> Self {
        id.0
    }
}
