//! Record locator type.

use crate::types::PageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Locates one tuple in a record file: a page and a slot within it.
///
/// The index treats this as opaque and copies both fields verbatim into leaf
/// entries. Ordering is page-major, which is also the table scan order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct RecordId {
    /// Page holding the record
    pub page_id: PageId,
    /// Slot within the page
    pub slot_id: u32,
}

impl RecordId {
    /// Encoded size: two 32-bit fields
    pub const SIZE: usize = 8;

    /// Create a new record locator
    pub const fn new(page_id: u32, slot_id: u32) -> Self {
        Self {
            page_id: PageId::new(page_id),
            slot_id,
        }
    }

    /// Advance to the next slot, wrapping onto the next page after
    /// `slots_per_page` slots
    pub fn next(self, slots_per_page: u32) -> Self {
        if self.slot_id + 1 >= slots_per_page {
            Self {
                page_id: self.page_id.next(),
                slot_id: 0,
            }
        } else {
            Self {
                page_id: self.page_id,
                slot_id: self.slot_id + 1,
            }
        }
    }

    /// Write both fields as raw little-endian 32-bit words
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.page_id.value().to_le_bytes());
        bytes[4..8].copy_from_slice(&self.slot_id.to_le_bytes());
        bytes
    }

    /// Inverse of [`RecordId::to_bytes`]
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            page_id: PageId::new(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            slot_id: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot_id)
    }
}
