//! Common types and format constants used throughout the index.

mod page_id;
mod record_id;

pub use page_id::PageId;
pub use record_id::RecordId;

use crate::page::LeafEntry;
use serde::{Deserialize, Serialize};

/// Size of an encoded key
pub const KEY_SIZE: usize = std::mem::size_of::<i32>();

/// Size of an encoded page id
pub const PAGE_ID_SIZE: usize = std::mem::size_of::<i32>();

/// Maximum number of keys a node page has room for (leaves and internal
/// nodes alike)
pub const MAX_KEY_NUM: usize = 85;

/// Page size in bytes, derived from the leaf layout: 85 entries plus the
/// trailing next-leaf pointer (12 * 85 + 4 = 1024)
pub const PAGE_SIZE: usize = LeafEntry::SIZE * MAX_KEY_NUM + PAGE_ID_SIZE;

/// On-disk marker for an unset key slot or an absent page id
pub const SENTINEL: i32 = -1;

/// Byte pattern of [`SENTINEL`], used to pad unused page regions
pub const SENTINEL_BYTE: u8 = 0xFF;

/// Smallest key limit a node may be configured with; a split must leave
/// both halves non-empty
pub const MIN_KEYS: usize = 2;

/// B-tree configuration: the key-capacity contract shared by the node codecs
/// and the tree controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BTreeConfig {
    /// Maximum keys per leaf node
    pub max_leaf_keys: usize,
    /// Maximum keys per internal node
    pub max_interior_keys: usize,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_keys: MAX_KEY_NUM,
            max_interior_keys: MAX_KEY_NUM,
        }
    }
}

impl BTreeConfig {
    /// Create a new config with custom limits, clamped to what a page holds
    pub fn new(max_leaf_keys: usize, max_interior_keys: usize) -> Self {
        Self {
            max_leaf_keys: max_leaf_keys.clamp(MIN_KEYS, MAX_KEY_NUM),
            max_interior_keys: max_interior_keys.clamp(MIN_KEYS, MAX_KEY_NUM),
        }
    }

    /// Same limit for both node kinds
    pub fn uniform(max_keys: usize) -> Self {
        Self::new(max_keys, max_keys)
    }
}
