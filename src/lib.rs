//! # B+Tree Secondary Index
//!
//! A disk-backed B+Tree index mapping `i32` keys to record locators, with a
//! small table store and query front end built on top of it.
//!
//! ## Architecture
//!
//! - **Types** (`types`): page and record identifiers, page geometry and the
//!   node capacity configuration
//! - **Page Layer** (`page`): fixed-layout leaf and internal node codecs
//! - **Storage Layer** (`storage`): page-granular file I/O and the index
//!   metadata page
//! - **B+Tree Layer** (`btree`): insertion with node splits, key lookup,
//!   leaf-chain iteration and inspection
//! - **Record Layer** (`record`): flat table files of `(key, value)` tuples
//! - **Query Layer** (`query`): `SELECT` / `LOAD` statements with index-aware
//!   planning
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bptree_index::{BTreeIndex, BTreeConfig, OpenMode, RecordId};
//!
//! let mut index = BTreeIndex::open(
//!     "movie.idx".as_ref(),
//!     OpenMode::Write,
//!     BTreeConfig::default(),
//!     false,
//! )?;
//! index.insert(272, RecordId::new(0, 0))?;
//!
//! let (mut cursor, found) = index.locate(272)?;
//! assert!(found);
//! while let Some(entry) = index.read_forward(&mut cursor)? {
//!     println!("{} -> {}", entry.key, entry.rid);
//! }
//! index.close()?;
//! ```

pub mod btree;
pub mod error;
pub mod page;
pub mod query;
pub mod record;
pub mod storage;
pub mod types;

pub use error::{IndexError, Result};
pub use types::{BTreeConfig, PageId, RecordId, PAGE_SIZE};

// Re-export main public API
pub use btree::{BTreeIndex, IndexCursor, IndexStats, RangeScan, TreeNode};
pub use page::{InternalNode, LeafEntry, LeafNode};
pub use query::SqlEngine;
pub use record::RecordFile;
pub use storage::{MemPageStore, OpenMode, PageFile, PageStore};

use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `<table>.tbl` and `<table>.idx` files
    pub data_dir: PathBuf,
    /// Whether to sync writes immediately (default: false for performance)
    pub sync_on_write: bool,
    /// Node capacity limits for new and opened indexes
    pub btree_config: BTreeConfig,
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync_on_write: false,
            btree_config: BTreeConfig::default(),
        }
    }

    /// Enable sync on write for durability
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    /// Set B+Tree node limits
    pub fn btree_config(mut self, config: BTreeConfig) -> Self {
        self.btree_config = config;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(".")
    }
}
