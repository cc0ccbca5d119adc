//! B+Tree secondary index.
//!
//! This module provides a disk-based B+Tree over `i32` keys that supports:
//! - Insertion with cascading node splits
//! - Point lookups returning a leaf cursor
//! - Forward iteration along the leaf chain and range scans
//! - Parent/child navigation by key
//! - Structure export and consistency checks

mod cursor;
mod export;
mod tree;

pub use cursor::{IndexCursor, RangeScan};
pub use export::{IndexStats, TreeNode};
pub use tree::BTreeIndex;
