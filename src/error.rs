//! Error types for the index engine.

use crate::types::PageId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur in the index engine and its front end
#[derive(Error, Debug)]
pub enum IndexError {
    /// The underlying file could not be opened or created
    #[error("failed to open {path}: {source}")]
    FileOpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A page read failed at the file-system level
    #[error("failed to read page {page_id}: {source}")]
    FileReadFailed {
        page_id: PageId,
        source: std::io::Error,
    },

    /// A page write failed at the file-system level
    #[error("failed to write page {page_id}: {source}")]
    FileWriteFailed {
        page_id: PageId,
        source: std::io::Error,
    },

    /// Flushing the file on close failed
    #[error("failed to close file: {0}")]
    FileCloseFailed(std::io::Error),

    /// Requested page lies at or beyond the allocated page count
    #[error("page {0} not found")]
    PageNotFound(PageId),

    /// A write targeted a page past the next free page id
    #[error("write to page {page_id} skips ahead of next free page {next}")]
    NonContiguousWrite { page_id: PageId, next: PageId },

    /// A write was attempted on a store opened read-only
    #[error("store is opened read-only")]
    ReadOnly,

    /// Insert attempted on a node already holding its maximum key count
    #[error("node is full")]
    NodeFull,

    /// Entry index outside the populated range of a leaf
    #[error("no entry {eid} (node holds {count})")]
    NoSuchEntry { eid: usize, count: usize },

    /// Lookup miss; an expected outcome rather than a failure
    #[error("no such record")]
    NoSuchRecord,

    /// Operation called on a node in the wrong state
    #[error("invalid precondition: {0}")]
    InvalidPrecondition(String),

    /// Key collides with the on-disk empty-slot marker
    #[error("key {0} is reserved as the empty-slot marker")]
    ReservedKey(i32),

    /// Value exceeds the record slot capacity
    #[error("value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// Data corruption detected (e.g., checksum mismatch, gap in entries)
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Index metadata page is malformed
    #[error("invalid index file: {0}")]
    InvalidDatabaseFile(String),

    /// Malformed line in a load file
    #[error("invalid load file format at line {line}: {reason}")]
    InvalidFileFormat { line: usize, reason: String },

    /// Malformed query text
    #[error("parse error: {0}")]
    Parse(String),

    /// Table file does not exist
    #[error("table {0} does not exist")]
    NoSuchTable(String),

    /// Any other I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create an invalid precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::InvalidPrecondition(msg.into())
    }

    /// Create an invalid index file error
    pub fn invalid_db(msg: impl Into<String>) -> Self {
        Self::InvalidDatabaseFile(msg.into())
    }

    /// Create a query parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// True for the lookup-miss outcome, false for real failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoSuchRecord | Self::NoSuchEntry { .. })
    }
}
