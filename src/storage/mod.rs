//! Storage layer: page-granular I/O and the index metadata page.
//!
//! This module provides the [`PageStore`] abstraction the tree and the record
//! file are written against, a file-backed and an in-memory implementation,
//! and the page-0 header of index files.

mod file_header;
mod memory;
mod page_file;

pub use file_header::FileHeader;
pub use memory::MemPageStore;
pub use page_file::{OpenMode, PageFile, PageStore};
