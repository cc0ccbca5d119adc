//! Paged file implementation.
//!
//! The page store turns a page id into a fixed-size read or write at byte
//! offset `page_id * PAGE_SIZE`. Allocation is append-only: the next free page
//! id is the current page count, and writing that id extends the file. Pages
//! are never freed or reused.

use crate::error::{IndexError, Result};
use crate::page::PageBuf;
use crate::types::{PageId, PAGE_SIZE};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// How a store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, reads only
    Read,
    /// Read-write, creating the file if it is missing
    Write,
}

/// Trait for page-granular storage
///
/// This abstraction lets the tree run over a file or an in-memory store.
pub trait PageStore: Send + Sync {
    /// Read a page; fails for ids at or beyond [`PageStore::end_pid`]
    fn read_page(&self, page_id: PageId) -> Result<PageBuf>;

    /// Write a page; writing [`PageStore::end_pid`] extends the store by one
    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()>;

    /// The next unused page id (equal to the number of allocated pages)
    fn end_pid(&self) -> PageId;

    /// Flush all data to stable storage
    fn sync(&self) -> Result<()>;
}

impl<T: PageStore + ?Sized> PageStore for &T {
    fn read_page(&self, page_id: PageId) -> Result<PageBuf> {
        (**self).read_page(page_id)
    }

    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()> {
        (**self).write_page(page_id, page)
    }

    fn end_pid(&self) -> PageId {
        (**self).end_pid()
    }

    fn sync(&self) -> Result<()> {
        (**self).sync()
    }
}

/// File-backed page store
pub struct PageFile {
    /// The underlying file
    file: RwLock<File>,
    /// Number of pages currently in the file
    page_count: RwLock<u32>,
    path: PathBuf,
    mode: OpenMode,
    /// Whether to sync on each write
    sync_on_write: bool,
}

impl PageFile {
    /// Open a paged file
    pub fn open(path: &Path, mode: OpenMode, sync_on_write: bool) -> Result<Self> {
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(path),
            OpenMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path),
        }
        .map_err(|source| IndexError::FileOpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let len = file
            .metadata()
            .map_err(|source| IndexError::FileOpenFailed {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let page_count = (len / PAGE_SIZE as u64) as u32;
        debug!(path = %path.display(), ?mode, page_count, "opened page file");

        Ok(Self {
            file: RwLock::new(file),
            page_count: RwLock::new(page_count),
            path: path.to_path_buf(),
            mode,
            sync_on_write,
        })
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the file
    pub fn close(self) -> Result<()> {
        if self.mode == OpenMode::Write {
            self.file.read().sync_all().map_err(IndexError::FileCloseFailed)?;
        }
        debug!(path = %self.path.display(), "closed page file");
        Ok(())
    }
}

impl PageStore for PageFile {
    fn read_page(&self, page_id: PageId) -> Result<PageBuf> {
        if page_id.value() >= *self.page_count.read() {
            return Err(IndexError::PageNotFound(page_id));
        }

        let mut buf = [0u8; PAGE_SIZE];
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|source| IndexError::FileReadFailed { page_id, source })?;

        trace!(page = page_id.value(), "read page");
        Ok(PageBuf::from_bytes(&buf))
    }

    fn write_page(&self, page_id: PageId, page: &PageBuf) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(IndexError::ReadOnly);
        }

        let mut page_count = self.page_count.write();
        if page_id.value() > *page_count {
            return Err(IndexError::NonContiguousWrite {
                page_id,
                next: PageId::new(*page_count),
            });
        }

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))
            .and_then(|_| file.write_all(page.as_bytes()))
            .and_then(|_| {
                if self.sync_on_write {
                    file.sync_data()
                } else {
                    Ok(())
                }
            })
            .map_err(|source| IndexError::FileWriteFailed { page_id, source })?;

        if page_id.value() == *page_count {
            *page_count += 1;
            trace!(page = page_id.value(), "extended page file");
        }
        Ok(())
    }

    fn end_pid(&self) -> PageId {
        PageId::new(*self.page_count.read())
    }

    fn sync(&self) -> Result<()> {
        let file = self.file.read();
        file.sync_all()?;
        Ok(())
    }
}
