//! Index cursors and range iteration.
//!
//! A cursor is a plain leaf position `(pid, eid)`. It holds no page data, so
//! it stays valid across reads and can be copied freely. Advancing it goes
//! through [`BTreeIndex::read_forward`], which follows the leaf chain.

use crate::btree::BTreeIndex;
use crate::error::Result;
use crate::page::LeafEntry;
use crate::storage::PageStore;
use crate::types::PageId;
use std::ops::{Bound, RangeBounds};

/// Position of an entry in the leaf level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    /// Leaf page, `None` once the scan has run off the last leaf
    pub pid: Option<PageId>,
    /// Entry slot within the leaf
    pub eid: usize,
}

impl IndexCursor {
    pub fn new(pid: PageId, eid: usize) -> Self {
        Self { pid: Some(pid), eid }
    }

    /// Cursor positioned past the last entry
    pub fn end() -> Self {
        Self { pid: None, eid: 0 }
    }

    pub fn is_end(&self) -> bool {
        self.pid.is_none()
    }
}

/// Iterator over the entries whose keys fall in a range, in key order
pub struct RangeScan<'a, S: PageStore> {
    index: &'a BTreeIndex<S>,
    cursor: IndexCursor,
    end: Bound<i32>,
    done: bool,
}

impl<'a, S: PageStore> RangeScan<'a, S> {
    /// Current cursor position
    pub fn cursor(&self) -> IndexCursor {
        self.cursor
    }

    fn within_end(&self, key: i32) -> bool {
        match self.end {
            Bound::Included(end) => key <= end,
            Bound::Excluded(end) => key < end,
            Bound::Unbounded => true,
        }
    }
}

impl<'a, S: PageStore> Iterator for RangeScan<'a, S> {
    type Item = Result<LeafEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.index.read_forward(&mut self.cursor) {
            Ok(Some(entry)) if self.within_end(entry.key) => Some(Ok(entry)),
            Ok(_) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: PageStore> BTreeIndex<S> {
    /// Scan the entries with keys in `range`
    ///
    /// ```rust,ignore
    /// for entry in index.scan(100..=200)? {
    ///     let entry = entry?;
    ///     println!("{} -> {}", entry.key, entry.rid);
    /// }
    /// ```
    pub fn scan<R: RangeBounds<i32>>(&self, range: R) -> Result<RangeScan<'_, S>> {
        let (cursor, done) = match range.start_bound() {
            Bound::Included(&start) => (self.locate(start)?.0, false),
            Bound::Excluded(&start) => match start.checked_add(1) {
                Some(start) => (self.locate(start)?.0, false),
                None => (IndexCursor::end(), true),
            },
            Bound::Unbounded => (self.locate(i32::MIN)?.0, false),
        };

        Ok(RangeScan {
            index: self,
            cursor,
            end: range.end_bound().cloned(),
            done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemPageStore;
    use crate::types::{BTreeConfig, RecordId};

    fn build(keys: impl IntoIterator<Item = i32>) -> Result<BTreeIndex<MemPageStore>> {
        let mut index = BTreeIndex::with_store(MemPageStore::new(), BTreeConfig::uniform(4))?;
        for key in keys {
            index.insert(key, RecordId::new(key as u32, 0))?;
        }
        Ok(index)
    }

    fn keys_of<S: PageStore>(scan: RangeScan<'_, S>) -> Result<Vec<i32>> {
        scan.map(|entry| entry.map(|e| e.key)).collect()
    }

    #[test]
    fn test_scan_bounds() -> Result<()> {
        let index = build((1..=50).map(|k| k * 2))?;

        assert_eq!(keys_of(index.scan(10..=16)?)?, vec![10, 12, 14, 16]);
        assert_eq!(keys_of(index.scan(10..16)?)?, vec![10, 12, 14]);
        assert_eq!(keys_of(index.scan(11..17)?)?, vec![12, 14, 16]);
        assert_eq!(keys_of(index.scan(95..)?)?, vec![96, 98, 100]);
        assert_eq!(keys_of(index.scan(..=4)?)?, vec![2, 4]);
        assert_eq!(keys_of(index.scan(..)?)?.len(), 50);
        assert!(keys_of(index.scan(101..)?)?.is_empty());
        assert!(keys_of(index.scan(30..30)?)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_excluded_start() -> Result<()> {
        let index = build(1..=10)?;
        let scan = index.scan((Bound::Excluded(4), Bound::Included(7)))?;
        assert_eq!(keys_of(scan)?, vec![5, 6, 7]);

        let scan = index.scan((Bound::Excluded(i32::MAX), Bound::Unbounded))?;
        assert!(keys_of(scan)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_empty_index() -> Result<()> {
        let index = build(std::iter::empty())?;
        assert!(keys_of(index.scan(..)?)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_cursor_end_after_last_entry() -> Result<()> {
        let index = build(1..=3)?;
        let (mut cursor, found) = index.locate(3)?;
        assert!(found);
        assert!(!cursor.is_end());
        assert_eq!(index.read_forward(&mut cursor)?.map(|e| e.key), Some(3));
        assert!(cursor.is_end());
        assert_eq!(index.read_forward(&mut cursor)?, None);
        Ok(())
    }
}
