//! Leaf node codec.
//!
//! A leaf holds up to [`MAX_KEY_NUM`] `(key, RecordId)` entries sorted by key,
//! followed by the page id of the next leaf to the right. Leaves chained
//! through that pointer cover the whole key range in ascending order.

use crate::error::{IndexError, Result};
use crate::page::{LeafEntry, PageBuf};
use crate::types::{BTreeConfig, PageId, RecordId, MAX_KEY_NUM, SENTINEL};

/// Offset of the next-leaf pointer, right after the last entry slot
const NEXT_LEAF_OFFSET: usize = MAX_KEY_NUM * LeafEntry::SIZE;

/// In-memory decoding of one leaf page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    entries: Vec<LeafEntry>,
    next_leaf: Option<PageId>,
    max_keys: usize,
}

impl LeafNode {
    /// Create an empty leaf with no successor
    pub fn new(config: &BTreeConfig) -> Self {
        Self {
            entries: Vec::with_capacity(config.max_leaf_keys + 1),
            next_leaf: None,
            max_keys: config.max_leaf_keys,
        }
    }

    /// Decode a leaf from its page.
    ///
    /// Entries are read up to the first unset key slot. A populated slot after
    /// an unset one means the page is corrupt.
    pub fn decode(page: &PageBuf, config: &BTreeConfig) -> Result<Self> {
        let mut node = Self::new(config);
        let mut ended = false;

        for slot in 0..MAX_KEY_NUM {
            match LeafEntry::read(page, slot * LeafEntry::SIZE)? {
                Some(_) if ended => {
                    return Err(IndexError::corruption(format!(
                        "leaf entry {} follows an unset slot",
                        slot
                    )));
                }
                Some(entry) => node.entries.push(entry),
                None => ended = true,
            }
        }

        node.next_leaf = PageId::from_disk(page.read_i32(NEXT_LEAF_OFFSET)?)?;
        Ok(node)
    }

    /// Encode this leaf into a full page
    pub fn encode(&self) -> Result<PageBuf> {
        if self.entries.len() > MAX_KEY_NUM {
            return Err(IndexError::corruption(format!(
                "leaf holds {} entries, page fits {}",
                self.entries.len(),
                MAX_KEY_NUM
            )));
        }

        let mut page = PageBuf::new();
        for (slot, entry) in self.entries.iter().enumerate() {
            entry.write(&mut page, slot * LeafEntry::SIZE)?;
        }
        page.write_i32(NEXT_LEAF_OFFSET, PageId::to_disk(self.next_leaf))?;
        Ok(page)
    }

    /// Number of populated entries
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// True once the node holds its configured maximum
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_keys
    }

    /// Populated entries in key order
    pub fn entries(&self) -> &[LeafEntry] {
        &self.entries
    }

    /// Key of the first entry, if any
    pub fn first_key(&self) -> Option<i32> {
        self.entries.first().map(|e| e.key)
    }

    /// Find the first entry whose key is `>= search_key`.
    ///
    /// Returns its index (possibly `key_count()` when every key is smaller) and
    /// whether that entry's key equals `search_key`.
    pub fn locate(&self, search_key: i32) -> (usize, bool) {
        let eid = self.entries.partition_point(|e| e.key < search_key);
        let found = self
            .entries
            .get(eid)
            .map_or(false, |e| e.key == search_key);
        (eid, found)
    }

    /// Insert an entry at its sorted position
    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        check_key(key)?;
        if self.is_full() {
            return Err(IndexError::NodeFull);
        }
        let (eid, _) = self.locate(key);
        self.entries.insert(eid, LeafEntry::new(key, rid));
        Ok(())
    }

    /// Insert an entry into a full leaf by splitting it with `sibling`.
    ///
    /// The upper half moves into `sibling`, which must be empty and is about
    /// to be written at `sibling_pid`. An insert landing past the midpoint goes
    /// to the sibling, otherwise to this node, so the halves stay within one
    /// entry of each other. The sibling is spliced into the leaf chain right
    /// after this node.
    ///
    /// Returns the sibling's first key, to be promoted into the parent.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        rid: RecordId,
        sibling: &mut LeafNode,
        sibling_pid: PageId,
    ) -> Result<i32> {
        check_key(key)?;
        if sibling.key_count() != 0 {
            return Err(IndexError::precondition("split sibling leaf must be empty"));
        }
        if self.entries.is_empty() {
            return Err(IndexError::precondition("cannot split an empty leaf"));
        }

        let (eid, _) = self.locate(key);
        let mid = self.entries.len() / 2;
        let goes_right = eid > mid;
        let divide = if goes_right { mid + 1 } else { mid };

        sibling.entries = self.entries.split_off(divide);
        let entry = LeafEntry::new(key, rid);
        if goes_right {
            sibling.entries.insert(eid - divide, entry);
        } else {
            self.entries.insert(eid, entry);
        }

        sibling.next_leaf = self.next_leaf;
        self.next_leaf = Some(sibling_pid);

        sibling
            .first_key()
            .ok_or_else(|| IndexError::corruption("split produced an empty sibling"))
    }

    /// Read the entry at `eid`
    pub fn read_entry(&self, eid: usize) -> Result<LeafEntry> {
        self.entries
            .get(eid)
            .copied()
            .ok_or(IndexError::NoSuchEntry {
                eid,
                count: self.entries.len(),
            })
    }

    /// Page id of the next leaf to the right
    pub fn next_leaf(&self) -> Option<PageId> {
        self.next_leaf
    }

    /// Set the page id of the next leaf to the right
    pub fn set_next_leaf(&mut self, pid: Option<PageId>) {
        self.next_leaf = pid;
    }
}

fn check_key(key: i32) -> Result<()> {
    if key == SENTINEL {
        return Err(IndexError::ReservedKey(key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(n: i32) -> RecordId {
        RecordId::new(n as u32, (n * 2) as u32)
    }

    fn full_leaf(config: &BTreeConfig) -> Result<LeafNode> {
        let mut leaf = LeafNode::new(config);
        for k in 0..config.max_leaf_keys as i32 {
            leaf.insert(k * 10, rid(k))?;
        }
        Ok(leaf)
    }

    #[test]
    fn test_insert_keeps_keys_sorted() -> Result<()> {
        let mut leaf = LeafNode::new(&BTreeConfig::default());
        for key in [50, 10, 40, 20, 30] {
            leaf.insert(key, rid(key))?;
        }
        let keys: Vec<i32> = leaf.entries().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![10, 20, 30, 40, 50]);
        assert_eq!(leaf.read_entry(2)?, LeafEntry::new(30, rid(30)));
        Ok(())
    }

    #[test]
    fn test_locate() -> Result<()> {
        let mut leaf = LeafNode::new(&BTreeConfig::default());
        assert_eq!(leaf.locate(5), (0, false));

        for key in [10, 20, 30] {
            leaf.insert(key, rid(key))?;
        }
        assert_eq!(leaf.locate(20), (1, true));
        assert_eq!(leaf.locate(15), (1, false));
        assert_eq!(leaf.locate(5), (0, false));
        assert_eq!(leaf.locate(99), (3, false));
        Ok(())
    }

    #[test]
    fn test_read_entry_out_of_range() {
        let leaf = LeafNode::new(&BTreeConfig::default());
        assert!(matches!(
            leaf.read_entry(0),
            Err(IndexError::NoSuchEntry { eid: 0, count: 0 })
        ));
    }

    #[test]
    fn test_full_leaf_rejects_insert() -> Result<()> {
        let config = BTreeConfig::default();
        let mut leaf = full_leaf(&config)?;
        assert_eq!(leaf.key_count(), MAX_KEY_NUM);
        assert!(matches!(leaf.insert(5, rid(5)), Err(IndexError::NodeFull)));
        Ok(())
    }

    #[test]
    fn test_reserved_key_rejected() {
        let mut leaf = LeafNode::new(&BTreeConfig::default());
        assert!(matches!(
            leaf.insert(SENTINEL, rid(1)),
            Err(IndexError::ReservedKey(-1))
        ));
    }

    #[test]
    fn test_split_full_leaf() -> Result<()> {
        let config = BTreeConfig::default();
        for new_key in [-5, 5, 425, 431, 845, 10_000] {
            let mut leaf = full_leaf(&config)?;
            leaf.set_next_leaf(Some(PageId::new(77)));
            let mut sibling = LeafNode::new(&config);

            let promoted =
                leaf.insert_and_split(new_key, rid(new_key), &mut sibling, PageId::new(9))?;

            assert!(leaf.key_count() > 0 && sibling.key_count() > 0);
            assert_eq!(leaf.key_count() + sibling.key_count(), MAX_KEY_NUM + 1);
            assert!(leaf.key_count().abs_diff(sibling.key_count()) <= 1);
            assert_eq!(sibling.read_entry(0)?.key, promoted);

            let mut keys: Vec<i32> = leaf.entries().iter().map(|e| e.key).collect();
            keys.extend(sibling.entries().iter().map(|e| e.key));
            let mut expected: Vec<i32> = (0..MAX_KEY_NUM as i32).map(|k| k * 10).collect();
            expected.push(new_key);
            expected.sort_unstable();
            assert_eq!(keys, expected, "split around {}", new_key);

            assert_eq!(leaf.next_leaf(), Some(PageId::new(9)));
            assert_eq!(sibling.next_leaf(), Some(PageId::new(77)));
        }
        Ok(())
    }

    #[test]
    fn test_split_requires_empty_sibling() -> Result<()> {
        let config = BTreeConfig::default();
        let mut leaf = full_leaf(&config)?;
        let mut sibling = LeafNode::new(&config);
        sibling.insert(1, rid(1))?;

        assert!(matches!(
            leaf.insert_and_split(3, rid(3), &mut sibling, PageId::new(4)),
            Err(IndexError::InvalidPrecondition(_))
        ));
        assert_eq!(leaf.key_count(), MAX_KEY_NUM);
        Ok(())
    }

    #[test]
    fn test_encode_decode_at_fill_levels() -> Result<()> {
        let config = BTreeConfig::default();
        for fill in [0usize, 1, 44, 85] {
            let mut leaf = LeafNode::new(&config);
            for k in 0..fill as i32 {
                leaf.insert(k * 3 - 41, rid(k))?;
            }
            if fill > 0 {
                leaf.set_next_leaf(Some(PageId::new(fill as u32)));
            }

            let page = leaf.encode()?;
            let decoded = LeafNode::decode(&page, &config)?;
            assert_eq!(decoded, leaf);
            assert_eq!(decoded.encode()?, page);
        }
        Ok(())
    }

    #[test]
    fn test_empty_leaf_page_layout() -> Result<()> {
        let mut leaf = LeafNode::new(&BTreeConfig::default());
        leaf.set_next_leaf(Some(PageId::new(3)));
        let page = leaf.encode()?;

        assert!(page.as_bytes()[..NEXT_LEAF_OFFSET].iter().all(|b| *b == 0xFF));
        assert_eq!(page.read_i32(NEXT_LEAF_OFFSET)?, 3);
        Ok(())
    }

    #[test]
    fn test_gap_in_entries_is_corruption() -> Result<()> {
        let mut page = LeafNode::new(&BTreeConfig::default()).encode()?;
        LeafEntry::new(7, rid(7)).write(&mut page, 2 * LeafEntry::SIZE)?;
        assert!(matches!(
            LeafNode::decode(&page, &BTreeConfig::default()),
            Err(IndexError::Corruption(_))
        ));
        Ok(())
    }
}
