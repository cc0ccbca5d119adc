//! B+Tree controller.
//!
//! The tree is described entirely by the pair `(root, height)` kept in the
//! metadata page. An empty tree has no root and height 0. The first insert
//! builds a fixed three-page layout (internal root at page 1, leaves at pages
//! 2 and 3) with height 2; afterwards the height grows by one each time the
//! root splits. Every level above the leaves is an internal node, so a
//! descent is always exactly `height - 1` internal hops.
//!
//! Nodes carry no parent pointers. Inserts remember the internal pages they
//! pass through and walk that path back up to place promoted keys.

use crate::btree::IndexCursor;
use crate::error::{IndexError, Result};
use crate::page::{InternalNode, LeafEntry, LeafNode};
use crate::storage::{FileHeader, OpenMode, PageFile, PageStore};
use crate::types::{BTreeConfig, PageId, RecordId, SENTINEL};
use std::path::Path;
use tracing::{debug, info, trace};

/// Page of the root created by the first insert
const BOOTSTRAP_ROOT: PageId = PageId::new(1);
/// Left leaf created by the first insert; starts empty
const BOOTSTRAP_LEFT: PageId = PageId::new(2);
/// Right leaf created by the first insert; holds the first key
const BOOTSTRAP_RIGHT: PageId = PageId::new(3);

/// A disk-based B+Tree mapping `i32` keys to record locators
pub struct BTreeIndex<S: PageStore = PageFile> {
    store: S,
    header: FileHeader,
    config: BTreeConfig,
}

impl BTreeIndex<PageFile> {
    /// Open an index file. In [`OpenMode::Write`] a missing file is created
    /// with an empty tree.
    pub fn open(
        path: &Path,
        mode: OpenMode,
        config: BTreeConfig,
        sync_on_write: bool,
    ) -> Result<Self> {
        let store = PageFile::open(path, mode, sync_on_write)?;
        Self::with_store(store, config)
    }

    /// Flush and close the index file
    pub fn close(self) -> Result<()> {
        info!(
            root = ?self.header.root_page,
            height = self.header.tree_height,
            "closing index"
        );
        self.store.close()
    }
}

impl<S: PageStore> BTreeIndex<S> {
    /// Load the tree from a page store, initializing page 0 of an empty store
    pub fn with_store(store: S, config: BTreeConfig) -> Result<Self> {
        let header = if store.end_pid() == PageId::META {
            let header = FileHeader::new();
            store.write_page(PageId::META, &header.write()?)?;
            header
        } else {
            FileHeader::read(&store.read_page(PageId::META)?)?
        };

        info!(
            root = ?header.root_page,
            height = header.tree_height,
            "opened index"
        );
        Ok(Self {
            store,
            header,
            config,
        })
    }

    /// Root page id, `None` for an empty tree
    pub fn root_pid(&self) -> Option<PageId> {
        self.header.root_page
    }

    /// Number of node levels from root to leaf inclusive
    pub fn height(&self) -> u32 {
        self.header.tree_height
    }

    /// Node capacity limits in use
    pub fn config(&self) -> &BTreeConfig {
        &self.config
    }

    /// The underlying page store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert a key and its record locator.
    ///
    /// Keys are expected to be unique; the tree does not reject duplicates.
    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        if key == SENTINEL {
            return Err(IndexError::ReservedKey(key));
        }
        let Some(root) = self.header.root_page else {
            return self.bootstrap(key, rid);
        };

        let (path, leaf_pid) = self.descend(root, key)?;
        let mut leaf = self.read_leaf(leaf_pid)?;
        if !leaf.is_full() {
            leaf.insert(key, rid)?;
            return self.write_leaf(leaf_pid, &leaf);
        }

        let sibling_pid = self.store.end_pid();
        let mut sibling = LeafNode::new(&self.config);
        let promoted = leaf.insert_and_split(key, rid, &mut sibling, sibling_pid)?;
        self.write_leaf(sibling_pid, &sibling)?;
        self.write_leaf(leaf_pid, &leaf)?;
        debug!(
            leaf = leaf_pid.value(),
            sibling = sibling_pid.value(),
            promoted,
            left = leaf.key_count(),
            right = sibling.key_count(),
            "split leaf"
        );

        self.promote(path, promoted, sibling_pid)
    }

    /// Find the leaf position of `search_key`.
    ///
    /// Returns a cursor at the entry holding the key and `true`, or at the
    /// first larger entry and `false`. That position may lie past the end of
    /// the leaf; [`BTreeIndex::read_forward`] moves on along the leaf chain.
    pub fn locate(&self, search_key: i32) -> Result<(IndexCursor, bool)> {
        let Some(root) = self.header.root_page else {
            return Ok((IndexCursor::end(), false));
        };
        let leaf_pid = self
            .get_child(search_key, root, 1)?
            .ok_or_else(|| IndexError::corruption("descent ended without a leaf"))?;
        let leaf = self.read_leaf(leaf_pid)?;
        let (eid, found) = leaf.locate(search_key);
        trace!(key = search_key, leaf = leaf_pid.value(), eid, found, "located");
        Ok((IndexCursor::new(leaf_pid, eid), found))
    }

    /// Read the entry under the cursor and advance the cursor past it.
    ///
    /// Positions past the end of a leaf are skipped by following the leaf
    /// chain. Returns `None` once the chain is exhausted.
    pub fn read_forward(&self, cursor: &mut IndexCursor) -> Result<Option<LeafEntry>> {
        let mut hops = 0u32;
        loop {
            let Some(pid) = cursor.pid else {
                return Ok(None);
            };
            let leaf = self.read_leaf(pid)?;

            if cursor.eid < leaf.key_count() {
                let entry = leaf.read_entry(cursor.eid)?;
                if cursor.eid + 1 < leaf.key_count() {
                    cursor.eid += 1;
                } else {
                    cursor.pid = leaf.next_leaf();
                    cursor.eid = 0;
                }
                return Ok(Some(entry));
            }

            hops += 1;
            if hops > self.store.end_pid().value() {
                return Err(IndexError::corruption("leaf chain does not terminate"));
            }
            trace!(leaf = pid.value(), next = ?leaf.next_leaf(), "cursor past leaf end");
            cursor.pid = leaf.next_leaf();
            cursor.eid = 0;
        }
    }

    /// Find the internal node whose child pointer for `key` is `child`.
    ///
    /// Descends by key from `search_root`, which sits at level
    /// `current_height` (the root is level 1). Returns `None` if no node on
    /// the path down to the level above the leaves points at `child`.
    pub fn get_parent(
        &self,
        key: i32,
        child: PageId,
        search_root: PageId,
        current_height: u32,
    ) -> Result<Option<PageId>> {
        if self.header.root_page.is_none() {
            return Ok(None);
        }

        let mut current = search_root;
        let mut level = current_height;
        loop {
            let next = self.read_internal(current)?.locate_child_ptr(key)?;
            if next == child {
                return Ok(Some(current));
            }
            if level + 1 >= self.header.tree_height {
                return Ok(None);
            }
            current = next;
            level += 1;
        }
    }

    /// Descend by key from `search_root` (at level `current_height`) and
    /// return the child pointer taken at the level above the leaves
    pub fn get_child(
        &self,
        key: i32,
        search_root: PageId,
        current_height: u32,
    ) -> Result<Option<PageId>> {
        if self.header.root_page.is_none() {
            return Ok(None);
        }

        let mut current = search_root;
        let mut level = current_height;
        loop {
            let next = self.read_internal(current)?.locate_child_ptr(key)?;
            if level + 1 >= self.header.tree_height {
                return Ok(Some(next));
            }
            current = next;
            level += 1;
        }
    }

    /// Build the initial root and its two leaves
    fn bootstrap(&mut self, key: i32, rid: RecordId) -> Result<()> {
        if self.store.end_pid() != BOOTSTRAP_ROOT {
            return Err(IndexError::corruption(format!(
                "empty index already has {} pages",
                self.store.end_pid()
            )));
        }

        let mut root = InternalNode::new(&self.config);
        root.initialize_root(BOOTSTRAP_LEFT, key, BOOTSTRAP_RIGHT)?;

        let mut left = LeafNode::new(&self.config);
        left.set_next_leaf(Some(BOOTSTRAP_RIGHT));

        let mut right = LeafNode::new(&self.config);
        right.insert(key, rid)?;

        self.write_internal(BOOTSTRAP_ROOT, &root)?;
        self.write_leaf(BOOTSTRAP_LEFT, &left)?;
        self.write_leaf(BOOTSTRAP_RIGHT, &right)?;
        info!(key, "created root");

        self.set_root(BOOTSTRAP_ROOT, 2)
    }

    /// Walk internal levels from the root to the leaf covering `key`,
    /// returning the internal pages passed through, root first
    fn descend(&self, root: PageId, key: i32) -> Result<(Vec<PageId>, PageId)> {
        let levels = self.header.tree_height.saturating_sub(1) as usize;
        let mut path = Vec::with_capacity(levels);
        let mut current = root;

        for _ in 0..levels {
            let next = self.read_internal(current)?.locate_child_ptr(key)?;
            path.push(current);
            current = next;
        }

        trace!(key, leaf = current.value(), depth = path.len(), "descended");
        Ok((path, current))
    }

    /// Place a separator produced by a split into the ancestors on `path`,
    /// splitting them in turn while they are full, and grow a new root if
    /// the old root splits.
    fn promote(&mut self, mut path: Vec<PageId>, key: i32, right: PageId) -> Result<()> {
        let mut key = key;
        let mut right = right;

        while let Some(page_id) = path.pop() {
            let mut node = self.read_internal(page_id)?;
            if !node.is_full() {
                node.insert(key, right)?;
                trace!(node = page_id.value(), key, "placed separator");
                return self.write_internal(page_id, &node);
            }

            let sibling_pid = self.store.end_pid();
            let mut sibling = InternalNode::new(&self.config);
            let mid = node.insert_and_split(key, right, &mut sibling)?;
            self.write_internal(sibling_pid, &sibling)?;
            self.write_internal(page_id, &node)?;
            debug!(
                node = page_id.value(),
                sibling = sibling_pid.value(),
                promoted = mid,
                "split internal node"
            );

            key = mid;
            right = sibling_pid;
        }

        let old_root = self
            .header
            .root_page
            .ok_or_else(|| IndexError::corruption("root split in an empty tree"))?;
        let new_root_pid = self.store.end_pid();
        let mut new_root = InternalNode::new(&self.config);
        new_root.initialize_root(old_root, key, right)?;
        self.write_internal(new_root_pid, &new_root)?;

        let height = self.header.tree_height + 1;
        info!(root = new_root_pid.value(), height, "grew new root");
        self.set_root(new_root_pid, height)
    }

    /// Record a new root and height, persisting page 0 immediately
    fn set_root(&mut self, root: PageId, height: u32) -> Result<()> {
        let header = FileHeader {
            root_page: Some(root),
            tree_height: height,
        };
        self.store.write_page(PageId::META, &header.write()?)?;
        self.header = header;
        Ok(())
    }

    pub(crate) fn read_leaf(&self, pid: PageId) -> Result<LeafNode> {
        LeafNode::decode(&self.store.read_page(pid)?, &self.config)
    }

    pub(crate) fn read_internal(&self, pid: PageId) -> Result<InternalNode> {
        InternalNode::decode(&self.store.read_page(pid)?, &self.config)
    }

    fn write_leaf(&self, pid: PageId, node: &LeafNode) -> Result<()> {
        self.store.write_page(pid, &node.encode()?)
    }

    fn write_internal(&self, pid: PageId, node: &InternalNode) -> Result<()> {
        self.store.write_page(pid, &node.encode()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemPageStore;
    use tempfile::tempdir;

    fn rid(key: i32) -> RecordId {
        RecordId::new(key as u32 / 9, key as u32 % 9)
    }

    fn mem_tree(config: BTreeConfig) -> Result<BTreeIndex<MemPageStore>> {
        BTreeIndex::with_store(MemPageStore::new(), config)
    }

    fn collect_all<S: PageStore>(tree: &BTreeIndex<S>) -> Result<Vec<LeafEntry>> {
        let (mut cursor, _) = tree.locate(i32::MIN)?;
        let mut out = Vec::new();
        while let Some(entry) = tree.read_forward(&mut cursor)? {
            out.push(entry);
        }
        Ok(out)
    }

    #[test]
    fn test_empty_tree() -> Result<()> {
        let tree = mem_tree(BTreeConfig::default())?;
        assert_eq!(tree.root_pid(), None);
        assert_eq!(tree.height(), 0);

        let (mut cursor, found) = tree.locate(10)?;
        assert!(!found);
        assert_eq!(tree.read_forward(&mut cursor)?, None);
        assert_eq!(tree.get_child(10, PageId::new(1), 1)?, None);
        Ok(())
    }

    #[test]
    fn test_first_insert_bootstrap_layout() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::default())?;
        tree.insert(50, RecordId::new(1, 2))?;

        assert_eq!(tree.root_pid(), Some(PageId::new(1)));
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.store().end_pid(), PageId::new(4));

        let root = tree.read_internal(PageId::new(1))?;
        let children: Vec<PageId> = root.children().collect();
        assert_eq!(children, vec![PageId::new(2), PageId::new(3)]);
        assert_eq!(root.first_key(), Some(50));

        let left = tree.read_leaf(PageId::new(2))?;
        assert_eq!(left.key_count(), 0);
        assert_eq!(left.next_leaf(), Some(PageId::new(3)));

        let right = tree.read_leaf(PageId::new(3))?;
        assert_eq!(right.entries(), &[LeafEntry::new(50, RecordId::new(1, 2))]);
        assert_eq!(right.next_leaf(), None);

        let meta = FileHeader::read(&tree.store().read_page(PageId::META)?)?;
        assert_eq!(meta.root_page, Some(PageId::new(1)));
        assert_eq!(meta.tree_height, 2);
        Ok(())
    }

    #[test]
    fn test_smaller_keys_fill_left_bootstrap_leaf() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::default())?;
        for key in [50, 10, 70, 30] {
            tree.insert(key, rid(key))?;
        }
        let left = tree.read_leaf(PageId::new(2))?;
        let keys: Vec<i32> = left.entries().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![10, 30]);

        let all: Vec<i32> = collect_all(&tree)?.iter().map(|e| e.key).collect();
        assert_eq!(all, vec![10, 30, 50, 70]);
        Ok(())
    }

    #[test]
    fn test_sequential_170_default_config_keeps_height() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::default())?;
        tree.insert(1, RecordId::new(1, 2))?;
        assert_eq!(tree.height(), 2);

        for key in 2..=170 {
            tree.insert(key, RecordId::new(1, 2))?;
        }
        assert_eq!(tree.height(), 2);

        for key in 1..=170 {
            let (mut cursor, found) = tree.locate(key)?;
            assert!(found, "key {} not found", key);
            let entry = tree.read_forward(&mut cursor)?.expect("entry under cursor");
            assert_eq!(entry, LeafEntry::new(key, RecordId::new(1, 2)));
        }
        Ok(())
    }

    #[test]
    fn test_sequential_170_splits_root_once() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::uniform(12))?;
        let mut roots = Vec::new();
        for key in 1..=170 {
            tree.insert(key, RecordId::new(1, 2))?;
            if roots.last() != tree.root_pid().as_ref() {
                roots.extend(tree.root_pid());
            }
        }

        assert_eq!(roots.len(), 2);
        assert_eq!(tree.height(), 3);
        for key in 1..=170 {
            assert!(tree.locate(key)?.1, "key {} not found", key);
        }
        Ok(())
    }

    #[test]
    fn test_root_split_increments_height_by_one() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::uniform(3))?;
        let mut height = 0;
        let mut root_splits = 0;

        for key in 1..=400 {
            let before = tree.root_pid();
            tree.insert(key, rid(key))?;
            if key > 1 && tree.root_pid() != before {
                root_splits += 1;
                assert_eq!(tree.height(), height + 1);
            } else if key > 1 {
                assert_eq!(tree.height(), height);
            }
            height = tree.height();

            let root = tree.read_internal(tree.root_pid().expect("non-empty tree"))?;
            assert!(root.key_count() > 0);
        }

        assert!(root_splits >= 3);
        assert_eq!(tree.height(), 2 + root_splits);
        let keys: Vec<i32> = collect_all(&tree)?.iter().map(|e| e.key).collect();
        assert_eq!(keys, (1..=400).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_locate_missing_key() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::default())?;
        for key in 1..=10 {
            tree.insert(key, rid(key))?;
        }

        let (mut cursor, found) = tree.locate(999)?;
        assert!(!found);
        assert_eq!(tree.read_forward(&mut cursor)?, None);

        let (mut cursor, found) = tree.locate(0)?;
        assert!(!found);
        assert_eq!(tree.read_forward(&mut cursor)?.map(|e| e.key), Some(1));
        Ok(())
    }

    #[test]
    fn test_locate_between_leaves_follows_chain() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::uniform(4))?;
        for key in (0..100).map(|k| k * 10) {
            tree.insert(key, rid(key))?;
        }
        for probe in [5, 15, 255, 985] {
            let (mut cursor, found) = tree.locate(probe)?;
            assert!(!found);
            let next = tree.read_forward(&mut cursor)?.map(|e| e.key);
            assert_eq!(next, Some((probe / 10 + 1) * 10), "probe {}", probe);
        }
        let (mut cursor, _) = tree.locate(995)?;
        assert_eq!(tree.read_forward(&mut cursor)?, None);
        Ok(())
    }

    #[test]
    fn test_get_parent_and_get_child_are_inverse() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::uniform(3))?;
        for key in 1..=120 {
            tree.insert(key, rid(key))?;
        }
        assert!(tree.height() >= 4);
        let root = tree.root_pid().expect("non-empty tree");

        for key in [1, 17, 60, 119] {
            let leaf = tree.get_child(key, root, 1)?.expect("leaf");
            let parent = tree.get_parent(key, leaf, root, 1)?.expect("parent");
            assert_eq!(
                tree.get_child(key, parent, tree.height() - 1)?,
                Some(leaf)
            );

            let (path, descended_leaf) = tree.descend(root, key)?;
            assert_eq!(descended_leaf, leaf);
            assert_eq!(path.last().copied(), Some(parent));

            let (cursor, found) = tree.locate(key)?;
            assert!(found);
            assert_eq!(cursor.pid, Some(leaf));
        }

        assert_eq!(tree.get_parent(5, PageId::new(9999), root, 1)?, None);
        Ok(())
    }

    #[test]
    fn test_reserved_key_rejected_without_writes() -> Result<()> {
        let mut tree = mem_tree(BTreeConfig::default())?;
        assert!(matches!(
            tree.insert(-1, rid(1)),
            Err(IndexError::ReservedKey(-1))
        ));
        assert_eq!(tree.store().end_pid(), PageId::new(1));
        Ok(())
    }

    #[test]
    fn test_extreme_keys_and_mixed_orders() -> Result<()> {
        for config in [
            BTreeConfig::uniform(2),
            BTreeConfig::uniform(3),
            BTreeConfig::default(),
        ] {
            let mut tree = mem_tree(config)?;
            let mut keys = vec![i32::MIN, i32::MAX];
            keys.extend((1..=1500).rev().map(|k| k * 2));
            keys.extend((1..=1500).map(|k| k * 2 + 1));
            for &key in &keys {
                tree.insert(key, RecordId::new(key.unsigned_abs() % 1000, 0))?;
            }

            let stats = tree.verify()?;
            assert_eq!(stats.entry_count, keys.len());
            for &key in &keys {
                let (mut cursor, found) = tree.locate(key)?;
                assert!(found, "key {} under {:?}", key, config);
                let entry = tree.read_forward(&mut cursor)?.expect("entry");
                assert_eq!(entry.key, key);
            }

            let all = collect_all(&tree)?;
            assert_eq!(all.first().map(|e| e.key), Some(i32::MIN));
            assert_eq!(all.last().map(|e| e.key), Some(i32::MAX));
        }
        Ok(())
    }

    #[test]
    fn test_persisted_tree_reopens() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movie.idx");
        {
            let mut tree =
                BTreeIndex::open(&path, OpenMode::Write, BTreeConfig::uniform(5), false)?;
            for key in (1..=300).rev() {
                tree.insert(key, rid(key))?;
            }
            tree.close()?;
        }

        let tree = BTreeIndex::open(&path, OpenMode::Read, BTreeConfig::uniform(5), false)?;
        assert!(tree.height() > 2);
        let entries = collect_all(&tree)?;
        assert_eq!(entries.len(), 300);
        assert!(entries.iter().all(|e| e.rid == rid(e.key)));
        Ok(())
    }

    #[test]
    fn test_read_only_empty_file_cannot_initialize() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.idx");
        std::fs::File::create(&path)?;
        assert!(matches!(
            BTreeIndex::open(&path, OpenMode::Read, BTreeConfig::default(), false),
            Err(IndexError::ReadOnly)
        ));
        Ok(())
    }
}
