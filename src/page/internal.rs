//! Internal node codec.
//!
//! An internal node is a leading child pointer followed by up to
//! [`MAX_KEY_NUM`] `(key, child)` pairs sorted by key. With `k` keys the node
//! has `k + 1` children:
//!
//! ```text
//! [c0] k0 [c1] k1 [c2] ... k(n-1) [cn]
//!
//! c0      -> keys < k0
//! c(i+1)  -> keys in [k(i), k(i+1))
//! cn      -> keys >= k(n-1)
//! ```
//!
//! A key equal to a separator therefore lives in the subtree to the
//! separator's right.

use crate::error::{IndexError, Result};
use crate::page::{InternalEntry, PageBuf};
use crate::types::{BTreeConfig, PageId, MAX_KEY_NUM, PAGE_ID_SIZE, SENTINEL};

/// In-memory decoding of one internal page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    first_child: Option<PageId>,
    entries: Vec<InternalEntry>,
    max_keys: usize,
}

impl InternalNode {
    /// Create an uninitialized node with no keys or children
    pub fn new(config: &BTreeConfig) -> Self {
        Self {
            first_child: None,
            entries: Vec::with_capacity(config.max_interior_keys + 1),
            max_keys: config.max_interior_keys,
        }
    }

    /// Decode an internal node from its page
    pub fn decode(page: &PageBuf, config: &BTreeConfig) -> Result<Self> {
        let mut node = Self::new(config);
        node.first_child = PageId::from_disk(page.read_i32(0)?)?;

        let mut ended = false;
        for slot in 0..MAX_KEY_NUM {
            match InternalEntry::read(page, entry_offset(slot))? {
                Some(_) if ended => {
                    return Err(IndexError::corruption(format!(
                        "internal entry {} follows an unset slot",
                        slot
                    )));
                }
                Some(entry) => node.entries.push(entry),
                None => ended = true,
            }
        }

        if !node.entries.is_empty() && node.first_child.is_none() {
            return Err(IndexError::corruption(
                "internal node has keys but no leading child",
            ));
        }
        Ok(node)
    }

    /// Encode this node into a full page
    pub fn encode(&self) -> Result<PageBuf> {
        if self.entries.len() > MAX_KEY_NUM {
            return Err(IndexError::corruption(format!(
                "internal node holds {} keys, page fits {}",
                self.entries.len(),
                MAX_KEY_NUM
            )));
        }

        let mut page = PageBuf::new();
        page.write_i32(0, PageId::to_disk(self.first_child))?;
        for (slot, entry) in self.entries.iter().enumerate() {
            entry.write(&mut page, entry_offset(slot))?;
        }
        Ok(page)
    }

    /// Number of separator keys
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// True once the node holds its configured maximum
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_keys
    }

    /// Separator entries in key order
    pub fn entries(&self) -> &[InternalEntry] {
        &self.entries
    }

    /// First separator key, or `None` for an empty node
    pub fn first_key(&self) -> Option<i32> {
        self.entries.first().map(|e| e.key)
    }

    /// All child pointers, left to right
    pub fn children(&self) -> impl Iterator<Item = PageId> + '_ {
        self.first_child
            .into_iter()
            .chain(self.entries.iter().map(|e| e.child))
    }

    /// Index of the child covering `search_key`: 0 is the leading pointer,
    /// `i + 1` the pointer stored with separator `i`
    pub fn child_slot(&self, search_key: i32) -> usize {
        self.entries.partition_point(|e| e.key <= search_key)
    }

    /// Child pointer at a slot as numbered by [`InternalNode::child_slot`]
    pub fn child_at(&self, slot: usize) -> Option<PageId> {
        match slot {
            0 => self.first_child,
            n => self.entries.get(n - 1).map(|e| e.child),
        }
    }

    /// Child pointer to follow for `search_key`: the pointer just left of the
    /// first separator strictly greater than the key
    pub fn locate_child_ptr(&self, search_key: i32) -> Result<PageId> {
        if self.entries.is_empty() {
            return Err(IndexError::corruption("descent through an empty internal node"));
        }
        self.child_at(self.child_slot(search_key))
            .ok_or_else(|| IndexError::corruption("internal node has no leading child"))
    }

    /// Insert a separator and the child to its right at the sorted position
    pub fn insert(&mut self, key: i32, child: PageId) -> Result<()> {
        check_key(key)?;
        if self.is_full() {
            return Err(IndexError::NodeFull);
        }
        let pos = self.entries.partition_point(|e| e.key < key);
        self.entries.insert(pos, InternalEntry::new(key, child));
        Ok(())
    }

    /// Insert a separator into a full node by splitting it with `sibling`.
    ///
    /// The separator at the split boundary is removed from both halves and
    /// returned for insertion into the parent; its child becomes the
    /// sibling's leading pointer. The half that receives the new entry keeps
    /// the larger share of keys, so the new entry is never the one promoted.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        child: PageId,
        sibling: &mut InternalNode,
    ) -> Result<i32> {
        check_key(key)?;
        if sibling.key_count() != 0 || sibling.first_child.is_some() {
            return Err(IndexError::precondition("split sibling node must be empty"));
        }
        if self.first_child.is_none() {
            return Err(IndexError::precondition("cannot split an uninitialized node"));
        }

        let existing = self.entries.len();
        let pos = self.entries.partition_point(|e| e.key < key);
        let total = existing + 1;
        let boundary = if pos <= existing / 2 {
            total / 2
        } else {
            (total - 1) / 2
        };
        if boundary == 0 || boundary + 1 >= total {
            return Err(IndexError::precondition(format!(
                "node with {} keys is too small to split",
                existing
            )));
        }

        self.entries.insert(pos, InternalEntry::new(key, child));
        let upper = self.entries.split_off(boundary);
        let (promoted, rest) = upper
            .split_first()
            .ok_or_else(|| IndexError::corruption("split boundary past the last key"))?;
        let (seed, remainder) = rest
            .split_first()
            .ok_or_else(|| IndexError::corruption("split left the sibling without keys"))?;

        sibling.initialize_root(promoted.child, seed.key, seed.child)?;
        sibling.entries.extend_from_slice(remainder);

        Ok(promoted.key)
    }

    /// Lay down the minimal node `[pid1] key [pid2]`
    pub fn initialize_root(&mut self, pid1: PageId, key: i32, pid2: PageId) -> Result<()> {
        check_key(key)?;
        if self.key_count() > 0 {
            return Err(IndexError::precondition("node is already initialized"));
        }
        self.first_child = Some(pid1);
        self.entries.clear();
        self.entries.push(InternalEntry::new(key, pid2));
        Ok(())
    }
}

fn entry_offset(slot: usize) -> usize {
    PAGE_ID_SIZE + slot * InternalEntry::SIZE
}

fn check_key(key: i32) -> Result<()> {
    if key == SENTINEL {
        return Err(IndexError::ReservedKey(key));
    }
    Ok(())
}
