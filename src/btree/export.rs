//! Tree inspection: structure export, statistics and consistency checks.

use crate::btree::BTreeIndex;
use crate::error::{IndexError, Result};
use crate::storage::PageStore;
use crate::types::{PageId, RecordId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Node snapshot for visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Page ID
    pub page_id: u32,
    /// Whether this is a leaf node
    pub is_leaf: bool,
    /// Keys in this node
    pub keys: Vec<i32>,
    /// Record locators (only for leaf nodes)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RecordId>,
    /// Next leaf in the chain (only for leaf nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_leaf: Option<u32>,
    /// Child nodes (only for internal nodes)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Root page, if the tree is non-empty
    pub root_page: Option<u32>,
    /// Height of the tree
    pub tree_height: u32,
    /// Pages in the store, metadata page included
    pub page_count: u32,
    /// Leaves reachable along the leaf chain
    pub leaf_count: usize,
    /// Entries across all leaves
    pub entry_count: usize,
}

/// Bounds every key of a subtree must respect: `low <= key < high`
#[derive(Debug, Clone, Copy)]
struct KeyBounds {
    low: Option<i32>,
    high: Option<i32>,
}

impl KeyBounds {
    fn contains(&self, key: i32) -> bool {
        self.low.map_or(true, |low| key >= low) && self.high.map_or(true, |high| key < high)
    }
}

impl<S: PageStore> BTreeIndex<S> {
    /// Export the tree structure, `None` for an empty tree
    pub fn export_tree(&self) -> Result<Option<TreeNode>> {
        match self.root_pid() {
            Some(root) => self.export_node(root, 1).map(Some),
            None => Ok(None),
        }
    }

    fn export_node(&self, page_id: PageId, level: u32) -> Result<TreeNode> {
        if level >= self.height() {
            let leaf = self.read_leaf(page_id)?;
            return Ok(TreeNode {
                page_id: page_id.value(),
                is_leaf: true,
                keys: leaf.entries().iter().map(|e| e.key).collect(),
                records: leaf.entries().iter().map(|e| e.rid).collect(),
                next_leaf: leaf.next_leaf().map(PageId::value),
                children: Vec::new(),
            });
        }

        let node = self.read_internal(page_id)?;
        let children = node
            .children()
            .map(|child| self.export_node(child, level + 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(TreeNode {
            page_id: page_id.value(),
            is_leaf: false,
            keys: node.entries().iter().map(|e| e.key).collect(),
            records: Vec::new(),
            next_leaf: None,
            children,
        })
    }

    /// Collect statistics by walking the leaf chain
    pub fn stats(&self) -> Result<IndexStats> {
        let mut stats = IndexStats {
            root_page: self.root_pid().map(PageId::value),
            tree_height: self.height(),
            page_count: self.store().end_pid().value(),
            ..IndexStats::default()
        };

        let Some(root) = self.root_pid() else {
            return Ok(stats);
        };
        let mut next = self.get_child(i32::MIN, root, 1)?;
        while let Some(pid) = next {
            if stats.leaf_count as u32 > stats.page_count {
                return Err(IndexError::corruption("leaf chain does not terminate"));
            }
            let leaf = self.read_leaf(pid)?;
            stats.leaf_count += 1;
            stats.entry_count += leaf.key_count();
            next = leaf.next_leaf();
        }
        Ok(stats)
    }

    /// Check the structural invariants of the whole tree.
    ///
    /// Verifies that all leaves sit at the same depth, keys are strictly
    /// ascending within nodes and respect the separators above them, the
    /// leaf chain visits the leaves in key order, and no node is over
    /// capacity. Assumes unique keys.
    pub fn verify(&self) -> Result<IndexStats> {
        let Some(root) = self.root_pid() else {
            return self.stats();
        };

        let mut leaves = Vec::new();
        let bounds = KeyBounds {
            low: None,
            high: None,
        };
        self.verify_node(root, 1, bounds, &mut leaves)?;

        for (pid, expected_next) in leaves
            .iter()
            .zip(leaves.iter().skip(1).map(|p| Some(*p)).chain(std::iter::once(None)))
        {
            let next = self.read_leaf(*pid)?.next_leaf();
            if next != expected_next {
                return Err(IndexError::corruption(format!(
                    "leaf {} links to {:?}, expected {:?}",
                    pid, next, expected_next
                )));
            }
        }

        let stats = self.stats()?;
        if stats.leaf_count != leaves.len() {
            return Err(IndexError::corruption(format!(
                "leaf chain has {} leaves, tree has {}",
                stats.leaf_count,
                leaves.len()
            )));
        }
        debug!(leaves = leaves.len(), entries = stats.entry_count, "verified index");
        Ok(stats)
    }

    fn verify_node(
        &self,
        page_id: PageId,
        level: u32,
        bounds: KeyBounds,
        leaves: &mut Vec<PageId>,
    ) -> Result<()> {
        if level >= self.height() {
            let leaf = self.read_leaf(page_id)?;
            let keys: Vec<i32> = leaf.entries().iter().map(|e| e.key).collect();
            check_keys(page_id, &keys, bounds, self.config().max_leaf_keys)?;
            leaves.push(page_id);
            return Ok(());
        }

        let node = self.read_internal(page_id)?;
        let keys: Vec<i32> = node.entries().iter().map(|e| e.key).collect();
        if keys.is_empty() {
            return Err(IndexError::corruption(format!(
                "internal node {} has no keys",
                page_id
            )));
        }
        check_keys(page_id, &keys, bounds, self.config().max_interior_keys)?;

        for (slot, child) in node.children().enumerate() {
            let child_bounds = KeyBounds {
                low: if slot == 0 { bounds.low } else { Some(keys[slot - 1]) },
                high: keys.get(slot).copied().or(bounds.high),
            };
            self.verify_node(child, level + 1, child_bounds, leaves)?;
        }
        Ok(())
    }
}

fn check_keys(page_id: PageId, keys: &[i32], bounds: KeyBounds, max_keys: usize) -> Result<()> {
    if keys.len() > max_keys {
        return Err(IndexError::corruption(format!(
            "node {} holds {} keys, capacity {}",
            page_id,
            keys.len(),
            max_keys
        )));
    }
    if keys.windows(2).any(|w| w[0] >= w[1]) {
        return Err(IndexError::corruption(format!(
            "node {} keys out of order",
            page_id
        )));
    }
    if let Some(key) = keys.iter().find(|k| !bounds.contains(**k)) {
        return Err(IndexError::corruption(format!(
            "key {} in node {} outside {:?}",
            key, page_id, bounds
        )));
    }
    Ok(())
}
