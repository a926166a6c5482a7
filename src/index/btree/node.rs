//! B-tree node and the structural primitives that keep it balanced.
//!
//! Insertion and deletion recurse down to a leaf and repair the tree on the
//! way back up:
//! - a node left holding `B` keys is split around its median
//! - a child left holding fewer than `ceil(B/2) - 1` keys borrows from a
//!   sibling or is merged with one
//!
//! Every primitive validates its inputs before it moves anything, so a
//! [`Error::CorruptedTree`] never leaves a half-applied rotation behind.

use std::mem;

use tracing::trace;

use crate::common::{Error, IndexConfig, Result};
use crate::index::btree::pool::NodePool;
use crate::index::btree::stats::RebalanceStats;

/// A single node of the tree.
///
/// # Layout
/// ```text
///            keys:      [ k0 | k1 | k2 ]
///            children:  c0   c1   c2   c3
///
///   c0 < k0 < c1 < k1 < c2 < k2 < c3
/// ```
/// Leaves have no children. Internal nodes own exactly `keys.len() + 1`
/// children by value, so dropping a node releases its whole subtree.
#[derive(Debug)]
pub(crate) struct Node<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<Node<K>>,
    pub(crate) leaf: bool,
}

/// Promoted separator and new right sibling produced by a split.
pub(crate) type Split<K> = (K, Node<K>);

impl<K> Node<K> {
    /// An empty leaf with no reserved storage.
    pub(crate) fn empty_leaf() -> Self {
        Self {
            keys: Vec::new(),
            children: Vec::new(),
            leaf: true,
        }
    }

    /// Allocate a node with room for the transient one-key overflow.
    ///
    /// # Errors
    /// - `Error::Allocation` if the storage cannot be reserved
    pub(crate) fn try_new(leaf: bool, order: usize) -> Result<Self> {
        let mut node = Self::empty_leaf();
        node.leaf = leaf;
        node.reserve(order)?;
        Ok(node)
    }

    /// Make sure the node can hold `order` keys (and `order + 1` children if
    /// internal) without reallocating.
    pub(crate) fn reserve(&mut self, order: usize) -> Result<()> {
        self.keys
            .try_reserve_exact(order.saturating_sub(self.keys.len()))?;
        if !self.leaf {
            self.children
                .try_reserve_exact((order + 1).saturating_sub(self.children.len()))?;
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Smallest key of the subtree.
    pub(crate) fn first_key(&self) -> Option<&K> {
        let mut node = self;
        while !node.leaf {
            node = node.children.first()?;
        }
        node.keys.first()
    }

    /// Largest key of the subtree.
    pub(crate) fn last_key(&self) -> Option<&K> {
        let mut node = self;
        while !node.leaf {
            node = node.children.last()?;
        }
        node.keys.last()
    }

    /// Key count of the leaf holding the subtree's largest key.
    fn rightmost_leaf_len(&self) -> usize {
        let mut node = self;
        while let Some(child) = node.children.last() {
            node = child;
        }
        node.len()
    }

    /// Key count of the leaf holding the subtree's smallest key.
    fn leftmost_leaf_len(&self) -> usize {
        let mut node = self;
        while let Some(child) = node.children.first() {
            node = child;
        }
        node.len()
    }

    fn check_fanout(&self, what: &str) -> Result<()> {
        if !self.leaf && self.children.len() != self.keys.len() + 1 {
            return Err(Error::corrupted(format!(
                "{}: internal node has {} keys but {} children",
                what,
                self.keys.len(),
                self.children.len()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Split
    // ========================================================================

    /// Split this node around its median key.
    ///
    /// With `mid = len / 2`, this node keeps keys `0..mid` and children
    /// `0..=mid`; `sibling` receives keys `mid+1..` and children `mid+1..`;
    /// the key at `mid` is returned for the parent. For an overflowing node
    /// of `B` keys both halves end up with at least `ceil(B/2) - 1` keys.
    ///
    /// `sibling` must be empty. It is taken as an argument so the caller can
    /// allocate it before the tree is modified.
    pub(crate) fn split(&mut self, mut sibling: Node<K>) -> Result<Split<K>> {
        if self.keys.is_empty() {
            return Err(Error::corrupted("split of a node without keys"));
        }
        self.check_fanout("split")?;

        let mid = self.keys.len() / 2;
        sibling.leaf = self.leaf;
        sibling.keys.extend(self.keys.drain(mid + 1..));
        if !self.leaf {
            sibling.children.extend(self.children.drain(mid + 1..));
        }
        let Some(median) = self.keys.pop() else {
            return Err(Error::corrupted("split lost its median key"));
        };
        Ok((median, sibling))
    }

    // ========================================================================
    // Borrow and merge (called on the parent)
    // ========================================================================

    /// Rotate the last key of `children[idx - 1]` up into the separator and
    /// the old separator down to the front of `children[idx]`.
    fn borrow_from_left(&mut self, idx: usize) -> Result<()> {
        if idx == 0 || idx >= self.children.len() || idx > self.keys.len() {
            return Err(Error::corrupted(format!(
                "borrow from left: child {} has no left sibling",
                idx
            )));
        }
        let (left_part, right_part) = self.children.split_at_mut(idx);
        let left = &mut left_part[idx - 1];
        let child = &mut right_part[0];
        if left.leaf != child.leaf || left.keys.is_empty() {
            return Err(Error::corrupted("borrow from left: sibling cannot donate"));
        }
        left.check_fanout("borrow from left")?;

        let Some(up) = left.keys.pop() else {
            return Err(Error::corrupted("borrow from left: sibling emptied"));
        };
        let down = mem::replace(&mut self.keys[idx - 1], up);
        child.keys.insert(0, down);
        if !child.leaf {
            let Some(grandchild) = left.children.pop() else {
                return Err(Error::corrupted("borrow from left: sibling lost a child"));
            };
            child.children.insert(0, grandchild);
        }
        Ok(())
    }

    /// Rotate the first key of `children[idx + 1]` up into the separator and
    /// the old separator down to the end of `children[idx]`.
    fn borrow_from_right(&mut self, idx: usize) -> Result<()> {
        if idx + 1 >= self.children.len() || idx >= self.keys.len() {
            return Err(Error::corrupted(format!(
                "borrow from right: child {} has no right sibling",
                idx
            )));
        }
        let (left_part, right_part) = self.children.split_at_mut(idx + 1);
        let child = &mut left_part[idx];
        let right = &mut right_part[0];
        if right.leaf != child.leaf || right.keys.is_empty() {
            return Err(Error::corrupted("borrow from right: sibling cannot donate"));
        }
        right.check_fanout("borrow from right")?;

        let up = right.keys.remove(0);
        let down = mem::replace(&mut self.keys[idx], up);
        child.keys.push(down);
        if !child.leaf {
            child.children.push(right.children.remove(0));
        }
        Ok(())
    }

    /// Fold `keys[idx]` and all of `children[idx + 1]` into `children[idx]`.
    ///
    /// The absorbed right sibling is dropped.
    fn merge_children(&mut self, idx: usize, max_keys: usize) -> Result<()> {
        if idx + 1 >= self.children.len() || idx >= self.keys.len() {
            return Err(Error::corrupted(format!(
                "merge: child {} has no right sibling",
                idx
            )));
        }
        let left = &self.children[idx];
        let right = &self.children[idx + 1];
        if left.leaf != right.leaf {
            return Err(Error::corrupted("merge: siblings at different depths"));
        }
        let merged = left.len() + 1 + right.len();
        if merged > max_keys {
            return Err(Error::corrupted(format!(
                "merge: {} keys exceed node capacity {}",
                merged, max_keys
            )));
        }
        left.check_fanout("merge")?;
        right.check_fanout("merge")?;

        let mut right = self.children.remove(idx + 1);
        let separator = self.keys.remove(idx);
        let left = &mut self.children[idx];
        left.keys.push(separator);
        left.keys.append(&mut right.keys);
        left.children.append(&mut right.children);
        Ok(())
    }

    /// Restore minimum occupancy of `children[idx]` after a removal below it.
    ///
    /// Preference order: borrow from left, borrow from right, merge with
    /// right, merge with left.
    pub(crate) fn rebalance_child(
        &mut self,
        idx: usize,
        config: IndexConfig,
        stats: &mut RebalanceStats,
    ) -> Result<()> {
        let min = config.min_keys();
        let Some(child) = self.children.get(idx) else {
            return Err(Error::corrupted(format!("rebalance: no child at {}", idx)));
        };
        if child.len() >= min {
            return Ok(());
        }

        let left_len = idx
            .checked_sub(1)
            .and_then(|i| self.children.get(i))
            .map(Node::len);
        let right_len = self.children.get(idx + 1).map(Node::len);

        match (left_len, right_len) {
            (Some(n), _) if n > min => {
                self.borrow_from_left(idx)?;
                stats.borrows_left += 1;
                trace!(child = idx, "borrowed key from left sibling");
            }
            (_, Some(n)) if n > min => {
                self.borrow_from_right(idx)?;
                stats.borrows_right += 1;
                trace!(child = idx, "borrowed key from right sibling");
            }
            (_, Some(_)) => {
                self.merge_children(idx, config.max_keys())?;
                stats.merges += 1;
                trace!(child = idx, "merged with right sibling");
            }
            (Some(_), None) => {
                self.merge_children(idx - 1, config.max_keys())?;
                stats.merges += 1;
                trace!(child = idx, "merged with left sibling");
            }
            (None, None) => {
                return Err(Error::corrupted(format!(
                    "rebalance: under-full child {} has no sibling",
                    idx
                )));
            }
        }
        Ok(())
    }
}

impl<K: Ord> Node<K> {
    /// Binary search for `key`.
    ///
    /// `Ok(i)` if `keys[i] == key`; otherwise `Err(i)` with `i` the first
    /// position whose key is greater, which is also the child to descend into.
    #[inline]
    pub(crate) fn find_key(&self, key: &K) -> std::result::Result<usize, usize> {
        self.keys.binary_search(key)
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert `key` into this subtree.
    ///
    /// Returns the split of this node if it overflowed. Siblings come from
    /// `pool`, which the caller sized for every split this insert causes.
    pub(crate) fn insert(
        &mut self,
        key: K,
        config: IndexConfig,
        pool: &mut NodePool<K>,
        stats: &mut RebalanceStats,
    ) -> Result<Option<Split<K>>> {
        let idx = match self.find_key(&key) {
            Ok(_) => return Err(Error::corrupted("insert reached an existing key")),
            Err(idx) => idx,
        };

        if self.leaf {
            self.keys.insert(idx, key);
        } else {
            let Some(child) = self.children.get_mut(idx) else {
                return Err(Error::corrupted(format!("insert: no child at {}", idx)));
            };
            if let Some((separator, sibling)) = child.insert(key, config, pool, stats)? {
                self.keys.insert(idx, separator);
                self.children.insert(idx + 1, sibling);
            }
        }

        if self.len() <= config.max_keys() {
            return Ok(None);
        }
        let split = self.split(pool.take()?)?;
        stats.splits += 1;
        trace!(
            leaf = self.leaf,
            left = self.len(),
            right = split.1.len(),
            "split overflowing node"
        );
        Ok(Some(split))
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove `key` from this subtree, returning it if it was present.
    ///
    /// Children of this node are rebalanced before returning; this node
    /// itself may be left under-full for its parent to repair.
    pub(crate) fn remove(
        &mut self,
        key: &K,
        config: IndexConfig,
        stats: &mut RebalanceStats,
    ) -> Result<Option<K>> {
        match self.find_key(key) {
            Ok(idx) if self.leaf => Ok(Some(self.keys.remove(idx))),
            Ok(idx) => self.remove_separator(idx, config, stats).map(Some),
            Err(_) if self.leaf => Ok(None),
            Err(idx) => {
                let Some(child) = self.children.get_mut(idx) else {
                    return Err(Error::corrupted(format!("remove: no child at {}", idx)));
                };
                let removed = child.remove(key, config, stats)?;
                if removed.is_some() {
                    self.rebalance_child(idx, config, stats)?;
                }
                Ok(removed)
            }
        }
    }

    /// Remove internal key `keys[idx]`, replacing it with its predecessor or
    /// successor.
    ///
    /// The successor is used only when the predecessor's leaf is at minimum
    /// occupancy and the successor's leaf is not.
    fn remove_separator(
        &mut self,
        idx: usize,
        config: IndexConfig,
        stats: &mut RebalanceStats,
    ) -> Result<K> {
        let min = config.min_keys();
        let (Some(left), Some(right)) = (self.children.get(idx), self.children.get(idx + 1))
        else {
            return Err(Error::corrupted(format!(
                "remove: separator {} is missing a child",
                idx
            )));
        };
        let use_successor = left.rightmost_leaf_len() <= min && right.leftmost_leaf_len() > min;

        if use_successor {
            let successor = self.children[idx + 1].remove_min(config, stats)?;
            let removed = mem::replace(&mut self.keys[idx], successor);
            self.rebalance_child(idx + 1, config, stats)?;
            Ok(removed)
        } else {
            let predecessor = self.children[idx].remove_max(config, stats)?;
            let removed = mem::replace(&mut self.keys[idx], predecessor);
            self.rebalance_child(idx, config, stats)?;
            Ok(removed)
        }
    }

    fn remove_max(&mut self, config: IndexConfig, stats: &mut RebalanceStats) -> Result<K> {
        if self.leaf {
            return self
                .keys
                .pop()
                .ok_or_else(|| Error::corrupted("empty leaf on predecessor path"));
        }
        let Some(last) = self.children.len().checked_sub(1) else {
            return Err(Error::corrupted("internal node without children"));
        };
        let key = self.children[last].remove_max(config, stats)?;
        self.rebalance_child(last, config, stats)?;
        Ok(key)
    }

    fn remove_min(&mut self, config: IndexConfig, stats: &mut RebalanceStats) -> Result<K> {
        if self.leaf {
            if self.keys.is_empty() {
                return Err(Error::corrupted("empty leaf on successor path"));
            }
            return Ok(self.keys.remove(0));
        }
        if self.children.is_empty() {
            return Err(Error::corrupted("internal node without children"));
        }
        let key = self.children[0].remove_min(config, stats)?;
        self.rebalance_child(0, config, stats)?;
        Ok(key)
    }
}

#[cfg(test)]
impl<K> Node<K> {
    pub(crate) fn leaf_with(keys: Vec<K>) -> Self {
        Self {
            keys,
            children: Vec::new(),
            leaf: true,
        }
    }

    pub(crate) fn internal_with(keys: Vec<K>, children: Vec<Node<K>>) -> Self {
        Self {
            keys,
            children,
            leaf: false,
        }
    }
}
