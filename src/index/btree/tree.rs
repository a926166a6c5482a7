//! The B-tree index.
//!
//! The [`BTreeIndex`] provides:
//! - Membership search
//! - Insertion with node splitting
//! - Deletion with borrow/merge rebalancing
//! - Ordered traversal

use std::fmt;
use std::mem;

use tracing::debug;

use crate::common::{Error, IndexConfig, Result};
use crate::index::btree::iter::Iter;
use crate::index::btree::node::Node;
use crate::index::btree::pool::{NodePool, SplitPlan};
use crate::index::btree::stats::RebalanceStats;

/// Result of [`BTreeIndex::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was added.
    Inserted,
    /// The key was already present; the index is unchanged.
    AlreadyPresent,
}

impl InsertOutcome {
    /// True if the key was new.
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}

/// Result of [`BTreeIndex::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The key was present and has been removed.
    Found,
    /// The key was absent; the index is unchanged.
    NotFound,
}

impl DeleteOutcome {
    /// True if a key was removed.
    pub fn is_found(&self) -> bool {
        matches!(self, DeleteOutcome::Found)
    }
}

/// An in-memory B-tree of unique keys.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                        BTreeIndex<K>                          │
/// │  config: IndexConfig (B)      len / height / stats            │
/// │                                                               │
/// │                     root: Node<K>                             │
/// │                   [ 10 ]                                      │
/// │                  /      \                                     │
/// │           [ 5 | 7 ]    [ 17 | 20 ]       children owned by    │
/// │           /   |   \     /   |   \        value in the parent  │
/// │        leaves (all at the same depth)                         │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// Every non-root node holds between `ceil(B/2) - 1` and `B - 1` keys. The
/// index has no internal locking; wrap it in a
/// [`SharedIndex`](crate::SharedIndex) to share it between threads.
///
/// # Usage
/// ```
/// use btree_index::{BTreeIndex, DeleteOutcome};
///
/// let mut index = BTreeIndex::new();
/// for key in [10, 20, 5, 6, 12, 30, 7, 17] {
///     index.insert(key).unwrap();
/// }
/// assert!(index.contains(&6));
/// assert_eq!(index.delete(&6).unwrap(), DeleteOutcome::Found);
/// assert_eq!(index.delete(&6).unwrap(), DeleteOutcome::NotFound);
///
/// let keys: Vec<_> = index.iter().copied().collect();
/// assert_eq!(keys, vec![5, 7, 10, 12, 17, 20, 30]);
/// ```
#[derive(Debug)]
pub struct BTreeIndex<K> {
    pub(super) root: Node<K>,
    pub(super) config: IndexConfig,
    pub(super) len: usize,
    pub(super) height: usize,
    pub(super) stats: RebalanceStats,
}

impl<K> BTreeIndex<K> {
    /// Create an empty index with the default branching factor.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Create an empty index with branching factor `order`.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `order` is below [`MIN_ORDER`](crate::MIN_ORDER)
    pub fn with_order(order: usize) -> Result<Self> {
        Ok(Self::with_config(IndexConfig::new(order)?))
    }

    /// Create an empty index from a validated config.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            root: Node::empty_leaf(),
            config,
            len: 0,
            height: 1,
            stats: RebalanceStats::default(),
        }
    }

    /// Number of keys in the index.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the root. An empty index has height 1.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Branching factor (B).
    #[inline]
    pub fn order(&self) -> usize {
        self.config.order()
    }

    pub fn config(&self) -> IndexConfig {
        self.config
    }

    /// Structural changes made since creation (or the last reset).
    pub fn stats(&self) -> RebalanceStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Smallest key.
    pub fn first(&self) -> Option<&K> {
        self.root.first_key()
    }

    /// Largest key.
    pub fn last(&self) -> Option<&K> {
        self.root.last_key()
    }

    /// Ascending iterator over all keys.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(&self.root, self.len)
    }

    /// Ascending iterator over all keys (same as [`iter`](Self::iter)).
    pub fn in_order(&self) -> Iter<'_, K> {
        self.iter()
    }

    /// Keys of every node, grouped by depth, root first.
    ///
    /// # Example
    /// ```
    /// use btree_index::BTreeIndex;
    ///
    /// let mut index = BTreeIndex::with_order(3).unwrap();
    /// for key in 1..=3 {
    ///     index.insert(key).unwrap();
    /// }
    /// let levels = index.level_order();
    /// assert_eq!(levels[0], vec![&[2][..]]);
    /// assert_eq!(levels[1], vec![&[1][..], &[3][..]]);
    /// ```
    pub fn level_order(&self) -> Vec<Vec<&[K]>> {
        let mut levels = Vec::with_capacity(self.height);
        let mut current = vec![&self.root];
        while !current.is_empty() {
            levels.push(current.iter().map(|node| node.keys.as_slice()).collect());
            current = current
                .iter()
                .flat_map(|node| node.children.iter())
                .collect();
        }
        levels
    }

    /// Keys reachable from the root, counted node by node.
    fn count_keys(&self) -> usize {
        self.level_order()
            .iter()
            .flatten()
            .map(|keys| keys.len())
            .sum()
    }

    /// Release every node, leaving an empty index with the same order.
    ///
    /// Statistics are kept.
    pub fn clear(&mut self) {
        debug!(keys = self.len, height = self.height, "clearing index");
        self.root = Node::empty_leaf();
        self.len = 0;
        self.height = 1;
    }
}

impl<K: Ord> BTreeIndex<K> {
    /// Check whether `key` is present.
    ///
    /// A search path that runs into a missing child is logged as corruption
    /// and reported as absent. Run [`check_invariants`](Self::check_invariants)
    /// to locate the damage.
    pub fn contains(&self, key: &K) -> bool {
        self.lookup(key).unwrap_or(false)
    }

    /// Alias of [`contains`](Self::contains).
    pub fn search(&self, key: &K) -> bool {
        self.contains(key)
    }

    /// Insert `key` if absent.
    ///
    /// Inserting a key that is already present is a no-op reported as
    /// [`InsertOutcome::AlreadyPresent`].
    ///
    /// # Errors
    /// - `Error::Allocation` if the nodes needed for splitting cannot be
    ///   allocated; the index is unchanged
    /// - `Error::CorruptedTree` if an invariant is found broken
    pub fn insert(&mut self, key: K) -> Result<InsertOutcome> {
        let Some(plan) = self.plan_insert(&key)? else {
            return Ok(InsertOutcome::AlreadyPresent);
        };

        let mut pool = self.reserve_for(plan, self.config.order())?;

        let split = self
            .root
            .insert(key, self.config, &mut pool, &mut self.stats)?;
        if let Some((separator, sibling)) = split {
            self.grow_root(separator, sibling, &mut pool)?;
        }
        debug_assert_eq!(pool.len(), 0, "split plan overcounted");

        self.len += 1;
        Ok(InsertOutcome::Inserted)
    }

    /// Insert every key of `keys`, returning how many were new.
    pub fn insert_all<I>(&mut self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = K>,
    {
        let mut inserted = 0;
        for key in keys {
            if self.insert(key)?.is_inserted() {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Remove `key` if present.
    ///
    /// # Errors
    /// - `Error::CorruptedTree` if an invariant is found broken
    pub fn delete(&mut self, key: &K) -> Result<DeleteOutcome> {
        Ok(match self.take(key)? {
            Some(_) => DeleteOutcome::Found,
            None => DeleteOutcome::NotFound,
        })
    }

    /// Remove `key` if present and hand back the stored key.
    ///
    /// # Errors
    /// - `Error::CorruptedTree` if an invariant is found broken. The key may
    ///   already have left its leaf; the stored length is recounted so that
    ///   it still matches the keys reachable from the root.
    pub fn take(&mut self, key: &K) -> Result<Option<K>> {
        let removed = match self.root.remove(key, self.config, &mut self.stats) {
            Ok(removed) => removed,
            Err(err) => {
                self.len = self.count_keys();
                return Err(err);
            }
        };
        if removed.is_some() {
            self.len -= 1;
            self.collapse_root()?;
        }
        Ok(removed)
    }

    /// Descend towards `key`.
    ///
    /// # Errors
    /// - `Error::CorruptedTree` if an internal node lacks the child to follow
    fn lookup(&self, key: &K) -> Result<bool> {
        let mut node = &self.root;
        loop {
            let idx = match node.find_key(key) {
                Ok(_) => return Ok(true),
                Err(_) if node.is_leaf() => return Ok(false),
                Err(idx) => idx,
            };
            node = node
                .children
                .get(idx)
                .ok_or_else(|| Error::corrupted(format!("search path: no child at {}", idx)))?;
        }
    }

    /// Walk the insert path without modifying anything.
    ///
    /// Returns `None` if `key` is already present. Otherwise counts the run
    /// of full nodes ending at the target leaf: each of them will split.
    fn plan_insert(&self, key: &K) -> Result<Option<SplitPlan>> {
        let max = self.config.max_keys();
        let mut node = &self.root;
        let mut depth = 0;
        let mut full_run = 0;

        loop {
            let idx = match node.find_key(key) {
                Ok(_) => return Ok(None),
                Err(idx) => idx,
            };
            depth += 1;
            if node.len() >= max {
                full_run += 1;
            } else {
                full_run = 0;
            }
            if node.is_leaf() {
                break;
            }
            node = node.children.get(idx).ok_or_else(|| {
                Error::corrupted(format!("insert path: no child at {} (depth {})", idx, depth))
            })?;
        }

        Ok(Some(SplitPlan {
            splits: full_run,
            grows_root: full_run == depth,
        }))
    }

    /// Allocate every node an insert following `plan` needs.
    ///
    /// Only capacity changes here; keys and links are left alone, so a
    /// failure leaves the tree as it was.
    fn reserve_for(&mut self, plan: SplitPlan, order: usize) -> Result<NodePool<K>> {
        let pool = NodePool::prepare(plan, order)?;
        self.root.reserve(order)?;
        Ok(pool)
    }

    /// Put a new root above the split halves of the old one.
    fn grow_root(&mut self, separator: K, sibling: Node<K>, pool: &mut NodePool<K>) -> Result<()> {
        let mut new_root = pool.take()?;
        new_root.leaf = false;
        new_root.keys.push(separator);

        let old_root = mem::replace(&mut self.root, new_root);
        self.root.children.push(old_root);
        self.root.children.push(sibling);

        self.height += 1;
        self.stats.root_splits += 1;
        debug!(height = self.height, "root split, tree grew one level");
        Ok(())
    }

    /// Replace a keyless internal root by its only child.
    fn collapse_root(&mut self) -> Result<()> {
        if self.root.is_leaf() || !self.root.keys.is_empty() {
            return Ok(());
        }
        if self.root.children.len() != 1 {
            return Err(Error::corrupted(format!(
                "empty root has {} children",
                self.root.children.len()
            )));
        }
        let Some(child) = self.root.children.pop() else {
            return Err(Error::corrupted("empty root lost its child"));
        };
        self.root = child;

        self.height -= 1;
        self.stats.root_collapses += 1;
        debug!(height = self.height, "root collapsed, tree shrank one level");
        Ok(())
    }
}

impl<K> Default for BTreeIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K> IntoIterator for &'a BTreeIndex<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

/// One line per level: `Level 1: 5 7 | 17 20`.
impl<K: fmt::Display> fmt::Display for BTreeIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, level) in self.level_order().iter().enumerate() {
            write!(f, "Level {}:", depth)?;
            for (i, keys) in level.iter().enumerate() {
                if i > 0 {
                    write!(f, " |")?;
                }
                for key in keys.iter() {
                    write!(f, " {}", key)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> BTreeIndex<i32> {
        let mut index = BTreeIndex::new();
        for key in [10, 20, 5, 6, 12, 30, 7, 17] {
            index.insert(key).unwrap();
        }
        index
    }

    fn keys(index: &BTreeIndex<i32>) -> Vec<i32> {
        index.iter().copied().collect()
    }

    #[test]
    fn test_new_index_is_empty() {
        let index: BTreeIndex<i32> = BTreeIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.height(), 1);
        assert_eq!(index.order(), 5);
        assert!(!index.contains(&1));
        assert_eq!(index.first(), None);
        assert!(keys(&index).is_empty());
    }

    #[test]
    fn test_with_order_rejects_two() {
        assert!(matches!(
            BTreeIndex::<i32>::with_order(2),
            Err(Error::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_sample_scenario() {
        let mut index = sample_tree();
        assert_eq!(keys(&index), vec![5, 6, 7, 10, 12, 17, 20, 30]);
        assert!(index.search(&6));
        assert!(!index.search(&15));

        assert_eq!(index.delete(&6).unwrap(), DeleteOutcome::Found);
        assert_eq!(keys(&index), vec![5, 7, 10, 12, 17, 20, 30]);
        assert!(!index.search(&6));
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_sample_structure() {
        // 10, 20, 5, 6 fill the root leaf; 12 overflows it around 10.
        let index = sample_tree();
        let levels = index.level_order();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0], vec![&[10][..]]);
        assert_eq!(levels[1], vec![&[5, 6, 7][..], &[12, 17, 20, 30][..]]);
    }

    #[test]
    fn test_plan_counts_full_run() {
        let index = sample_tree();
        // Right leaf [12, 17, 20, 30] is full, root [10] is not.
        let plan = index.plan_insert(&25).unwrap().unwrap();
        assert_eq!(plan.splits, 1);
        assert!(!plan.grows_root);

        let plan = index.plan_insert(&8).unwrap().unwrap();
        assert_eq!(plan.splits, 0);

        assert_eq!(index.plan_insert(&17).unwrap(), None);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut index = sample_tree();
        let before = index.stats();

        assert_eq!(index.insert(12).unwrap(), InsertOutcome::AlreadyPresent);
        assert_eq!(index.len(), 8);
        assert_eq!(index.stats(), before);
        assert_eq!(keys(&index), vec![5, 6, 7, 10, 12, 17, 20, 30]);
    }

    #[test]
    fn test_take_returns_key() {
        let mut index = sample_tree();
        assert_eq!(index.take(&17).unwrap(), Some(17));
        assert_eq!(index.take(&17).unwrap(), None);
        assert_eq!(index.len(), 7);
    }

    #[test]
    fn test_root_collapses_after_merge() {
        let mut index = BTreeIndex::with_order(3).unwrap();
        index.insert_all([1, 2, 3]).unwrap();
        assert_eq!(index.height(), 2);

        index.delete(&1).unwrap();
        assert_eq!(index.height(), 1);
        assert_eq!(index.stats().root_collapses, 1);
        assert_eq!(keys(&index), vec![2, 3]);
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_everything() {
        let mut index = sample_tree();
        for key in [5, 6, 7, 10, 12, 17, 20, 30] {
            assert!(index.delete(&key).unwrap().is_found());
            index.check_invariants().unwrap();
        }
        assert!(index.is_empty());
        assert_eq!(index.height(), 1);
        assert_eq!(index.delete(&5).unwrap(), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_first_last() {
        let index = sample_tree();
        assert_eq!(index.first(), Some(&5));
        assert_eq!(index.last(), Some(&30));
    }

    #[test]
    fn test_clear() {
        let mut index = sample_tree();
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.height(), 1);
        assert!(!index.contains(&10));

        index.insert(3).unwrap();
        assert_eq!(keys(&index), vec![3]);
    }

    #[test]
    fn test_display_levels() {
        let index = sample_tree();
        assert_eq!(
            format!("{}", index),
            "Level 0: 10\nLevel 1: 5 6 7 | 12 17 20 30\n"
        );
    }

    #[test]
    fn test_allocation_failure_on_empty_index() {
        let mut index = BTreeIndex::<u64>::with_order(usize::MAX / 2).unwrap();

        assert!(matches!(index.insert(1), Err(Error::Allocation(_))));
        assert!(index.is_empty());
        assert_eq!(index.height(), 1);
        assert_eq!(index.in_order().count(), 0);
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_allocation_failure_before_split_leaves_tree_unchanged() {
        let mut index = sample_tree();
        let before_levels: Vec<Vec<Vec<i32>>> = index
            .level_order()
            .iter()
            .map(|level| level.iter().map(|keys| keys.to_vec()).collect())
            .collect();
        let before_stats = index.stats();

        // 25 lands in the full leaf [12, 17, 20, 30], so a sibling is needed.
        let plan = index.plan_insert(&25).unwrap().unwrap();
        assert_eq!(plan.splits, 1);
        assert!(matches!(
            index.reserve_for(plan, usize::MAX / 2),
            Err(Error::Allocation(_))
        ));

        let after_levels: Vec<Vec<Vec<i32>>> = index
            .level_order()
            .iter()
            .map(|level| level.iter().map(|keys| keys.to_vec()).collect())
            .collect();
        assert_eq!(after_levels, before_levels);
        assert_eq!(index.stats(), before_stats);
        assert_eq!(index.len(), 8);
        index.check_invariants().unwrap();

        assert!(index.insert(25).unwrap().is_inserted());
        assert_eq!(keys(&index), vec![5, 6, 7, 10, 12, 17, 20, 25, 30]);
        index.check_invariants().unwrap();
    }

    #[test]
    fn test_allocation_failure_on_populated_index() {
        let mut index = sample_tree();
        index.config = IndexConfig::new(usize::MAX / 2).unwrap();

        assert!(matches!(index.insert(8), Err(Error::Allocation(_))));
        assert_eq!(index.len(), 8);
        assert!(!index.contains(&8));
        assert_eq!(keys(&index), vec![5, 6, 7, 10, 12, 17, 20, 30]);
    }

    #[test]
    fn test_missing_child_on_search_path() {
        let mut index: BTreeIndex<i32> = BTreeIndex::new();
        index.root = Node::internal_with(vec![10, 20], vec![Node::leaf_with(vec![1, 2])]);
        index.len = 4;
        index.height = 2;

        assert!(matches!(index.lookup(&15), Err(Error::CorruptedTree(_))));
        assert!(!index.contains(&15));
        assert!(index.lookup(&1).unwrap());
        assert!(index.contains(&10));
    }

    #[test]
    fn test_failed_delete_recounts_len() {
        // Right child of the root claims to be internal, so the merge after
        // removing 1 finds siblings at different depths.
        let mut index: BTreeIndex<i32> = BTreeIndex::new();
        index.root = Node::internal_with(
            vec![10],
            vec![Node::leaf_with(vec![1, 2]), Node::internal_with(vec![11, 12], vec![])],
        );
        index.len = 5;
        index.height = 2;

        assert!(matches!(index.delete(&1), Err(Error::CorruptedTree(_))));
        assert_eq!(index.len(), 4);
        assert_eq!(index.len(), index.count_keys());
    }

    #[test]
    fn test_into_iterator_for_ref() {
        let index = sample_tree();
        let mut count = 0;
        for _ in &index {
            count += 1;
        }
        assert_eq!(count, index.len());
    }
}
