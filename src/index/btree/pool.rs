//! Spare nodes for a single insert.
//!
//! An insert first works out how many nodes it will split, then allocates
//! all the siblings (and a new root, if the root splits) up front. Once the
//! pool is filled the insert cannot fail for lack of memory, so an
//! allocation failure always leaves the tree untouched.

use crate::common::{Error, Result};
use crate::index::btree::node::Node;

/// How many nodes an insert will split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct SplitPlan {
    /// Full nodes on the path, counted upward from the target leaf.
    pub(crate) splits: usize,

    /// The run of full nodes reaches the root, so a new root is needed.
    pub(crate) grows_root: bool,
}

impl SplitPlan {
    /// Total number of nodes to allocate.
    pub(crate) fn nodes_needed(&self) -> usize {
        self.splits + usize::from(self.grows_root)
    }
}

/// Stack of preallocated nodes (LIFO: the leaf sibling is handed out first).
#[derive(Debug)]
pub(crate) struct NodePool<K> {
    free: Vec<Node<K>>,
}

impl<K> NodePool<K> {
    /// Allocate every node `plan` calls for.
    ///
    /// Splits happen bottom-up, so the first node taken is the leaf sibling,
    /// then internal siblings, then the new root.
    ///
    /// # Errors
    /// - `Error::Allocation` if any node cannot be reserved
    pub(crate) fn prepare(plan: SplitPlan, order: usize) -> Result<Self> {
        let mut free = Vec::new();
        free.try_reserve_exact(plan.nodes_needed())?;

        let leaf_siblings = usize::from(plan.splits > 0);
        for _ in leaf_siblings..plan.nodes_needed() {
            free.push(Node::try_new(false, order)?);
        }
        if leaf_siblings > 0 {
            free.push(Node::try_new(true, order)?);
        }
        Ok(Self { free })
    }

    /// Hand out the next spare node.
    ///
    /// # Errors
    /// - `Error::CorruptedTree` if the plan undercounted the splits
    pub(crate) fn take(&mut self) -> Result<Node<K>> {
        self.free
            .pop()
            .ok_or_else(|| Error::corrupted("node pool exhausted: split plan undercounted"))
    }

    /// Number of spare nodes left.
    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }
}
