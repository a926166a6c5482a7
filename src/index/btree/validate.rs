//! Whole-tree invariant checking.

use crate::common::{Error, IndexConfig, Result};
use crate::index::btree::node::Node;
use crate::index::btree::tree::BTreeIndex;

impl<K: Ord> BTreeIndex<K> {
    /// Walk the whole tree and verify every structural invariant.
    ///
    /// Checks key order (within each node and against the separators
    /// above it), occupancy bounds, child counts, leaf depth, the stored
    /// height and the stored length. Runs in `O(n)`.
    ///
    /// # Errors
    /// - `Error::CorruptedTree` naming the first violation found
    pub fn check_invariants(&self) -> Result<()> {
        if self.root.keys.is_empty() && !self.root.is_leaf() {
            return Err(Error::corrupted("internal root has no keys"));
        }

        let mut checker = Checker {
            config: self.config,
            leaf_depth: None,
        };
        let count = checker.visit(&self.root, true, None, None, 1)?;

        if count != self.len {
            return Err(Error::corrupted(format!(
                "stored length {} but {} keys reachable",
                self.len, count
            )));
        }
        if checker.leaf_depth != Some(self.height) {
            return Err(Error::corrupted(format!(
                "stored height {} but leaves at depth {:?}",
                self.height, checker.leaf_depth
            )));
        }
        Ok(())
    }
}

struct Checker {
    config: IndexConfig,
    /// Depth of the first leaf reached; every other leaf must match.
    leaf_depth: Option<usize>,
}

impl Checker {
    /// Check `node` and its subtree, whose keys must lie strictly between
    /// `lower` and `upper`. Returns the number of keys in the subtree.
    fn visit<K: Ord>(
        &mut self,
        node: &Node<K>,
        is_root: bool,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
    ) -> Result<usize> {
        let n = node.len();
        if n > self.config.max_keys() {
            return Err(Error::corrupted(format!(
                "node at depth {} holds {} keys, maximum is {}",
                depth,
                n,
                self.config.max_keys()
            )));
        }
        if !is_root && n < self.config.min_keys() {
            return Err(Error::corrupted(format!(
                "node at depth {} holds {} keys, minimum is {}",
                depth,
                n,
                self.config.min_keys()
            )));
        }
        if node.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::corrupted(format!(
                "keys out of order in node at depth {}",
                depth
            )));
        }
        if let (Some(lower), Some(first)) = (lower, node.keys.first()) {
            if first <= lower {
                return Err(Error::corrupted(format!(
                    "key below its separator at depth {}",
                    depth
                )));
            }
        }
        if let (Some(upper), Some(last)) = (upper, node.keys.last()) {
            if last >= upper {
                return Err(Error::corrupted(format!(
                    "key above its separator at depth {}",
                    depth
                )));
            }
        }

        if node.is_leaf() {
            if !node.children.is_empty() {
                return Err(Error::corrupted(format!(
                    "leaf at depth {} has {} children",
                    depth,
                    node.children.len()
                )));
            }
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(Error::corrupted(format!(
                        "leaf at depth {}, expected {}",
                        depth, expected
                    )));
                }
                Some(_) => {}
            }
            return Ok(n);
        }

        if node.children.len() != n + 1 {
            return Err(Error::corrupted(format!(
                "internal node at depth {} has {} keys but {} children",
                depth,
                n,
                node.children.len()
            )));
        }

        let mut count = n;
        for (i, child) in node.children.iter().enumerate() {
            let child_lower = if i == 0 { lower } else { node.keys.get(i - 1) };
            let child_upper = if i == n { upper } else { node.keys.get(i) };
            count += self.visit(child, false, child_lower, child_upper, depth + 1)?;
        }
        Ok(count)
    }
}
