//! Rebalance statistics tracking.

use std::fmt;

/// Counters of the structural changes made by an index.
///
/// Every mutation of the index goes through `&mut self`, so the counters are
/// plain integers.
///
/// # Example
/// ```
/// use btree_index::BTreeIndex;
///
/// let mut index = BTreeIndex::with_order(3).unwrap();
/// for key in 0..3 {
///     index.insert(key).unwrap();
/// }
/// let stats = index.stats();
/// assert_eq!(stats.root_splits, 1);
/// println!("{}", stats);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebalanceStats {
    /// Nodes split because they overflowed (root splits included).
    pub splits: u64,

    /// Splits of the root, each of which added a level to the tree.
    pub root_splits: u64,

    /// Keys rotated in from a left sibling.
    pub borrows_left: u64,

    /// Keys rotated in from a right sibling.
    pub borrows_right: u64,

    /// Sibling pairs merged into one node.
    pub merges: u64,

    /// Empty roots replaced by their only child, each removing a level.
    pub root_collapses: u64,
}

impl RebalanceStats {
    /// Borrows plus merges: every repair of an under-full node.
    pub fn rebalances(&self) -> u64 {
        self.borrows_left + self.borrows_right + self.merges
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for RebalanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ splits: {} (root: {}), borrows: {} left / {} right, merges: {}, root collapses: {} }}",
            self.splits,
            self.root_splits,
            self.borrows_left,
            self.borrows_right,
            self.merges,
            self.root_collapses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = RebalanceStats::default();
        assert_eq!(stats.splits, 0);
        assert_eq!(stats.rebalances(), 0);
    }

    #[test]
    fn test_rebalances_sum() {
        let stats = RebalanceStats {
            borrows_left: 2,
            borrows_right: 3,
            merges: 4,
            ..Default::default()
        };
        assert_eq!(stats.rebalances(), 9);
    }

    #[test]
    fn test_stats_reset() {
        let mut stats = RebalanceStats {
            splits: 100,
            merges: 7,
            ..Default::default()
        };

        stats.reset();

        assert_eq!(stats, RebalanceStats::default());
    }

    #[test]
    fn test_stats_display() {
        let stats = RebalanceStats {
            splits: 12,
            root_splits: 2,
            borrows_left: 1,
            borrows_right: 4,
            merges: 5,
            root_collapses: 1,
        };
        let display = format!("{}", stats);

        assert!(display.contains("splits: 12 (root: 2)"));
        assert!(display.contains("1 left / 4 right"));
        assert!(display.contains("merges: 5"));
    }
}
