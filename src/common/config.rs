//! Configuration for the index.

use crate::common::{Error, Result};

/// Branching factor used by [`BTreeIndex::new`](crate::BTreeIndex::new).
///
/// Five children per node gives at most 4 keys and at least 2 keys in every
/// non-root node.
pub const DEFAULT_ORDER: usize = 5;

/// Smallest branching factor that still forms a B-tree.
///
/// With 2 children a node would hold a single key and a split would leave an
/// empty half.
pub const MIN_ORDER: usize = 3;

/// Per-instance settings, fixed for the lifetime of an index.
///
/// # Example
/// ```
/// use btree_index::IndexConfig;
///
/// let config = IndexConfig::new(5).unwrap();
/// assert_eq!(config.max_keys(), 4);
/// assert_eq!(config.min_keys(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    order: usize,
}

impl IndexConfig {
    /// Create a config with branching factor `order`.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `order` is below [`MIN_ORDER`]
    pub fn new(order: usize) -> Result<Self> {
        if order < MIN_ORDER {
            return Err(Error::InvalidOrder {
                order,
                min: MIN_ORDER,
            });
        }
        Ok(Self { order })
    }

    /// Maximum number of children per node (B).
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Maximum number of keys per node (B - 1).
    #[inline]
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum number of keys per non-root node (ceil(B / 2) - 1).
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
        }
    }
}
