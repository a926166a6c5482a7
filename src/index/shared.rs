//! Thread-safe handle around a [`BTreeIndex`].
//!
//! The tree itself has no internal synchronization. `SharedIndex` serializes
//! all mutations behind the write half of a readers-writer lock and lets
//! lookups run concurrently while no mutation is in flight.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::Result;
use crate::index::btree::{BTreeIndex, DeleteOutcome, InsertOutcome, RebalanceStats};

/// A cloneable, lock-protected handle to one index.
///
/// # Thread Safety
/// - `contains`, `len`, `keys`, `read`: shared lock, run concurrently
/// - `insert`, `delete`, `write`: exclusive lock, one at a time
///
/// # Example
/// ```
/// use btree_index::SharedIndex;
/// use std::thread;
///
/// let index = SharedIndex::new();
/// let writer = index.clone();
/// thread::spawn(move || writer.insert(7).unwrap()).join().unwrap();
/// assert!(index.contains(&7));
/// ```
#[derive(Debug)]
pub struct SharedIndex<K> {
    inner: Arc<RwLock<BTreeIndex<K>>>,
}

impl<K> SharedIndex<K> {
    /// Create a handle to a new empty index with the default order.
    pub fn new() -> Self {
        Self::from_index(BTreeIndex::new())
    }

    /// Wrap an existing index.
    pub fn from_index(index: BTreeIndex<K>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Number of keys in the index.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True if the index holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Snapshot of the rebalance counters.
    pub fn stats(&self) -> RebalanceStats {
        self.inner.read().stats()
    }

    /// Run `f` under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&BTreeIndex<K>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the exclusive lock, e.g. to apply several mutations
    /// atomically.
    pub fn write<R>(&self, f: impl FnOnce(&mut BTreeIndex<K>) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Recover the index if this is the last handle.
    pub fn into_inner(self) -> Option<BTreeIndex<K>> {
        Arc::try_unwrap(self.inner).ok().map(RwLock::into_inner)
    }
}

impl<K: Ord> SharedIndex<K> {
    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().contains(key)
    }

    pub fn insert(&self, key: K) -> Result<InsertOutcome> {
        self.inner.write().insert(key)
    }

    pub fn delete(&self, key: &K) -> Result<DeleteOutcome> {
        self.inner.write().delete(key)
    }

    pub fn check_invariants(&self) -> Result<()> {
        self.inner.read().check_invariants()
    }
}

impl<K: Clone> SharedIndex<K> {
    /// Snapshot of all keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().iter().cloned().collect()
    }
}

impl<K> Clone for SharedIndex<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for SharedIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> From<BTreeIndex<K>> for SharedIndex<K> {
    fn from(index: BTreeIndex<K>) -> Self {
        Self::from_index(index)
    }
}
