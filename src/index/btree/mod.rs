//! B-tree index implementation.
//!
//! # Components
//! - [`BTreeIndex`] - The tree and its public operations
//! - [`Iter`] - Lazy in-order traversal
//! - [`RebalanceStats`] - Split/borrow/merge counters
//!
//! Node layout, the split/borrow/merge primitives and the per-insert node
//! pool are internal.

mod iter;
mod node;
mod pool;
mod stats;
mod tree;
mod validate;

pub use iter::Iter;
pub use stats::RebalanceStats;
pub use tree::{BTreeIndex, DeleteOutcome, InsertOutcome};
