//! btree-index - An in-memory B-tree index of unique ordered keys.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          btree-index                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          SharedIndex (index/shared)  [optional]          │   │
//! │  │        Arc<RwLock<..>>: many readers, one writer         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                BTreeIndex (index/btree)                  │   │
//! │  │   search · insert + split · delete + borrow/merge        │   │
//! │  │   Iter (in-order) · check_invariants · RebalanceStats    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                    Common (common/)                      │   │
//! │  │          IndexConfig (branching factor) · Error          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (config, Error)
//! - [`index`] - The B-tree and its thread-safe wrapper
//!
//! # Quick Start
//! ```
//! use btree_index::BTreeIndex;
//!
//! let mut index = BTreeIndex::with_order(5).unwrap();
//! for key in [10, 20, 5, 6, 12, 30, 7, 17] {
//!     index.insert(key).unwrap();
//! }
//!
//! assert!(index.contains(&6));
//! assert!(!index.contains(&15));
//! assert_eq!(
//!     index.in_order().copied().collect::<Vec<_>>(),
//!     vec![5, 6, 7, 10, 12, 17, 20, 30]
//! );
//! ```

pub mod common;
pub mod index;

// Re-export commonly used items at crate root for convenience
pub use common::{Error, IndexConfig, Result, DEFAULT_ORDER, MIN_ORDER};
pub use index::{
    BTreeIndex, DeleteOutcome, InsertOutcome, Iter, RebalanceStats, SharedIndex,
};
