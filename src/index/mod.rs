//! Index structures.
//!
//! - [`btree`] - Single-threaded in-memory B-tree
//! - [`SharedIndex`] - Readers-writer wrapper for sharing a tree between threads

pub mod btree;
mod shared;

pub use btree::{BTreeIndex, DeleteOutcome, InsertOutcome, Iter, RebalanceStats};
pub use shared::SharedIndex;
