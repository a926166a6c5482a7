//! Common types and utilities shared across the crate.
//!
//! This module contains:
//! - Configuration constants and [`IndexConfig`]
//! - Error types

pub mod config;
pub mod error;

pub use config::{IndexConfig, DEFAULT_ORDER, MIN_ORDER};
pub use error::{Error, Result};
