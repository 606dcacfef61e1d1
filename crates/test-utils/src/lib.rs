//! Shared test utilities for the wildfire map workspace.
//!
//! This crate provides common testing infrastructure including:
//! - FIRMS CSV fixtures (well-formed, malformed, VIIRS flavoured)
//! - Fire event and viewport generators
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, make_event};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
