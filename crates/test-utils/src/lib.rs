//! Shared test utilities for the crime-grid workspace.
//!
//! Provides CSV fixture builders and scratch-file helpers used by the
//! mapping, ingestion, and service tests.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;

pub use fixtures::*;
