//! Shared test utilities for vid2pdf integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp input/output directories
//! - Fake stage collaborators and a `ConfigBuilder`

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
