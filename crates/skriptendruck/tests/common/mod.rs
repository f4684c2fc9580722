//! Shared test utilities for skriptendruck integration tests.
//!
//! This module provides:
//! - `TestHarness` for running batches against an isolated base directory
//! - `PdfBuilder` for generating PDF fixtures programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
