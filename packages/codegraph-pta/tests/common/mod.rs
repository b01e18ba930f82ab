//! Common test utilities for codegraph-pta
//!
//! This module provides shared program fixtures and alias assertions
//! for the integration tests.

#![allow(dead_code)]

mod assertions;
mod fixtures;

// Re-export all utilities
pub use assertions::*;
pub use fixtures::*;
