//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Test fixtures and factories
//! - An in-memory backend mock
//! - A wiremock-backed HTTP harness

pub mod factories;
pub mod test_backend;

pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
pub use test_backend::*;
