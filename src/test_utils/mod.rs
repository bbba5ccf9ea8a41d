//! Test utilities.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations and a scriptable payment provider
//! - `TestAppStateBuilder` for HTTP route tests

mod app_state_builder;
mod billing_mocks;
mod factories;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use factories::*;
