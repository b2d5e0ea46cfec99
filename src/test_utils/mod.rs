//! Test utilities.
//!
//! This module provides:
//! - Test data factories for creating valid fixtures
//! - In-memory implementations of the repository ports
//! - An in-memory metrics cache and a scriptable `SyncService`
//! - `TestAppStateBuilder` for HTTP tests

mod app_state_builder;
mod factories;
mod ledger_mocks;
mod service_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use ledger_mocks::*;
pub use service_mocks::*;
