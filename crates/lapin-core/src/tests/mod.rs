//! Engine-level tests.
//!
//! - `helpers.rs`: harness setup and record fixtures
//! - `integration.rs`: end-to-end flows through the engine operations
//! - `concurrency.rs`: many threads mutating shared records
//! - `failures.rs`: store conflicts and lock-set retries
//! - `properties.rs`: invariants over random attack sequences

mod helpers;

pub use helpers::*;
