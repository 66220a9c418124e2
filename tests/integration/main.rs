// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Live cross-cluster scenarios for pds-integration.
//!
//! These tests need a reachable Control Plane and a target cluster registered
//! with it, configured through the `PDS_*` environment variables. They are
//! marked `#[ignore]` and must be run explicitly:
//!
//! ```bash
//! # Run every scenario (parallel execution supported)
//! cargo test --test integration -- --ignored
//!
//! # Run one scenario
//! cargo test --test integration test_postgres_deploy_and_load -- --ignored
//! ```
//!
//! The suite is set up by the first scenario to start and torn down when the
//! last running scenario finishes: templates and the test namespace are
//! shared, every scenario creates and cleans up its own deployments. Anything
//! a crashed run leaves behind is removed by `pds-janitor`.


mod metrics_tests;
mod namespace_tests;
mod tls_tests;

pub use suite::*;
