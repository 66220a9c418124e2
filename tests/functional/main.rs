// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Functional tests against fake Control Plane, Kubernetes, OIDC and
//! Prometheus servers.
//!
//! The fakes are small `axum` apps. HTTP fakes are bound to an ephemeral local
//! port; the Kubernetes fake is handed to `kube::Client` as a tower service.
//! Either way the real clients run end to end without any cluster
//! infrastructure.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run one test
//! cargo test --test functional test_tls_policy_violation_is_verbatim
//! ```

mod fakes;

mod auth_tests;
mod controlplane_tests;
mod job_tests;
mod metrics_tests;

pub use fakes::*;
