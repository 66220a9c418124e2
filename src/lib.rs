//! pds-integration library crate
//!
//! Cross-cluster integration harness for the PDS Control Plane. Tests drive
//! the Control Plane REST API and verify the effects on a target Kubernetes
//! cluster, and the other way around.
//!
//! - [`controlplane`]: typed Control Plane client
//! - [`cluster`]: target-cluster operations
//! - [`crosscluster`]: checks that span both planes
//! - [`sink`] and [`wait`]: test-failure reporting and eventual-consistency polling
//! - [`setup`]: suite initialization and per-test fixtures

pub mod cluster;
pub mod config;
pub mod controlplane;
pub mod crd;
pub mod crosscluster;
pub mod dataservice;
pub mod error;
pub mod loadtest;
pub mod logging;
pub mod metrics;
pub mod names;
pub mod resolver;
pub mod setup;
pub mod sink;
pub mod timing;
pub mod wait;

pub use config::Config;
pub use controlplane::ControlPlane;
pub use crosscluster::CrossCluster;
pub use dataservice::DataService;
pub use error::{Error, Result};
pub use resolver::ShortDeploymentSpec;
pub use setup::{Initializer, OwnedResources, SharedSuite, Suite};
pub use sink::{Sink, SinkExt, TestCase};
pub use wait::eventually;
