//! Typed custom resources read and written on the target cluster.
//!
//! - `Backup`, `BackupJob`, `Restore`: `backups.pds.io/v1`, owned by the PDS
//!   backup operator
//! - `DNSEndpoint`: `externaldns.k8s.io/v1alpha1`, published for externally
//!   reachable data services

mod backup;
mod dns_endpoint;
mod restore;

pub use backup::*;
pub use dns_endpoint::*;
pub use restore::*;

/// API group of the PDS backup resources.
pub const BACKUPS_GROUP: &str = "backups.pds.io";
