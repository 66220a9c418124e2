//! Named timeouts and poll periods.
//!
//! Every wait in the harness picks one of these classes instead of an ad-hoc
//! duration.

use std::time::Duration;

/// Checks that are expected to settle almost immediately, or negative checks
/// that only need to observe a short window.
pub const QUICK_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Short timeout for lightweight Control Plane / cluster round-trips.
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Default timeout for most convergence checks (backups, restores, syncs).
pub const STANDARD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Long timeout for deployment creation and health.
pub const LONG_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Very long timeout for load tests, scaling and Portworx restarts.
pub const VERY_LONG_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Poll period for quick checks.
pub const QUICK_POLL_PERIOD: Duration = Duration::from_secs(2);

/// Default poll period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(10);

/// Scale a timeout for multi-node deployments.
///
/// Single-node deployments use the base timeout; every additional node adds
/// half of the base again, since pods of a StatefulSet start one after another.
pub fn for_node_count(base: Duration, node_count: i32) -> Duration {
    let extra_nodes = u32::try_from(node_count.saturating_sub(1)).unwrap_or(0);
    base + (base / 2) * extra_nodes
}
