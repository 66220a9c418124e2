//! Tracing subscriber setup.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_TEST_FILTER: &str = "info,kube=warn,hyper=warn,reqwest=warn,pds_integration=debug";

static TRACING: OnceLock<()> = OnceLock::new();

/// Install the test subscriber once per process.
///
/// Output goes through libtest's capture, so only failing tests print their
/// logs. `RUST_LOG` overrides [`DEFAULT_TEST_FILTER`].
pub fn init_test_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .try_init();
    });
}

/// Install the JSON subscriber used by command-line tools.
pub fn init_json_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .try_init();
}
