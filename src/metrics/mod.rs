//! Metrics verifier.
//!
//! Checks that Prometheus has samples for every expected metric of a
//! deployment. Selectors are scoped to the deployment with
//! `pds_deployment_id` at query time.

pub mod expected;
pub mod prometheus;
pub mod promql;

pub use expected::expected_metrics;
pub use prometheus::{PrometheusClient, Sample};
pub use promql::{MatchOp, Matcher, Selector};

use jiff::Timestamp;

use crate::dataservice::DataService;
use crate::error::Result;
use crate::sink::{Sink, SinkExt};
use crate::timing::{DEFAULT_POLL_PERIOD, STANDARD_TIMEOUT};
use crate::wait::eventually;

/// Label Prometheus attaches to every data-service sample.
pub const DEPLOYMENT_ID_LABEL: &str = "pds_deployment_id";

/// Scope `selector` to one deployment.
pub fn for_deployment(selector: &Selector, deployment_id: &str) -> Selector {
    selector.clone().eq(DEPLOYMENT_ID_LABEL, deployment_id)
}

/// Expected selectors without samples for the deployment at `time`.
pub async fn missing_metrics(
    prometheus: &PrometheusClient,
    deployment_id: &str,
    data_service: DataService,
    time: Timestamp,
) -> Result<Vec<Selector>> {
    let mut missing = Vec::new();
    for selector in expected_metrics(data_service) {
        let query = for_deployment(&selector, deployment_id).to_string();
        if prometheus.query(&query, time).await?.is_empty() {
            missing.push(selector);
        }
    }
    Ok(missing)
}

/// Record a failure listing every expected metric without samples.
pub async fn must_have_expected_metrics(
    t: &dyn Sink,
    prometheus: &PrometheusClient,
    deployment_id: &str,
    data_service: DataService,
) {
    let missing = t.require_ok(
        missing_metrics(prometheus, deployment_id, data_service, Timestamp::now()).await,
        "query expected metrics",
    );
    if !missing.is_empty() {
        let list: Vec<String> = missing.iter().map(ToString::to_string).collect();
        t.error(&format!(
            "{data_service} deployment {deployment_id} is missing metrics: {}",
            list.join(", ")
        ));
    }
}

/// [`must_have_expected_metrics`] inside the waiter.
pub async fn wait_for_expected_metrics(
    t: &dyn Sink,
    prometheus: &PrometheusClient,
    deployment_id: &str,
    data_service: DataService,
) {
    eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
        must_have_expected_metrics(t, prometheus, deployment_id, data_service).await;
    })
    .await;
}
