//! One-shot Job helpers shared by the load-test runner and the DNS check.

use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use tracing::{debug, warn};

use super::{TargetCluster, ignore_not_found};
use crate::sink::{Sink, SinkExt};
use crate::timing::QUICK_POLL_PERIOD;
use crate::wait::eventually;

/// Terminal state of a Job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
}

/// Terminal state of a single-completion Job with no retries.
pub fn job_outcome(job: &Job) -> Option<JobOutcome> {
    let status = job.status.as_ref()?;
    if status.failed.unwrap_or(0) > 0 {
        Some(JobOutcome::Failed)
    } else if status.succeeded.unwrap_or(0) > 0 {
        Some(JobOutcome::Succeeded)
    } else {
        None
    }
}

/// Whether all requested completions succeeded.
pub fn job_completed(job: &Job) -> bool {
    let completions = job.spec.as_ref().and_then(|s| s.completions).unwrap_or(1);
    let succeeded = job.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0);
    completions == succeeded
}

/// Label Kubernetes puts on the pods of a Job.
pub fn job_pod_selector(job_name: &str) -> String {
    format!("job-name={job_name}")
}

/// Poll a Job until it reaches a terminal state.
///
/// Never aborts `t`: at the deadline the missing outcome is recorded as an
/// error and `None` is returned, so callers can still collect logs and delete
/// the Job.
pub async fn wait_for_job_outcome(
    t: &dyn Sink,
    cluster: &TargetCluster,
    namespace: &str,
    name: &str,
    timeout: Duration,
) -> Option<JobOutcome> {
    let mut outcome = None;
    eventually(t, timeout, QUICK_POLL_PERIOD, async |t: &dyn Sink| {
        match cluster.get_job(namespace, name).await {
            Ok(job) => {
                outcome = job_outcome(&job);
                t.check_true(outcome.is_some(), &format!("job {namespace}/{name} finished"));
            }
            Err(e) => {
                outcome = None;
                t.error(&format!("get job {namespace}/{name}: {e}"));
            }
        }
    })
    .await;
    outcome
}

/// A finished (or abandoned) one-shot Job.
#[derive(Clone, Debug)]
pub struct JobRun {
    pub name: String,
    /// `None` when the Job did not finish in time.
    pub outcome: Option<JobOutcome>,
    /// Pod logs, or a note on why they could not be read.
    pub logs: String,
}

/// Create `job`, wait for its outcome, collect its pod logs and delete it.
///
/// Once the Job is created every path deletes it again, including a Job that
/// never finishes.
pub async fn run_job(
    t: &dyn Sink,
    cluster: &TargetCluster,
    namespace: &str,
    job: &Job,
    timeout: Duration,
    logs_since_seconds: Option<i64>,
) -> JobRun {
    let name = job.metadata.name.clone().unwrap_or_default();
    t.require_ok(
        cluster.create_job(namespace, job).await,
        &format!("create job {namespace}/{name}"),
    );
    debug!(job = %name, namespace, "Created job");

    let outcome = wait_for_job_outcome(t, cluster, namespace, &name, timeout).await;
    let logs = cluster
        .collect_logs(namespace, &job_pod_selector(&name), logs_since_seconds)
        .await
        .unwrap_or_else(|e| format!("(collecting logs failed: {e})"));
    if let Err(e) = ignore_not_found(cluster.delete_job(namespace, &name).await) {
        warn!(job = %name, error = %e, "Failed to delete job");
    }
    JobRun { name, outcome, logs }
}
