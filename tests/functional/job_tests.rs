//! One-shot Job runs against the fake Kubernetes API.

use std::time::Duration;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use kube::api::ObjectMeta;
use serde_json::json;

use pds_integration::{Sink, TestCase};
use pds_integration::cluster::jobs::{JobOutcome, run_job};

use crate::{ClusterState, Recorder, fake_cluster};

fn job(name: &str) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(JobSpec::default()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_unfinished_job_is_deleted_and_keeps_logs() {
    let (state, cluster) = fake_cluster(ClusterState {
        pod_logs: "connecting to pg-test\n".to_string(),
        ..Default::default()
    });
    let t = Recorder::default();

    let run = run_job(&t, &cluster, "load", &job("load-abc"), Duration::from_millis(300), None).await;

    assert_eq!(run.outcome, None);
    assert!(run.logs.contains("--- pod load-abc-pod ---"), "{}", run.logs);
    assert!(run.logs.contains("connecting to pg-test"), "{}", run.logs);
    assert!(t.failed());
    assert!(
        t.errors().iter().any(|e| e.contains("job load/load-abc finished")),
        "{:?}",
        t.errors()
    );
    let state = state.lock().unwrap();
    assert_eq!(state.deleted_jobs, vec!["load-abc".to_string()]);
    assert!(state.jobs.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unfinished_job_returns_to_a_test_case() {
    let (state, cluster) = fake_cluster(ClusterState {
        pod_logs: "still loading\n".to_string(),
        ..Default::default()
    });
    let t = TestCase::new("unfinished-job");

    let run = run_job(&t, &cluster, "load", &job("load-xyz"), Duration::from_millis(300), None).await;

    assert_eq!(run.outcome, None);
    assert!(run.logs.contains("still loading"));
    assert!(t.failed());
    assert_eq!(state.lock().unwrap().deleted_jobs, vec!["load-xyz".to_string()]);
    // The recorded failure is reported when the test case is dropped.
    let dropped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || drop(t)));
    assert!(dropped.is_err());
}

#[tokio::test]
async fn test_succeeded_job_is_deleted() {
    let (state, cluster) = fake_cluster(ClusterState {
        job_status: Some(json!({ "succeeded": 1 })),
        pod_logs: "OK\n".to_string(),
        ..Default::default()
    });
    let t = Recorder::default();

    let run = run_job(&t, &cluster, "dns", &job("dns-check-1"), Duration::from_secs(5), Some(60)).await;

    assert_eq!(run.outcome, Some(JobOutcome::Succeeded));
    assert_eq!(run.name, "dns-check-1");
    assert!(run.logs.contains("OK"));
    assert!(!t.failed(), "{:?}", t.errors());
    assert_eq!(state.lock().unwrap().deleted_jobs, vec!["dns-check-1".to_string()]);
}

#[tokio::test]
async fn test_failed_job_is_reported_without_failing_the_sink() {
    let (state, cluster) = fake_cluster(ClusterState {
        job_status: Some(json!({ "failed": 1 })),
        ..Default::default()
    });
    let t = Recorder::default();

    let run = run_job(&t, &cluster, "load", &job("load-def"), Duration::from_secs(5), None).await;

    assert_eq!(run.outcome, Some(JobOutcome::Failed));
    assert!(!t.failed(), "{:?}", t.errors());
    assert_eq!(state.lock().unwrap().deleted_jobs, vec!["load-def".to_string()]);
}
