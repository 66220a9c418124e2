//! Load-test job runner.
//!
//! Runs the per-data-service workload image as a one-shot Job against a
//! deployment and fails the test when the workload fails, times out or logs
//! errors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use jiff::Timestamp;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use kube::api::ObjectMeta;
use regex::Regex;
use tracing::info;

use crate::cluster::jobs::{JobOutcome, run_job};
use crate::cluster::{DEPLOYMENT_ID_LABEL, ENVIRONMENT_LABEL};
use crate::crosscluster::{CrossCluster, DeploymentLocation};
use crate::dataservice::DataService;
use crate::names::random_name;
use crate::sink::{Sink, SinkExt};
use crate::timing::VERY_LONG_TIMEOUT;

/// Redis images created before this instant still use the `default` user.
pub const REDIS_USER_RENAME_CUTOFF: Timestamp = Timestamp::constant(1_680_307_200, 0);

static ERROR_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new("ERROR|FATAL"));

/// What the workload does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadTestMode {
    Write,
    Read,
    #[default]
    Crud,
}

impl LoadTestMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadTestMode::Write => "write",
            LoadTestMode::Read => "read",
            LoadTestMode::Crud => "crud",
        }
    }
}

impl fmt::Display for LoadTestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables of one load-test run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTestOptions {
    pub iterations: u32,
    pub fail_on_error: bool,
    pub mode: LoadTestMode,
    /// Data seed; a read run finds what a write run with the same seed wrote.
    pub seed: Option<String>,
}

impl Default for LoadTestOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            fail_on_error: true,
            mode: LoadTestMode::default(),
            seed: None,
        }
    }
}

impl LoadTestOptions {
    pub fn with_mode(mut self, mode: LoadTestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

/// User the Redis workload authenticates as.
pub fn redis_user(image_created_at: Option<Timestamp>) -> &'static str {
    match image_created_at {
        Some(created) if created < REDIS_USER_RENAME_CUTOFF => "default",
        _ => "pds",
    }
}

/// Externally resolvable host of a deployment.
pub fn deployment_host(location: &DeploymentLocation) -> String {
    format!(
        "{}-{}.{}",
        location.cluster_resource_name, location.namespace, location.dns_zone
    )
}

/// Environment of the workload container.
pub fn load_test_env(
    location: &DeploymentLocation,
    password: &str,
    image_created_at: Option<Timestamp>,
    options: &LoadTestOptions,
) -> Vec<(String, String)> {
    let mut env = vec![
        ("HOST".to_string(), deployment_host(location)),
        ("PASSWORD".to_string(), password.to_string()),
        ("ITERATIONS".to_string(), options.iterations.to_string()),
        ("FAIL_ON_ERROR".to_string(), options.fail_on_error.to_string()),
        ("MODE".to_string(), options.mode.to_string()),
    ];
    if let Some(seed) = &options.seed {
        env.push(("SEED".to_string(), seed.clone()));
    }
    if location.data_service == DataService::Redis {
        env.push(("PDS_USER".to_string(), redis_user(image_created_at).to_string()));
        env.push(("CLUSTER_MODE".to_string(), (location.node_count > 1).to_string()));
    }
    env
}

/// Job running the workload image once, without retries.
pub fn job_manifest(
    name: &str,
    location: &DeploymentLocation,
    environment: &str,
    env: Vec<(String, String)>,
) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(location.namespace.clone()),
            labels: Some(BTreeMap::from([
                (ENVIRONMENT_LABEL.to_string(), environment.to_string()),
                (DEPLOYMENT_ID_LABEL.to_string(), location.deployment_id.clone()),
            ])),
            ..Default::default()
        },
        spec: Some(JobSpec {
            completions: Some(1),
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![Container {
                        name: "main".to_string(),
                        image: Some(location.data_service.load_test_image()),
                        env: Some(
                            env.into_iter()
                                .map(|(name, value)| EnvVar {
                                    name,
                                    value: Some(value),
                                    ..Default::default()
                                })
                                .collect(),
                        ),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Whether workload logs report an error.
pub fn logs_have_errors(logs: &str) -> bool {
    match ERROR_PATTERN.as_ref() {
        Ok(pattern) => pattern.is_match(logs),
        Err(_) => logs.contains("ERROR") || logs.contains("FATAL"),
    }
}

/// Run a load test against a deployment and fail the test unless it passes.
pub async fn must_run_load_test(
    t: &dyn Sink,
    xc: &CrossCluster,
    deployment_id: &str,
    options: &LoadTestOptions,
) {
    let location = xc.must_locate(t, deployment_id).await;
    let cluster = xc.cluster();
    let password = t.require_ok(
        cluster
            .secret_value(
                &location.namespace,
                &format!("{}-creds", location.cluster_resource_name),
                "password",
            )
            .await,
        "read deployment credentials",
    );
    let image_created_at = if location.data_service == DataService::Redis {
        t.require_ok(
            xc.control_plane().get_image(&location.image_id).await,
            "get deployment image",
        )
        .created_at
    } else {
        None
    };

    let name = random_name(&format!("{}-loadtest", location.cluster_resource_name));
    let env = load_test_env(&location, &password, image_created_at, options);
    let job = job_manifest(&name, &location, xc.environment(), env);
    info!(job = %name, deployment_id, mode = %options.mode, "Starting load test");

    let run = run_job(
        t,
        cluster,
        &location.namespace,
        &job,
        VERY_LONG_TIMEOUT,
        Some(xc.logs_since_seconds()),
    )
    .await;
    let logs = &run.logs;
    match run.outcome {
        Some(JobOutcome::Succeeded) => t.require_true(
            !logs_have_errors(logs),
            &format!("load test {name} logged errors:\n{logs}"),
        ),
        Some(JobOutcome::Failed) => t.fatal(&format!("load test {name} failed:\n{logs}")),
        None => t.fatal(&format!("load test {name} did not finish:\n{logs}")),
    }
}
