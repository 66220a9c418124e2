//! Namespace fixtures.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;
use tracing::{debug, info, warn};

use super::{ENVIRONMENT_LABEL, TargetCluster};
use crate::error::Result;
use crate::sink::{SinkExt, TestCase};
use crate::timing::{QUICK_CHECK_TIMEOUT, QUICK_POLL_PERIOD};

/// Label that makes the Control Plane manage a namespace.
pub const MANAGED_LABEL: &str = "pds.portworx.com/available";

const PSA_MODES: [&str; 3] = ["enforce", "audit", "warn"];

/// Pod Security Admission level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodSecurityLevel {
    Privileged,
    Baseline,
    Restricted,
}

impl PodSecurityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PodSecurityLevel::Privileged => "privileged",
            PodSecurityLevel::Baseline => "baseline",
            PodSecurityLevel::Restricted => "restricted",
        }
    }
}

impl fmt::Display for PodSecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a test namespace should look like.
#[derive(Clone, Debug)]
pub struct NamespaceOptions {
    pub name: String,
    pub environment: String,
    pub pod_security: Option<PodSecurityLevel>,
    /// Carry [`MANAGED_LABEL`]`=true`.
    pub managed: bool,
}

impl NamespaceOptions {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            pod_security: None,
            managed: false,
        }
    }

    pub fn with_pod_security(mut self, level: PodSecurityLevel) -> Self {
        self.pod_security = Some(level);
        self
    }

    pub fn managed(mut self, managed: bool) -> Self {
        self.managed = managed;
        self
    }
}

/// Build the namespace object for `options`.
pub fn namespace_manifest(options: &NamespaceOptions) -> Namespace {
    let mut labels = BTreeMap::from([(ENVIRONMENT_LABEL.to_string(), options.environment.clone())]);
    if let Some(level) = options.pod_security {
        for mode in PSA_MODES {
            labels.insert(
                format!("pod-security.kubernetes.io/{mode}"),
                level.as_str().to_string(),
            );
        }
    }
    if options.managed {
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
    }

    Namespace {
        metadata: ObjectMeta {
            name: Some(options.name.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn is_terminating(namespace: &Namespace) -> bool {
    namespace
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        == Some("Terminating")
}

/// Delete a namespace; if it is still `Terminating` after a short wait, clear
/// its finalizers. Never fails, only logs.
pub async fn delete_namespace(cluster: &TargetCluster, name: &str) {
    match cluster.delete_namespace(name).await {
        Ok(()) => info!(namespace = %name, "Deleting namespace"),
        Err(e) if e.is_not_found() => return,
        Err(e) => {
            warn!(namespace = %name, error = %e, "Failed to delete namespace");
            return;
        }
    }

    let deadline = tokio::time::Instant::now() + QUICK_CHECK_TIMEOUT;
    loop {
        let namespace = match cluster.get_namespace(name).await {
            Ok(namespace) => namespace,
            Err(e) if e.is_not_found() => {
                debug!(namespace = %name, "Namespace gone");
                return;
            }
            Err(e) => {
                warn!(namespace = %name, error = %e, "Failed to read namespace");
                return;
            }
        };
        if tokio::time::Instant::now() >= deadline {
            if is_terminating(&namespace) {
                warn!(namespace = %name, "Namespace stuck terminating, clearing finalizers");
                if let Err(e) = cluster.finalize_namespace(name).await {
                    warn!(namespace = %name, error = %e, "Failed to finalize namespace");
                }
            }
            return;
        }
        tokio::time::sleep(QUICK_POLL_PERIOD).await;
    }
}

/// Create a namespace and register its deletion as a cleanup.
pub async fn create_namespace(
    t: &TestCase,
    cluster: &TargetCluster,
    options: &NamespaceOptions,
) -> Result<Namespace> {
    let namespace = cluster.create_namespace(&namespace_manifest(options)).await?;
    info!(namespace = %options.name, managed = options.managed, "Created namespace");
    let cluster = cluster.clone();
    let name = options.name.clone();
    t.cleanup(format!("delete namespace {name}"), async move {
        delete_namespace(&cluster, &name).await;
    });
    Ok(namespace)
}

/// [`create_namespace`], failing the test on error.
pub async fn must_create_namespace(
    t: &TestCase,
    cluster: &TargetCluster,
    options: &NamespaceOptions,
) -> Namespace {
    t.require_ok(
        create_namespace(t, cluster, options).await,
        &format!("create namespace {}", options.name),
    )
}
