//! Cross-cluster reconciler.
//!
//! Waits that span the Control Plane and the target cluster. Every operation
//! starts from a Control Plane deployment id and translates it into cluster
//! coordinates through [`CrossCluster::locate`].
//!
//! A deployment moves through `creating → available → healthy`, may go
//! through `updating` and back, and ends `deleting → absent`. These routines
//! only observe that machine; they never drive it.

mod backup;
mod dns;
mod statefulset;
mod volumes;

pub use dns::{DNS_CHECK_IMAGE, dns_check_job, load_balancer_services_ready};
pub use statefulset::{container_image, pds_mode_normal, statefulset_ready};

use std::time::Duration;

use jiff::Timestamp;
use tracing::{debug, info, instrument};

use crate::cluster::jobs::job_completed;
use crate::cluster::{TargetCluster, ignore_not_found};
use crate::config::DnsConfig;
use crate::controlplane::ControlPlane;
use crate::controlplane::models::{BackupTargetState, Namespace};
use crate::dataservice::DataService;
use crate::error::{Error, Result};
use crate::sink::{Sink, SinkExt};
use crate::timing::{DEFAULT_POLL_PERIOD, LONG_TIMEOUT, QUICK_POLL_PERIOD, STANDARD_TIMEOUT};
use crate::wait::eventually;

/// Cluster coordinates of a Control Plane deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentLocation {
    pub deployment_id: String,
    pub namespace: String,
    pub cluster_resource_name: String,
    pub data_service: DataService,
    pub node_count: i32,
    pub image_id: String,
    pub dns_zone: String,
}

impl DeploymentLocation {
    /// Selector of the resources the operator labels with the instance name.
    pub fn name_selector(&self) -> String {
        format!("name={}", self.cluster_resource_name)
    }
}

/// Observes both planes for one suite.
#[derive(Clone)]
pub struct CrossCluster {
    cp: ControlPlane,
    cluster: TargetCluster,
    suite_start: Timestamp,
    environment: String,
    dns: Option<DnsConfig>,
}

/// No listed namespace is available.
pub fn namespace_released(namespaces: &[Namespace]) -> bool {
    namespaces.iter().all(|namespace| !namespace.is_available())
}

impl CrossCluster {
    pub fn new(
        cp: ControlPlane,
        cluster: TargetCluster,
        suite_start: Timestamp,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            cp,
            cluster,
            suite_start,
            environment: environment.into(),
            dns: None,
        }
    }

    /// Flush this DNS server before host checks.
    pub fn with_dns(mut self, dns: Option<DnsConfig>) -> Self {
        self.dns = dns;
        self
    }

    pub fn control_plane(&self) -> &ControlPlane {
        &self.cp
    }

    pub fn cluster(&self) -> &TargetCluster {
        &self.cluster
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Seconds elapsed since the suite started, for log collection.
    pub fn logs_since_seconds(&self) -> i64 {
        Timestamp::now()
            .duration_since(self.suite_start)
            .as_secs()
            .max(1)
    }

    /// Translate a deployment id into cluster coordinates.
    #[instrument(skip(self))]
    pub async fn locate(&self, deployment_id: &str) -> Result<DeploymentLocation> {
        let deployment = self.cp.get_deployment(deployment_id).await?;
        let namespace = self.cp.get_namespace(&deployment.namespace_id).await?;

        let data_service_id = if deployment.data_service_id.is_empty() {
            self.cp.get_image(&deployment.image_id).await?.data_service_id
        } else {
            deployment.data_service_id.clone()
        };
        let catalog_entry = self.cp.get_data_service(&data_service_id).await?;
        let data_service = DataService::from_name(&catalog_entry.name)
            .ok_or_else(|| Error::UnknownDataService(catalog_entry.name.clone()))?;

        if deployment.cluster_resource_name.is_empty() {
            return Err(Error::MissingField(format!(
                "deployment {deployment_id} cluster_resource_name"
            )));
        }

        Ok(DeploymentLocation {
            deployment_id: deployment.id,
            namespace: namespace.name,
            cluster_resource_name: deployment.cluster_resource_name,
            data_service,
            node_count: deployment.node_count,
            image_id: deployment.image_id,
            dns_zone: deployment.dns_zone,
        })
    }

    /// [`locate`](Self::locate), failing the test on error.
    pub async fn must_locate(&self, t: &dyn Sink, deployment_id: &str) -> DeploymentLocation {
        t.require_ok(
            self.locate(deployment_id).await,
            &format!("locate deployment {deployment_id}"),
        )
    }

    pub async fn wait_for_deployment_healthy(&self, t: &dyn Sink, deployment_id: &str) {
        eventually(t, LONG_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let status = t.require_ok(
                self.cp.get_deployment_status(deployment_id).await,
                "get deployment status",
            );
            t.require_true(
                status.is_healthy(),
                &format!("deployment {deployment_id} health is {:?}", status.health),
            );
        })
        .await;
    }

    /// Wait for the cluster-init and node-init jobs of the deployment.
    pub async fn wait_for_deployment_initialized(&self, t: &dyn Sink, deployment_id: &str) {
        let location = self.must_locate(t, deployment_id).await;
        let jobs = [
            format!("{}-cluster-init", location.cluster_resource_name),
            format!("{}-node-init", location.cluster_resource_name),
        ];
        eventually(t, LONG_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            for name in &jobs {
                let job = t.require_ok(
                    self.cluster.get_job(&location.namespace, name).await,
                    &format!("get job {name}"),
                );
                t.require_true(job_completed(&job), &format!("job {name} completed"));
            }
        })
        .await;
    }

    /// Wait until the Control Plane no longer knows the deployment.
    pub async fn wait_for_deployment_deleted(&self, t: &dyn Sink, deployment_id: &str) {
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let result = self.cp.get_deployment(deployment_id).await;
            t.require_true(
                matches!(&result, Err(e) if e.is_not_found()),
                &format!("deployment {deployment_id} still present: {result:?}"),
            );
        })
        .await;
    }

    /// Delete the data-service resource directly on the cluster and wait for
    /// the Control Plane to drop the deployment.
    pub async fn delete_deployment_custom_resource(&self, t: &dyn Sink, deployment_id: &str) {
        let location = self.must_locate(t, deployment_id).await;
        t.require_ok(
            ignore_not_found(
                self.cluster
                    .delete_data_service_resource(
                        location.data_service,
                        &location.namespace,
                        &location.cluster_resource_name,
                    )
                    .await,
            ),
            "delete data service resource",
        );
        info!(
            deployment_id,
            resource = %location.cluster_resource_name,
            "Deleted data service resource"
        );
        self.wait_for_deployment_deleted(t, deployment_id).await;
    }

    /// Wait until the Control Plane reports namespace `name` with `status`.
    pub async fn wait_for_namespace_status(
        &self,
        t: &dyn Sink,
        deployment_target_id: &str,
        name: &str,
        status: &str,
    ) -> Namespace {
        let mut found = None;
        eventually(t, STANDARD_TIMEOUT, QUICK_POLL_PERIOD, async |t: &dyn Sink| {
            let namespaces = t.require_ok(
                self.cp.list_namespaces(deployment_target_id, Some(name)).await,
                "list namespaces",
            );
            t.require_eq(1, namespaces.len(), &format!("namespaces named {name}"));
            let namespace = t.require_some(namespaces.into_iter().next(), "namespace");
            t.require_true(
                namespace.status.eq_ignore_ascii_case(status),
                &format!("namespace {name} status {:?}, want {status:?}", namespace.status),
            );
            found = Some(namespace);
        })
        .await;
        t.require_some(found, &format!("namespace {name}"))
    }

    /// Wait until the Control Plane no longer lists namespace `name`.
    pub async fn wait_for_namespace_absent(&self, t: &dyn Sink, deployment_target_id: &str, name: &str) {
        eventually(t, STANDARD_TIMEOUT, QUICK_POLL_PERIOD, async |t: &dyn Sink| {
            let namespaces = t.require_ok(
                self.cp.list_namespaces(deployment_target_id, Some(name)).await,
                "list namespaces",
            );
            t.require_true(namespaces.is_empty(), &format!("namespace {name} still listed"));
        })
        .await;
    }

    /// Wait until namespace `name` is listed only as unavailable, or not at
    /// all. A namespace held in `Terminating` ends up here.
    pub async fn wait_for_namespace_released(&self, t: &dyn Sink, deployment_target_id: &str, name: &str) {
        eventually(t, STANDARD_TIMEOUT, QUICK_POLL_PERIOD, async |t: &dyn Sink| {
            let namespaces = t.require_ok(
                self.cp.list_namespaces(deployment_target_id, Some(name)).await,
                "list namespaces",
            );
            t.require_true(
                namespace_released(&namespaces),
                &format!("namespace {name} still available"),
            );
        })
        .await;
    }

    /// Check that namespace `name` stays unlisted for the whole `window`.
    pub async fn ensure_namespace_never_listed(
        &self,
        t: &dyn Sink,
        deployment_target_id: &str,
        name: &str,
        window: Duration,
    ) {
        let deadline = tokio::time::Instant::now() + window;
        while tokio::time::Instant::now() < deadline {
            let namespaces = t.require_ok(
                self.cp.list_namespaces(deployment_target_id, Some(name)).await,
                "list namespaces",
            );
            if !t.check_true(namespaces.is_empty(), &format!("namespace {name} is listed")) {
                return;
            }
            tokio::time::sleep(QUICK_POLL_PERIOD).await;
        }
        debug!(namespace = %name, ?window, "Namespace stayed unlisted");
    }

    /// Wait until the backup target synced to the deployment target and
    /// return its state.
    pub async fn wait_for_backup_target_synced(
        &self,
        t: &dyn Sink,
        backup_target_id: &str,
        deployment_target_id: &str,
    ) -> BackupTargetState {
        let mut synced = None;
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let states = t.require_ok(
                self.cp.list_backup_target_states(backup_target_id).await,
                "list backup target states",
            );
            let state = t.require_some(
                states
                    .into_iter()
                    .find(|s| s.deployment_target_id == deployment_target_id),
                "backup target state for the deployment target",
            );
            t.require_true(
                state.is_successful(),
                &format!(
                    "backup target state {:?} ({}: {})",
                    state.state, state.error_code, state.error_message
                ),
            );
            synced = Some(state);
        })
        .await;
        t.require_some(synced, "synced backup target state")
    }

    /// Wait until the backup target has no state on the deployment target.
    pub async fn wait_for_backup_target_state_removed(
        &self,
        t: &dyn Sink,
        backup_target_id: &str,
        deployment_target_id: &str,
    ) {
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let states = match self.cp.list_backup_target_states(backup_target_id).await {
                Ok(states) => states,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => t.fatal(&format!("list backup target states: {e}")),
            };
            t.require_true(
                !states
                    .iter()
                    .any(|s| s.deployment_target_id == deployment_target_id),
                "backup target state removed",
            );
        })
        .await;
    }
}
