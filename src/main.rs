//! pds-janitor - removes leftovers of interrupted integration runs.
//!
//! Test cleanups normally remove everything a run creates. A run killed
//! mid-way leaves resources behind; this tool deletes:
//! - namespaces, ClusterIssuers and ClusterRoles labeled with the run's
//!   environment on the target cluster
//! - Control Plane templates and backup policies whose names carry the
//!   harness name prefix
//!
//! Pass `--dry-run` to only list what would be deleted.

use std::future::Future;

use tracing::{error, info, warn};

use pds_integration::cluster::namespace::delete_namespace;
use pds_integration::cluster::{ENVIRONMENT_LABEL, TargetCluster, label_selector};
use pds_integration::controlplane::{ApiError, ControlPlaneConfig};
use pds_integration::logging::init_json_tracing;
use pds_integration::names::NAME_PREFIX;
use pds_integration::setup::resolve_ids;
use pds_integration::{Config, ControlPlane};

#[derive(Default)]
struct Summary {
    deleted: usize,
    failed: usize,
}

impl Summary {
    async fn delete<F, E>(&mut self, dry_run: bool, kind: &str, name: &str, fut: F)
    where
        F: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        if dry_run {
            info!(kind, name, "Would delete");
            return;
        }
        match fut.await {
            Ok(()) => {
                info!(kind, name, "Deleted");
                self.deleted += 1;
            }
            Err(e) => {
                warn!(kind, name, error = %e, "Failed to delete");
                self.failed += 1;
            }
        }
    }
}

fn owned_by_harness(name: &str) -> bool {
    name.starts_with(&format!("{NAME_PREFIX}-"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_json_tracing("pds_integration=info,pds_janitor=info,kube=warn");

    let dry_run = std::env::args().any(|arg| arg == "--dry-run");
    let config = Config::from_env()?;
    info!(environment = %config.environment, dry_run, "Starting pds-janitor");

    let mut summary = Summary::default();

    let cluster = TargetCluster::connect(config.kubeconfig.as_deref()).await?;
    let selector = label_selector(ENVIRONMENT_LABEL, &config.environment);

    for namespace in cluster.list_namespaces(&selector).await? {
        let name = namespace.metadata.name.unwrap_or_default();
        let cluster = &cluster;
        summary
            .delete(dry_run, "Namespace", &name, async {
                delete_namespace(cluster, &name).await;
                Ok::<(), ApiError>(())
            })
            .await;
    }
    for issuer in cluster.list_cluster_issuers(&selector).await? {
        let name = issuer.metadata.name.unwrap_or_default();
        summary
            .delete(dry_run, "ClusterIssuer", &name, cluster.delete_cluster_issuer(&name))
            .await;
    }
    for role in cluster.list_cluster_roles(&selector).await? {
        let name = role.metadata.name.unwrap_or_default();
        summary
            .delete(dry_run, "ClusterRole", &name, cluster.delete_cluster_role(&name))
            .await;
    }

    let cp = ControlPlane::connect(&ControlPlaneConfig::new(
        config.control_plane_api.clone(),
        config.credentials.clone(),
    ))
    .await?;
    let ids = resolve_ids(&cp, &config).await?;
    let tenant_id = ids.tenant_id.as_str();

    for template in cp.list_resource_settings_templates(tenant_id).await? {
        if owned_by_harness(&template.name) {
            summary
                .delete(
                    dry_run,
                    "ResourceSettingsTemplate",
                    &template.name,
                    cp.delete_resource_settings_template(&template.id),
                )
                .await;
        }
    }
    for template in cp.list_application_configuration_templates(tenant_id).await? {
        if owned_by_harness(&template.name) {
            summary
                .delete(
                    dry_run,
                    "ApplicationConfigurationTemplate",
                    &template.name,
                    cp.delete_application_configuration_template(&template.id),
                )
                .await;
        }
    }
    for template in cp.list_storage_options_templates(tenant_id).await? {
        if owned_by_harness(&template.name) {
            summary
                .delete(
                    dry_run,
                    "StorageOptionsTemplate",
                    &template.name,
                    cp.delete_storage_options_template(&template.id),
                )
                .await;
        }
    }
    for policy in cp.list_backup_policies(tenant_id).await? {
        if owned_by_harness(&policy.name) {
            summary
                .delete(
                    dry_run,
                    "BackupPolicy",
                    &policy.name,
                    cp.delete_backup_policy(&policy.id),
                )
                .await;
        }
    }

    if summary.failed > 0 {
        error!(
            deleted = summary.deleted,
            failed = summary.failed,
            "Janitor finished with failures"
        );
        return Err(format!("{} deletions failed", summary.failed).into());
    }
    info!(deleted = summary.deleted, "Janitor finished");
    Ok(())
}
