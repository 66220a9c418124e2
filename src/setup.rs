//! Suite initialization and per-test fixtures.
//!
//! [`Initializer::run`] resolves the suite's coordinates on the Control
//! Plane, prepares the test namespace, loads the image catalog and creates
//! the suite templates. The resulting [`Suite`] is shared by every test; the
//! fixtures on it register their own cleanup with the calling [`TestCase`].

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use jiff::Timestamp;
use kube::api::{DynamicObject, ObjectMeta};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::cluster::namespace::{NamespaceOptions, namespace_manifest};
use crate::cluster::{ENVIRONMENT_LABEL, TargetCluster, cluster_issuer_resource, ignore_not_found};
use crate::config::Config;
use crate::controlplane::models::{
    Backup, BackupCredentials, BackupPolicy, BackupSchedule, BackupTarget,
    CreateApplicationConfigurationTemplateRequest, CreateBackupCredentialsRequest,
    CreateBackupPolicyRequest, CreateBackupRequest, CreateBackupTargetRequest,
    CreateResourceSettingsTemplateRequest, CreateStorageOptionsTemplateRequest, CredentialsPayload,
    Deployment, S3Credentials, UpdateDeploymentTargetRequest,
};
use crate::controlplane::{ControlPlane, ControlPlaneConfig};
use crate::crosscluster::CrossCluster;
use crate::error::{Error, Result};
use crate::metrics::PrometheusClient;
use crate::names::{NAME_PREFIX, generate_name, random_name};
use crate::resolver::{
    APP_CONFIG_DEFAULT, DeploymentPlacement, DeploymentResolver, ImageCatalog,
    RESOURCE_SETTINGS_ENORMOUS, RESOURCE_SETTINGS_SMALL, STORAGE_OPTION_DEFAULT,
    ShortDeploymentSpec, SuiteTemplates,
};
use crate::sink::{Sink, SinkExt, TestCase};
use crate::timing::{DEFAULT_POLL_PERIOD, LONG_TIMEOUT, QUICK_POLL_PERIOD, STANDARD_TIMEOUT};
use crate::wait::eventually;

/// Control Plane ids the suite works under.
#[derive(Clone, Debug, Default)]
pub struct SuiteIds {
    pub account_id: String,
    pub tenant_id: String,
    pub project_id: String,
    pub deployment_target_id: String,
    pub namespace_id: String,
    pub namespace: String,
}

/// Templates and namespace the suite created. They are removed at suite end,
/// or as soon as setup fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnedResources {
    pub storage_options: Vec<String>,
    pub resource_settings: Vec<String>,
    pub app_configs: Vec<String>,
    /// Test namespace, when the suite created it.
    pub namespace: Option<String>,
}

impl OwnedResources {
    pub fn is_empty(&self) -> bool {
        self.storage_options.is_empty()
            && self.resource_settings.is_empty()
            && self.app_configs.is_empty()
            && self.namespace.is_none()
    }

    /// Delete the templates. Failures are logged, never raised.
    pub async fn remove_templates(&self, cp: &ControlPlane) {
        for id in &self.app_configs {
            warn_on_error(
                "delete application configuration template",
                ignore_not_found(
                    cp.delete_application_configuration_template(id)
                        .await
                        .map_err(Error::from),
                )
                .map(drop),
            );
        }
        for id in &self.resource_settings {
            warn_on_error(
                "delete resource settings template",
                ignore_not_found(cp.delete_resource_settings_template(id).await.map_err(Error::from))
                    .map(drop),
            );
        }
        for id in &self.storage_options {
            warn_on_error(
                "delete storage options template",
                ignore_not_found(cp.delete_storage_options_template(id).await.map_err(Error::from))
                    .map(drop),
            );
        }
    }

    /// Delete the templates, then the namespace.
    pub async fn remove(&self, cp: &ControlPlane, cluster: &TargetCluster) {
        self.remove_templates(cp).await;
        if let Some(namespace) = &self.namespace {
            crate::cluster::namespace::delete_namespace(cluster, namespace).await;
        }
    }
}

/// Shared state of a test run.
pub struct Suite {
    pub config: Arc<Config>,
    pub cp: ControlPlane,
    pub cluster: TargetCluster,
    pub cross: CrossCluster,
    pub prometheus: Option<PrometheusClient>,
    pub ids: SuiteIds,
    pub catalog: Arc<ImageCatalog>,
    pub templates: Arc<SuiteTemplates>,
    pub resolver: DeploymentResolver,
    pub start: Timestamp,
    owned: OwnedResources,
}

fn pick_by_name<T>(kind: &str, items: Vec<T>, wanted: &str, name: impl Fn(&T) -> &str) -> Result<T> {
    let mut matches: Vec<T> = items.into_iter().filter(|item| name(item) == wanted).collect();
    match matches.len() {
        1 => matches
            .pop()
            .ok_or_else(|| Error::Config(format!("{kind} {wanted:?} not found"))),
        0 => Err(Error::Config(format!("{kind} {wanted:?} not found"))),
        n => Err(Error::Config(format!("{n} {kind}s named {wanted:?}"))),
    }
}

/// Random name under the harness prefix, so leftovers can be found later.
fn harness_name(kind: &str) -> String {
    random_name(&format!("{NAME_PREFIX}-{kind}"))
}

/// Builds a [`Suite`].
pub struct Initializer;

impl Initializer {
    /// Prepare the suite, failing `t` on any error. Whatever was created
    /// before the failure is removed again.
    #[instrument(skip_all, fields(environment = %config.environment))]
    pub async fn run(t: &dyn Sink, config: Config) -> Suite {
        let start = Timestamp::now();
        let config = Arc::new(config);
        let (cp, cluster) = connect_clients(t, &config).await;

        let mut owned = OwnedResources::default();
        let prepared = AssertUnwindSafe(Self::prepare(t, &config, &cp, &cluster, start, &mut owned))
            .catch_unwind()
            .await;
        match prepared {
            Ok(mut suite) => {
                suite.owned = owned;
                suite
            }
            Err(payload) => {
                if !owned.is_empty() {
                    warn!(?owned, "Suite setup failed, removing what it created");
                    owned.remove(&cp, &cluster).await;
                }
                std::panic::resume_unwind(payload)
            }
        }
    }

    async fn prepare(
        t: &dyn Sink,
        config: &Arc<Config>,
        cp: &ControlPlane,
        cluster: &TargetCluster,
        start: Timestamp,
        owned: &mut OwnedResources,
    ) -> Suite {
        let mut ids = t.require_ok(resolve_ids(cp, config).await, "resolve suite identifiers");
        let cross = CrossCluster::new(cp.clone(), cluster.clone(), start, config.environment.clone())
            .with_dns(config.dns.clone());

        let (namespace, namespace_created) = t.require_ok(
            ensure_namespace(cluster, config).await,
            "prepare test namespace",
        );
        if namespace_created {
            owned.namespace = Some(namespace.clone());
        }
        let cp_namespace = cross
            .wait_for_namespace_status(t, &ids.deployment_target_id, &namespace, "available")
            .await;
        ids.namespace_id = cp_namespace.id;
        ids.namespace = namespace;

        let catalog = Arc::new(t.require_ok(
            ImageCatalog::load(cp, &config.data_service_versions, config.latest_compatible_only)
                .await,
            "load image catalog",
        ));

        let mut templates = SuiteTemplates::new(generate_name());
        t.require_ok(
            create_suite_templates(cp, &ids.tenant_id, &catalog, &mut templates, owned).await,
            "create suite templates",
        );
        let templates = Arc::new(templates);

        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let target = t.require_ok(
                cp.get_deployment_target(&ids.deployment_target_id).await,
                "get deployment target",
            );
            t.require_true(
                target.is_healthy(),
                &format!("deployment target status {:?}", target.status),
            );
        })
        .await;

        let suite = Suite {
            config: config.clone(),
            cp: cp.clone(),
            cluster: cluster.clone(),
            cross,
            prometheus: None,
            resolver: DeploymentResolver::new(
                cp.clone(),
                DeploymentPlacement::default(),
                catalog.clone(),
                templates.clone(),
            ),
            ids,
            catalog,
            templates,
            start,
            owned: OwnedResources::default(),
        }
        .with_clients(cp.clone(), cluster.clone());

        info!(
            tenant_id = %suite.ids.tenant_id,
            deployment_target_id = %suite.ids.deployment_target_id,
            namespace = %suite.ids.namespace,
            prefix = %suite.templates.prefix(),
            images = suite.catalog.images().len(),
            "Suite ready"
        );
        suite
    }
}

/// Build both plane clients from the configuration, failing `t` on error.
async fn connect_clients(t: &dyn Sink, config: &Config) -> (ControlPlane, TargetCluster) {
    let cp = t.require_ok(
        ControlPlane::connect(&ControlPlaneConfig::new(
            config.control_plane_api.clone(),
            config.credentials.clone(),
        ))
        .await,
        "connect to the Control Plane",
    );
    let cluster = t.require_ok(
        TargetCluster::connect(config.kubeconfig.as_deref()).await,
        "connect to the target cluster",
    );
    (cp, cluster)
}

/// Look up the configured account, tenant, project and deployment target by
/// exact name. The namespace fields are left empty.
pub async fn resolve_ids(cp: &ControlPlane, config: &Config) -> Result<SuiteIds> {
    let account = pick_by_name("account", cp.list_accounts().await?, &config.account_name, |a| &a.name)?;
    let tenant = pick_by_name("tenant", cp.list_tenants(&account.id).await?, &config.tenant_name, |t| &t.name)?;
    let project = pick_by_name(
        "project",
        cp.list_projects(&tenant.id).await?,
        &config.project_name,
        |p| &p.name,
    )?;
    let target = pick_by_name(
        "deployment target",
        cp.list_deployment_targets(&tenant.id).await?,
        &config.deployment_target_name,
        |d| &d.name,
    )?;
    Ok(SuiteIds {
        account_id: account.id,
        tenant_id: tenant.id,
        project_id: project.id,
        deployment_target_id: target.id,
        ..Default::default()
    })
}

/// Use the configured namespace, creating it when absent, or a generated one.
/// Returns the name and whether the suite created it.
async fn ensure_namespace(cluster: &TargetCluster, config: &Config) -> Result<(String, bool)> {
    let name = config.test_namespace.clone().unwrap_or_else(generate_name);
    if ignore_not_found(cluster.get_namespace(&name).await)?.is_some() {
        return Ok((name, false));
    }
    let options = NamespaceOptions::new(name.clone(), config.environment.clone()).managed(true);
    cluster.create_namespace(&namespace_manifest(&options)).await?;
    info!(namespace = %name, "Created test namespace");
    Ok((name, true))
}

/// Create the storage options template and, per catalog data service, the
/// resource settings and application configuration templates. Each id lands
/// in `owned` as soon as it exists, so a failure part way leaves `owned`
/// listing everything to remove.
pub async fn create_suite_templates(
    cp: &ControlPlane,
    tenant_id: &str,
    catalog: &ImageCatalog,
    templates: &mut SuiteTemplates,
    owned: &mut OwnedResources,
) -> Result<()> {
    let prefix = templates.prefix().to_string();

    let storage = cp
        .create_storage_options_template(
            tenant_id,
            &CreateStorageOptionsTemplateRequest {
                name: format!("{prefix}-{STORAGE_OPTION_DEFAULT}"),
                repl: 1,
                fs: "xfs".to_string(),
                secure: false,
                provisioner: "pxd.portworx.com".to_string(),
                fg: false,
            },
        )
        .await?;
    owned.storage_options.push(storage.id);
    templates.add_storage_option(STORAGE_OPTION_DEFAULT);

    let mut data_services: BTreeMap<&str, &str> = BTreeMap::new();
    for image in catalog.images() {
        data_services.insert(&image.data_service_name, &image.data_service_id);
    }

    for (name, data_service_id) in data_services {
        for (short_name, cpu, memory) in [
            (RESOURCE_SETTINGS_SMALL, "500m", "1Gi"),
            (RESOURCE_SETTINGS_ENORMOUS, "10000", "10000Gi"),
        ] {
            let template = cp
                .create_resource_settings_template(
                    tenant_id,
                    &CreateResourceSettingsTemplateRequest {
                        name: format!("{prefix}-{short_name}"),
                        data_service_id: data_service_id.to_string(),
                        cpu_request: cpu.to_string(),
                        cpu_limit: cpu.to_string(),
                        memory_request: memory.to_string(),
                        memory_limit: memory.to_string(),
                        storage_request: "5G".to_string(),
                    },
                )
                .await?;
            owned.resource_settings.push(template.id);
            templates.add_resource_settings(name, short_name);
        }

        let app_config = cp
            .create_application_configuration_template(
                tenant_id,
                &CreateApplicationConfigurationTemplateRequest {
                    name: format!("{prefix}-{APP_CONFIG_DEFAULT}"),
                    data_service_id: data_service_id.to_string(),
                    config_items: Vec::new(),
                },
            )
            .await?;
        owned.app_configs.push(app_config.id);
        templates.add_app_config(name, APP_CONFIG_DEFAULT);
    }
    Ok(())
}

fn warn_on_error(what: &str, result: std::result::Result<(), impl std::fmt::Display>) {
    if let Err(e) = result {
        warn!(error = %e, "Cleanup: {}", what);
    }
}

impl Suite {
    /// The same suite over new clients.
    ///
    /// Clients are bound to the tokio runtime that created them; a suite
    /// shared between `#[tokio::test]`s must be reconnected in each test.
    pub async fn reconnect(&self, t: &dyn Sink) -> Suite {
        let (cp, cluster) = connect_clients(t, &self.config).await;
        Suite {
            config: self.config.clone(),
            cp: cp.clone(),
            cluster: cluster.clone(),
            cross: self.cross.clone(),
            prometheus: None,
            resolver: self.resolver.clone(),
            ids: self.ids.clone(),
            catalog: self.catalog.clone(),
            templates: self.templates.clone(),
            start: self.start,
            owned: self.owned.clone(),
        }
        .with_clients(cp, cluster)
    }

    fn with_clients(mut self, cp: ControlPlane, cluster: TargetCluster) -> Suite {
        self.cross = CrossCluster::new(
            cp.clone(),
            cluster.clone(),
            self.start,
            self.config.environment.clone(),
        )
        .with_dns(self.config.dns.clone());
        self.resolver = DeploymentResolver::new(
            cp.clone(),
            DeploymentPlacement {
                tenant_id: self.ids.tenant_id.clone(),
                project_id: self.ids.project_id.clone(),
                deployment_target_id: self.ids.deployment_target_id.clone(),
                namespace_id: self.ids.namespace_id.clone(),
            },
            self.catalog.clone(),
            self.templates.clone(),
        );
        self.prometheus = self.config.prometheus_url.as_deref().map(PrometheusClient::new);
        self.cp = cp;
        self.cluster = cluster;
        self
    }

    pub fn prometheus(&self, t: &dyn Sink) -> PrometheusClient {
        t.require_some(self.prometheus.clone(), "PDS_PROMETHEUS_URL is configured")
    }

    /// Delete the suite templates and, when the suite created it, the test
    /// namespace.
    pub async fn teardown(&self) {
        self.owned.remove(&self.cp, &self.cluster).await;
        info!(prefix = %self.templates.prefix(), "Suite torn down");
    }

    pub fn owned(&self) -> &OwnedResources {
        &self.owned
    }

    /// Resolve and create a deployment; cleanup deletes it and its volumes.
    pub async fn must_deploy(&self, t: &TestCase, spec: &ShortDeploymentSpec) -> Deployment {
        let deployment = t.require_ok(self.resolver.deploy(spec).await, "create deployment");
        self.delete_deployment_on_cleanup(t, &deployment.id);
        deployment
    }

    /// Register deletion of a deployment the test did not create through
    /// [`must_deploy`](Self::must_deploy), e.g. one produced by a restore.
    pub fn delete_deployment_on_cleanup(&self, t: &TestCase, deployment_id: &str) {
        let cp = self.cp.clone();
        let cross = self.cross.clone();
        let id = deployment_id.to_string();
        t.cleanup(format!("delete deployment {id}"), async move {
            match cp.delete_deployment(&id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(deployment_id = %id, error = %e, "Cleanup: delete deployment");
                    return;
                }
            }
            let deadline = tokio::time::Instant::now() + STANDARD_TIMEOUT;
            while tokio::time::Instant::now() < deadline {
                if matches!(cp.get_deployment(&id).await, Err(e) if e.is_not_found()) {
                    break;
                }
                tokio::time::sleep(QUICK_POLL_PERIOD).await;
            }
            cross.remove_deployment_volumes(&id).await;
        });
    }

    /// [`must_deploy`](Self::must_deploy) followed by the health and
    /// readiness waits every scenario starts with.
    pub async fn must_deploy_healthy(&self, t: &TestCase, spec: &ShortDeploymentSpec) -> Deployment {
        let deployment = self.must_deploy(t, spec).await;
        self.cross.wait_for_deployment_healthy(t, &deployment.id).await;
        self.cross.wait_for_deployment_initialized(t, &deployment.id).await;
        self.cross.wait_for_statefulset_ready(t, &deployment.id).await;
        deployment
    }

    pub async fn must_create_backup_policy(
        &self,
        t: &TestCase,
        schedules: Vec<BackupSchedule>,
    ) -> BackupPolicy {
        let request = CreateBackupPolicyRequest {
            name: harness_name("backup-policy"),
            schedules,
        };
        let policy = t.require_ok(
            self.cp.create_backup_policy(&self.ids.tenant_id, &request).await,
            "create backup policy",
        );
        let cp = self.cp.clone();
        let id = policy.id.clone();
        t.cleanup(format!("delete backup policy {id}"), async move {
            warn_on_error(
                "delete backup policy",
                ignore_not_found(cp.delete_backup_policy(&id).await.map_err(Error::from)).map(drop),
            );
        });
        policy
    }

    /// S3 credentials from the configured backup target.
    pub fn s3_credentials(&self) -> CredentialsPayload {
        let target = &self.config.backup_target;
        CredentialsPayload {
            s3: Some(S3Credentials {
                endpoint: target.s3_endpoint.clone(),
                access_key: target.access_key.clone(),
                secret_key: target.secret_key.clone(),
            }),
            ..Default::default()
        }
    }

    pub async fn must_create_s3_backup_credentials(&self, t: &TestCase) -> BackupCredentials {
        t.require_true(
            self.config.backup_target.is_configured(),
            "backup bucket and S3 endpoint are configured",
        );
        let request = CreateBackupCredentialsRequest {
            name: harness_name("backup-creds"),
            credentials: self.s3_credentials(),
        };
        let credentials = t.require_ok(
            self.cp
                .create_backup_credentials(&self.ids.tenant_id, &request)
                .await,
            "create backup credentials",
        );
        let cp = self.cp.clone();
        let id = credentials.id.clone();
        t.cleanup(format!("delete backup credentials {id}"), async move {
            warn_on_error(
                "delete backup credentials",
                ignore_not_found(cp.delete_backup_credentials(&id).await.map_err(Error::from))
                    .map(drop),
            );
        });
        credentials
    }

    /// Create a backup target and wait for it to sync to the deployment
    /// target.
    pub async fn must_create_backup_target(&self, t: &TestCase, credentials_id: &str) -> BackupTarget {
        let request = CreateBackupTargetRequest {
            name: harness_name("backup-target"),
            backup_credentials_id: credentials_id.to_string(),
            bucket: self.config.backup_target.bucket.clone(),
            region: self.config.backup_target.region.clone(),
            type_: "s3".to_string(),
        };
        let target = t.require_ok(
            self.cp
                .create_backup_target(&self.ids.tenant_id, &request)
                .await,
            "create backup target",
        );
        let cp = self.cp.clone();
        let id = target.id.clone();
        t.cleanup(format!("delete backup target {id}"), async move {
            warn_on_error(
                "delete backup target",
                ignore_not_found(cp.delete_backup_target(&id).await.map_err(Error::from)).map(drop),
            );
        });
        self.cross
            .wait_for_backup_target_synced(t, &target.id, &self.ids.deployment_target_id)
            .await;
        target
    }

    pub async fn must_create_adhoc_backup(
        &self,
        t: &TestCase,
        deployment_id: &str,
        backup_target_id: &str,
    ) -> Backup {
        let backup = t.require_ok(
            self.cp
                .create_backup(deployment_id, &CreateBackupRequest::adhoc(backup_target_id))
                .await,
            "create backup",
        );
        let cp = self.cp.clone();
        let id = backup.id.clone();
        t.cleanup(format!("delete backup {id}"), async move {
            warn_on_error(
                "delete backup",
                ignore_not_found(cp.delete_backup(&id).await.map_err(Error::from)).map(drop),
            );
        });
        backup
    }

    pub async fn must_create_namespace(&self, t: &TestCase, options: &NamespaceOptions) {
        crate::cluster::namespace::must_create_namespace(t, &self.cluster, options).await;
    }

    /// Self-signed cert-manager ClusterIssuer, deleted on cleanup.
    pub async fn must_create_cluster_issuer(&self, t: &TestCase) -> String {
        let name = harness_name("issuer");
        let mut issuer = DynamicObject::new(&name, &cluster_issuer_resource());
        issuer.metadata = ObjectMeta {
            name: Some(name.clone()),
            labels: Some(BTreeMap::from([(
                ENVIRONMENT_LABEL.to_string(),
                self.config.environment.clone(),
            )])),
            ..Default::default()
        };
        issuer.data = json!({"spec": {"selfSigned": {}}});
        t.require_ok(
            self.cluster.create_cluster_issuer(&issuer).await,
            "create cluster issuer",
        );
        let cluster = self.cluster.clone();
        let cleanup_name = name.clone();
        t.cleanup(format!("delete cluster issuer {name}"), async move {
            warn_on_error(
                "delete cluster issuer",
                ignore_not_found(cluster.delete_cluster_issuer(&cleanup_name).await).map(drop),
            );
        });
        name
    }

    /// Set the TLS policy of the deployment target; cleanup restores the
    /// previous policy.
    pub async fn must_update_deployment_target_tls(
        &self,
        t: &TestCase,
        tls_required: bool,
        tls_issuer: Option<String>,
    ) {
        let id = self.ids.deployment_target_id.clone();
        let previous = t.require_ok(self.cp.get_deployment_target(&id).await, "get deployment target");
        t.require_ok(
            self.cp
                .update_deployment_target(
                    &id,
                    &UpdateDeploymentTargetRequest {
                        name: None,
                        tls_required: Some(tls_required),
                        tls_issuer,
                    },
                )
                .await,
            "update deployment target TLS",
        );
        let cp = self.cp.clone();
        t.cleanup(format!("restore TLS policy of deployment target {id}"), async move {
            let restore = UpdateDeploymentTargetRequest {
                name: None,
                tls_required: Some(previous.tls_required.unwrap_or(false)),
                tls_issuer: Some(previous.tls_issuer.unwrap_or_default()),
            };
            warn_on_error(
                "restore deployment target TLS",
                cp.update_deployment_target(&id, &restore).await.map(drop),
            );
        });
    }

    /// Wait until the deployment reports `Unavailable` on the Control Plane.
    pub async fn wait_for_deployment_unavailable(&self, t: &dyn Sink, deployment_id: &str) {
        eventually(t, LONG_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let status = t.require_ok(
                self.cp.get_deployment_status(deployment_id).await,
                "get deployment status",
            );
            t.require_true(
                status.is_unavailable(),
                &format!("deployment health is {:?}", status.health),
            );
        })
        .await;
    }
}

struct Slot<T> {
    value: Option<Arc<T>>,
    leases: usize,
}

/// A suite shared by the tests of one process.
///
/// The first [`acquire`](Self::acquire) runs setup. [`release`](Self::release)
/// hands the suite back to whoever returns the last outstanding lease, so it
/// can be torn down; a later `acquire` sets up a fresh one.
pub struct SharedSuite<T = Suite> {
    slot: tokio::sync::Mutex<Slot<T>>,
}

impl<T> SharedSuite<T> {
    pub const fn new() -> Self {
        Self {
            slot: tokio::sync::Mutex::const_new(Slot {
                value: None,
                leases: 0,
            }),
        }
    }

    /// Take a lease on the suite, running `init` when none is held.
    ///
    /// A panicking `init` takes no lease; the next caller retries setup.
    pub async fn acquire<F, Fut>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        let value = match &slot.value {
            Some(value) => value.clone(),
            None => {
                let value = Arc::new(init().await);
                slot.value = Some(value.clone());
                value
            }
        };
        slot.leases += 1;
        value
    }

    /// Return a lease. Yields the suite when this was the last lease.
    pub async fn release(&self) -> Option<Arc<T>> {
        let mut slot = self.slot.lock().await;
        slot.leases = slot.leases.saturating_sub(1);
        if slot.leases == 0 {
            slot.value.take()
        } else {
            None
        }
    }

    /// Number of outstanding leases.
    pub async fn leases(&self) -> usize {
        self.slot.lock().await.leases
    }
}

impl<T> Default for SharedSuite<T> {
    fn default() -> Self {
        Self::new()
    }
}
