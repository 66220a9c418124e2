//! Target cluster client wrapper.
//!
//! Typed accessors over a `kube::Client` for the resources the harness reads
//! and writes. Errors propagate as [`crate::Error::Kube`]; callers branch on
//! [`crate::Error::is_not_found`].

mod custom;
pub mod jobs;
pub mod namespace;
pub mod portworx;

pub use custom::*;

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    Namespace, PersistentVolume, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::rbac::v1::ClusterRole;
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use kube::api::{Api, DeleteParams, ListParams, LogParams, Patch, PatchParams, PostParams, PropagationPolicy};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Field manager used for server-side writes.
pub const FIELD_MANAGER: &str = "pds-integration";

/// Label carrying the test environment on everything the harness creates.
pub const ENVIRONMENT_LABEL: &str = "pds/environment";

/// Label carrying the Control Plane deployment id on cluster resources.
pub const DEPLOYMENT_ID_LABEL: &str = "pds/deployment-id";

/// Label the PDS operators put on resources of one data-service instance.
pub const NAME_LABEL: &str = "name";

/// Annotation bumped to trigger a rollout restart.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Handle to the target cluster. Cheap to clone.
#[derive(Clone)]
pub struct TargetCluster {
    client: Client,
}

impl TargetCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig, or the inferred configuration
    /// (`KUBECONFIG`, `~/.kube/config`, in-cluster) when `path` is `None`.
    #[instrument(skip_all, fields(kubeconfig = ?path))]
    pub async fn connect(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::Config(format!("reading kubeconfig {}: {e}", path.display()))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| Error::Config(format!("loading kubeconfig: {e}")))?
            }
            None => Config::infer()
                .await
                .map_err(|e| Error::Config(format!("inferring kubeconfig: {e}")))?,
        };
        let client = Client::try_from(config)?;
        debug!("Connected to target cluster");
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn cluster_scoped<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::ClusterResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    // Namespaces

    pub async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        Ok(self.cluster_scoped::<Namespace>().get(name).await?)
    }

    pub async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace> {
        Ok(self
            .cluster_scoped::<Namespace>()
            .create(&PostParams::default(), namespace)
            .await?)
    }

    pub async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.cluster_scoped::<Namespace>()
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }

    pub async fn list_namespaces(&self, label_selector: &str) -> Result<Vec<Namespace>> {
        let lp = ListParams::default().labels(label_selector);
        Ok(self.cluster_scoped::<Namespace>().list(&lp).await?.items)
    }

    /// Set a namespace label, or remove it when `value` is `None`.
    pub async fn set_namespace_label(&self, name: &str, key: &str, value: Option<&str>) -> Result<()> {
        let patch = json!({"metadata": {"labels": {key: value}}});
        self.cluster_scoped::<Namespace>()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Replace `metadata.finalizers`. An empty list lets a deleted namespace
    /// proceed to its `spec.finalizers`.
    pub async fn set_namespace_finalizers(&self, name: &str, finalizers: &[&str]) -> Result<()> {
        let patch = json!({"metadata": {"finalizers": finalizers}});
        self.cluster_scoped::<Namespace>()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Clear `spec.finalizers` through the `finalize` subresource so a namespace
    /// stuck in `Terminating` can go away.
    pub async fn finalize_namespace(&self, name: &str) -> Result<()> {
        let api = self.cluster_scoped::<Namespace>();
        let mut namespace = api.get(name).await?;
        if let Some(spec) = namespace.spec.as_mut() {
            spec.finalizers = None;
        }
        let data = serde_json::to_vec(&namespace)?;
        api.replace_subresource("finalize", name, &PostParams::default(), data)
            .await?;
        Ok(())
    }

    // Workloads

    pub async fn get_statefulset(&self, namespace: &str, name: &str) -> Result<StatefulSet> {
        Ok(self.namespaced::<StatefulSet>(namespace).get(name).await?)
    }

    pub async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        Ok(self.namespaced::<Deployment>(namespace).get(name).await?)
    }

    /// Trigger a rollout restart of a Deployment.
    pub async fn restart_deployment(&self, namespace: &str, name: &str) -> Result<()> {
        let patch = json!({
            "spec": {"template": {"metadata": {"annotations": {
                RESTARTED_AT_ANNOTATION: jiff::Timestamp::now().to_string()
            }}}}
        });
        self.namespaced::<Deployment>(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    pub async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        Ok(self.namespaced::<Job>(namespace).get(name).await?)
    }

    pub async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job> {
        Ok(self
            .namespaced::<Job>(namespace)
            .create(&PostParams::default(), job)
            .await?)
    }

    /// Delete a Job together with its pods.
    pub async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        let dp = DeleteParams {
            propagation_policy: Some(PropagationPolicy::Background),
            ..Default::default()
        };
        self.namespaced::<Job>(namespace).delete(name, &dp).await?;
        Ok(())
    }

    pub async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let lp = ListParams::default().labels(label_selector);
        Ok(self.namespaced::<Pod>(namespace).list(&lp).await?.items)
    }

    /// Logs of one pod container, limited to the last `since_seconds` when set.
    pub async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        since_seconds: Option<i64>,
    ) -> Result<String> {
        let params = LogParams {
            container: container.map(str::to_string),
            since_seconds,
            ..Default::default()
        };
        Ok(self.namespaced::<Pod>(namespace).logs(pod, &params).await?)
    }

    /// Concatenated logs of every pod matching `label_selector`, each section
    /// headed by the pod name.
    pub async fn collect_logs(
        &self,
        namespace: &str,
        label_selector: &str,
        since_seconds: Option<i64>,
    ) -> Result<String> {
        let mut out = String::new();
        for pod in self.list_pods(namespace, label_selector).await? {
            let Some(name) = pod.metadata.name else {
                continue;
            };
            let logs = self.pod_logs(namespace, &name, None, since_seconds).await?;
            out.push_str(&format!("--- pod {name} ---\n{logs}\n"));
        }
        Ok(out)
    }

    // Storage

    pub async fn list_persistent_volumes(
        &self,
        label_selector: &str,
    ) -> Result<Vec<PersistentVolume>> {
        let lp = ListParams::default().labels(label_selector);
        Ok(self.cluster_scoped::<PersistentVolume>().list(&lp).await?.items)
    }

    pub async fn delete_persistent_volume(&self, name: &str) -> Result<()> {
        self.cluster_scoped::<PersistentVolume>()
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    pub async fn delete_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<()> {
        self.namespaced::<PersistentVolumeClaim>(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    pub async fn list_storage_classes(&self) -> Result<Vec<StorageClass>> {
        Ok(self
            .cluster_scoped::<StorageClass>()
            .list(&ListParams::default())
            .await?
            .items)
    }

    pub async fn list_csi_drivers(&self) -> Result<Vec<CSIDriver>> {
        Ok(self
            .cluster_scoped::<CSIDriver>()
            .list(&ListParams::default())
            .await?
            .items)
    }

    // Configuration and networking

    pub async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        Ok(self.namespaced::<Secret>(namespace).get(name).await?)
    }

    /// Decoded value of one secret key.
    pub async fn secret_value(&self, namespace: &str, name: &str, key: &str) -> Result<String> {
        let secret = self.get_secret(namespace, name).await?;
        secret_string(&secret.data.unwrap_or_default(), key)
            .ok_or_else(|| Error::MissingField(format!("secret {namespace}/{name} key {key}")))
    }

    pub async fn list_services(&self, namespace: &str, label_selector: &str) -> Result<Vec<Service>> {
        let lp = ListParams::default().labels(label_selector);
        Ok(self.namespaced::<Service>(namespace).list(&lp).await?.items)
    }

    // RBAC

    pub async fn list_cluster_roles(&self, label_selector: &str) -> Result<Vec<ClusterRole>> {
        let lp = ListParams::default().labels(label_selector);
        Ok(self.cluster_scoped::<ClusterRole>().list(&lp).await?.items)
    }

    pub async fn delete_cluster_role(&self, name: &str) -> Result<()> {
        self.cluster_scoped::<ClusterRole>()
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

fn secret_string(
    data: &BTreeMap<String, k8s_openapi::ByteString>,
    key: &str,
) -> Option<String> {
    data.get(key)
        .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
}

/// `key=value` label selector.
pub fn label_selector(key: &str, value: &str) -> String {
    format!("{key}={value}")
}

/// Map `NotFound` to `Ok(None)`.
pub fn ignore_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
