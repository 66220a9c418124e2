//! Custom resources on the target cluster.
//!
//! Data-service resources and third-party resources (cert-manager, Portworx)
//! are handled as `DynamicObject`s; PDS backup resources use the typed
//! definitions in [`crate::crd`].

use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams, PostParams};

use super::TargetCluster;
use crate::crd::{Backup, BackupJob, DNSEndpoint, Restore};
use crate::dataservice::{DEPLOYMENTS_GROUP, DEPLOYMENTS_VERSION, DataService};
use crate::error::Result;

/// `ApiResource` of a data service's custom resource.
pub fn data_service_resource(data_service: DataService) -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(DEPLOYMENTS_GROUP, DEPLOYMENTS_VERSION, data_service.kind()),
        data_service.plural(),
    )
}

/// cert-manager `ClusterIssuer`.
pub fn cluster_issuer_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("cert-manager.io", "v1", "ClusterIssuer"),
        "clusterissuers",
    )
}

/// Portworx `StorageCluster`.
pub fn storage_cluster_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("core.libopenstorage.org", "v1", "StorageCluster"),
        "storageclusters",
    )
}

/// Portworx `StorageNode`.
pub fn storage_node_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("core.libopenstorage.org", "v1", "StorageNode"),
        "storagenodes",
    )
}

impl TargetCluster {
    // Data services

    pub async fn get_data_service_resource(
        &self,
        data_service: DataService,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject> {
        let ar = data_service_resource(data_service);
        let api: Api<DynamicObject> = Api::namespaced_with(self.client().clone(), namespace, &ar);
        Ok(api.get(name).await?)
    }

    pub async fn delete_data_service_resource(
        &self,
        data_service: DataService,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let ar = data_service_resource(data_service);
        let api: Api<DynamicObject> = Api::namespaced_with(self.client().clone(), namespace, &ar);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    // Backups

    pub async fn get_backup(&self, namespace: &str, name: &str) -> Result<Backup> {
        let api: Api<Backup> = Api::namespaced(self.client().clone(), namespace);
        Ok(api.get(name).await?)
    }

    pub async fn list_backup_jobs(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<BackupJob>> {
        let api: Api<BackupJob> = Api::namespaced(self.client().clone(), namespace);
        let lp = ListParams::default().labels(label_selector);
        Ok(api.list(&lp).await?.items)
    }

    pub async fn create_restore(&self, namespace: &str, restore: &Restore) -> Result<Restore> {
        let api: Api<Restore> = Api::namespaced(self.client().clone(), namespace);
        Ok(api.create(&PostParams::default(), restore).await?)
    }

    pub async fn get_restore(&self, namespace: &str, name: &str) -> Result<Restore> {
        let api: Api<Restore> = Api::namespaced(self.client().clone(), namespace);
        Ok(api.get(name).await?)
    }

    pub async fn delete_restore(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Restore> = Api::namespaced(self.client().clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    pub async fn list_dns_endpoints(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<DNSEndpoint>> {
        let api: Api<DNSEndpoint> = Api::namespaced(self.client().clone(), namespace);
        let lp = ListParams::default().labels(label_selector);
        Ok(api.list(&lp).await?.items)
    }

    // cert-manager

    pub async fn create_cluster_issuer(&self, issuer: &DynamicObject) -> Result<DynamicObject> {
        let api: Api<DynamicObject> = Api::all_with(self.client().clone(), &cluster_issuer_resource());
        Ok(api.create(&PostParams::default(), issuer).await?)
    }

    pub async fn list_cluster_issuers(&self, label_selector: &str) -> Result<Vec<DynamicObject>> {
        let api: Api<DynamicObject> = Api::all_with(self.client().clone(), &cluster_issuer_resource());
        let lp = ListParams::default().labels(label_selector);
        Ok(api.list(&lp).await?.items)
    }

    pub async fn delete_cluster_issuer(&self, name: &str) -> Result<()> {
        let api: Api<DynamicObject> = Api::all_with(self.client().clone(), &cluster_issuer_resource());
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    // Portworx

    pub async fn list_storage_clusters(&self, namespace: &str) -> Result<Vec<DynamicObject>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client().clone(), namespace, &storage_cluster_resource());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    pub async fn patch_storage_cluster(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<DynamicObject> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client().clone(), namespace, &storage_cluster_resource());
        Ok(api
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }

    pub async fn list_storage_nodes(&self, namespace: &str) -> Result<Vec<DynamicObject>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client().clone(), namespace, &storage_node_resource());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}
