//! Accounts, tenants, projects, deployment targets and namespaces.

use super::models::{
    Account, DeploymentTarget, DnsDetails, Namespace, Project, Tenant,
    UpdateDeploymentTargetRequest,
};
use super::{ApiError, ControlPlane};

impl ControlPlane {
    pub async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.list("/accounts", &[]).await
    }

    pub async fn list_tenants(&self, account_id: &str) -> Result<Vec<Tenant>, ApiError> {
        self.list(&format!("/accounts/{account_id}/tenants"), &[]).await
    }

    pub async fn list_projects(&self, tenant_id: &str) -> Result<Vec<Project>, ApiError> {
        self.list(&format!("/tenants/{tenant_id}/projects"), &[]).await
    }

    pub async fn list_deployment_targets(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<DeploymentTarget>, ApiError> {
        self.list(&format!("/tenants/{tenant_id}/deployment-targets"), &[])
            .await
    }

    pub async fn get_deployment_target(&self, id: &str) -> Result<DeploymentTarget, ApiError> {
        self.get(&format!("/deployment-targets/{id}")).await
    }

    pub async fn update_deployment_target(
        &self,
        id: &str,
        request: &UpdateDeploymentTargetRequest,
    ) -> Result<DeploymentTarget, ApiError> {
        self.put(&format!("/deployment-targets/{id}"), request).await
    }

    /// Namespaces the Control Plane knows on a deployment target, optionally
    /// filtered by exact name.
    pub async fn list_namespaces(
        &self,
        deployment_target_id: &str,
        name: Option<&str>,
    ) -> Result<Vec<Namespace>, ApiError> {
        let query: Vec<(&str, &str)> = name.map(|name| ("name", name)).into_iter().collect();
        let namespaces: Vec<Namespace> = self
            .list(
                &format!("/deployment-targets/{deployment_target_id}/namespaces"),
                &query,
            )
            .await?;
        Ok(match name {
            Some(name) => namespaces.into_iter().filter(|ns| ns.name == name).collect(),
            None => namespaces,
        })
    }

    pub async fn get_namespace(&self, id: &str) -> Result<Namespace, ApiError> {
        self.get(&format!("/namespaces/{id}")).await
    }

    pub async fn get_dns_details(&self, tenant_id: &str) -> Result<DnsDetails, ApiError> {
        self.get(&format!("/tenants/{tenant_id}/dns-details")).await
    }
}
