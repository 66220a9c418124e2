//! Deployments.

use super::models::{
    CreateDeploymentRequest, Deployment, DeploymentStatus, UpdateDeploymentRequest,
};
use super::{ApiError, ControlPlane};

impl ControlPlane {
    pub async fn create_deployment(
        &self,
        project_id: &str,
        request: &CreateDeploymentRequest,
    ) -> Result<Deployment, ApiError> {
        self.post(&format!("/projects/{project_id}/deployments"), request)
            .await
    }

    pub async fn list_deployments(&self, project_id: &str) -> Result<Vec<Deployment>, ApiError> {
        self.list(&format!("/projects/{project_id}/deployments"), &[])
            .await
    }

    pub async fn get_deployment(&self, id: &str) -> Result<Deployment, ApiError> {
        self.get(&format!("/deployments/{id}")).await
    }

    pub async fn update_deployment(
        &self,
        id: &str,
        request: &UpdateDeploymentRequest,
    ) -> Result<Deployment, ApiError> {
        self.put(&format!("/deployments/{id}"), request).await
    }

    pub async fn delete_deployment(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/deployments/{id}")).await
    }

    pub async fn get_deployment_status(&self, id: &str) -> Result<DeploymentStatus, ApiError> {
        self.get(&format!("/deployments/{id}/status")).await
    }
}
