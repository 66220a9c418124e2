//! Resource, application configuration and storage option templates, and
//! backup policies.

use super::models::{
    ApplicationConfigurationTemplate, BackupPolicy, CreateApplicationConfigurationTemplateRequest,
    CreateBackupPolicyRequest, CreateResourceSettingsTemplateRequest,
    CreateStorageOptionsTemplateRequest, ResourceSettingsTemplate, StorageOptionsTemplate,
};
use super::{ApiError, ControlPlane};

impl ControlPlane {
    pub async fn list_resource_settings_templates(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ResourceSettingsTemplate>, ApiError> {
        self.list(&format!("/tenants/{tenant_id}/resource-settings-templates"), &[])
            .await
    }

    pub async fn create_resource_settings_template(
        &self,
        tenant_id: &str,
        request: &CreateResourceSettingsTemplateRequest,
    ) -> Result<ResourceSettingsTemplate, ApiError> {
        self.post(
            &format!("/tenants/{tenant_id}/resource-settings-templates"),
            request,
        )
        .await
    }

    pub async fn delete_resource_settings_template(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/resource-settings-templates/{id}"))
            .await
    }

    pub async fn list_application_configuration_templates(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ApplicationConfigurationTemplate>, ApiError> {
        self.list(
            &format!("/tenants/{tenant_id}/application-configuration-templates"),
            &[],
        )
        .await
    }

    pub async fn create_application_configuration_template(
        &self,
        tenant_id: &str,
        request: &CreateApplicationConfigurationTemplateRequest,
    ) -> Result<ApplicationConfigurationTemplate, ApiError> {
        self.post(
            &format!("/tenants/{tenant_id}/application-configuration-templates"),
            request,
        )
        .await
    }

    pub async fn delete_application_configuration_template(
        &self,
        id: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!("/application-configuration-templates/{id}"))
            .await
    }

    pub async fn list_storage_options_templates(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<StorageOptionsTemplate>, ApiError> {
        self.list(&format!("/tenants/{tenant_id}/storage-options-templates"), &[])
            .await
    }

    pub async fn create_storage_options_template(
        &self,
        tenant_id: &str,
        request: &CreateStorageOptionsTemplateRequest,
    ) -> Result<StorageOptionsTemplate, ApiError> {
        self.post(
            &format!("/tenants/{tenant_id}/storage-options-templates"),
            request,
        )
        .await
    }

    pub async fn delete_storage_options_template(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/storage-options-templates/{id}"))
            .await
    }

    pub async fn list_backup_policies(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<BackupPolicy>, ApiError> {
        self.list(&format!("/tenants/{tenant_id}/backup-policies"), &[])
            .await
    }

    pub async fn create_backup_policy(
        &self,
        tenant_id: &str,
        request: &CreateBackupPolicyRequest,
    ) -> Result<BackupPolicy, ApiError> {
        self.post(&format!("/tenants/{tenant_id}/backup-policies"), request)
            .await
    }

    pub async fn delete_backup_policy(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/backup-policies/{id}")).await
    }
}
