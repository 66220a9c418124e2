//! Backup credentials, backup targets, backups and restores.

use super::models::{
    Backup, BackupCredentials, BackupJob, BackupTarget, BackupTargetState,
    CreateBackupCredentialsRequest, CreateBackupRequest, CreateBackupTargetRequest,
    CreateRestoreRequest, Restore, UpdateBackupCredentialsRequest,
};
use super::{ApiError, ControlPlane};

impl ControlPlane {
    pub async fn create_backup_credentials(
        &self,
        tenant_id: &str,
        request: &CreateBackupCredentialsRequest,
    ) -> Result<BackupCredentials, ApiError> {
        self.post(&format!("/tenants/{tenant_id}/backup-credentials"), request)
            .await
    }

    pub async fn get_backup_credentials(&self, id: &str) -> Result<BackupCredentials, ApiError> {
        self.get(&format!("/backup-credentials/{id}")).await
    }

    pub async fn update_backup_credentials(
        &self,
        id: &str,
        request: &UpdateBackupCredentialsRequest,
    ) -> Result<BackupCredentials, ApiError> {
        self.put(&format!("/backup-credentials/{id}"), request).await
    }

    pub async fn delete_backup_credentials(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/backup-credentials/{id}")).await
    }

    pub async fn create_backup_target(
        &self,
        tenant_id: &str,
        request: &CreateBackupTargetRequest,
    ) -> Result<BackupTarget, ApiError> {
        self.post(&format!("/tenants/{tenant_id}/backup-targets"), request)
            .await
    }

    pub async fn get_backup_target(&self, id: &str) -> Result<BackupTarget, ApiError> {
        self.get(&format!("/backup-targets/{id}")).await
    }

    pub async fn delete_backup_target(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/backup-targets/{id}")).await
    }

    /// Per-deployment-target sync states of a backup target.
    pub async fn list_backup_target_states(
        &self,
        backup_target_id: &str,
    ) -> Result<Vec<BackupTargetState>, ApiError> {
        self.list(&format!("/backup-targets/{backup_target_id}/states"), &[])
            .await
    }

    pub async fn create_backup(
        &self,
        deployment_id: &str,
        request: &CreateBackupRequest,
    ) -> Result<Backup, ApiError> {
        self.post(&format!("/deployments/{deployment_id}/backups"), request)
            .await
    }

    pub async fn list_backups(&self, deployment_id: &str) -> Result<Vec<Backup>, ApiError> {
        self.list(&format!("/deployments/{deployment_id}/backups"), &[])
            .await
    }

    pub async fn get_backup(&self, id: &str) -> Result<Backup, ApiError> {
        self.get(&format!("/backups/{id}")).await
    }

    pub async fn delete_backup(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/backups/{id}")).await
    }

    pub async fn list_backup_jobs(&self, backup_id: &str) -> Result<Vec<BackupJob>, ApiError> {
        self.list(&format!("/backups/{backup_id}/jobs"), &[]).await
    }

    pub async fn create_restore(
        &self,
        backup_job_id: &str,
        request: &CreateRestoreRequest,
    ) -> Result<Restore, ApiError> {
        self.post(&format!("/backup-jobs/{backup_job_id}/restores"), request)
            .await
    }

    pub async fn get_restore(&self, id: &str) -> Result<Restore, ApiError> {
        self.get(&format!("/restores/{id}")).await
    }
}
