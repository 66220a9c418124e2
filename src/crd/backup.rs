//! Backup and BackupJob resources.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A backup of one data-service deployment, created by the Control Plane.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "backups.pds.io",
    version = "v1",
    kind = "Backup",
    plural = "backups",
    status = "BackupStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// `adhoc` or `scheduled`.
    #[serde(default)]
    pub backup_type: String,

    /// Name of the Portworx cloud credential the snapshots are uploaded with.
    #[serde(default)]
    pub cloud_credential_name: String,

    /// Data-service resource being backed up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_service_ref: Option<DataServiceRef>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataServiceRef {
    pub kind: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    /// Number of succeeded backup jobs.
    #[serde(default)]
    pub succeeded: i32,

    /// Number of failed backup jobs.
    #[serde(default)]
    pub failed: i32,

    #[serde(default)]
    pub backup_jobs: Vec<BackupJobRecord>,
}

/// Summary of one backup job run, kept on the Backup.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupJobRecord {
    pub name: String,
    /// `Succeeded`, `Failed` or empty while running.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub cloud_snap_id: String,
}

impl BackupJobRecord {
    pub fn is_succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case("succeeded")
    }
}

impl Backup {
    /// Terminal outcome, if any job has finished.
    pub fn outcome(&self) -> Option<BackupOutcome> {
        let status = self.status.as_ref()?;
        if status.succeeded > 0 {
            Some(BackupOutcome::Succeeded)
        } else if status.failed > 0 {
            Some(BackupOutcome::Failed)
        } else {
            None
        }
    }

    /// Snapshot id of the first succeeded job.
    pub fn succeeded_snapshot_id(&self) -> Option<&str> {
        self.status
            .as_ref()?
            .backup_jobs
            .iter()
            .find(|job| job.is_succeeded() && !job.cloud_snap_id.is_empty())
            .map(|job| job.cloud_snap_id.as_str())
    }
}

/// Terminal state of a backup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackupOutcome {
    Succeeded,
    Failed,
}

/// One execution of a Backup.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "backups.pds.io",
    version = "v1",
    kind = "BackupJob",
    plural = "backupjobs",
    status = "BackupJobStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BackupJobSpec {
    /// Name of the owning Backup.
    #[serde(default)]
    pub backup_name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupJobStatus {
    #[serde(default)]
    pub completion_status: String,
    #[serde(default)]
    pub cloud_snap_id: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}
