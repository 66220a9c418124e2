//! Restore resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Backup;

/// Restores a data service from a cloud snapshot into a new deployment.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "backups.pds.io",
    version = "v1",
    kind = "Restore",
    plural = "restores",
    status = "RestoreStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSpec {
    /// Portworx cloud credential used to download the snapshot.
    pub cloud_credential_name: String,
    pub cloud_snap_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStatus {
    /// `Successful`, `Failed`, or empty while in progress.
    #[serde(default)]
    pub completion_status: String,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
}

/// Error code reported when the cloud credential of a restore is missing.
pub const ERROR_CODE_CLOUD_CREDENTIALS_NOT_FOUND: &str = "PXCloudCredentialsNotFound";

impl Restore {
    pub fn completion_status(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.completion_status.as_str())
            .unwrap_or_default()
    }

    /// Whether the restore reached `Successful` or `Failed`.
    pub fn is_complete(&self) -> bool {
        matches!(self.completion_status(), "Successful" | "Failed")
    }

    pub fn is_successful(&self) -> bool {
        self.completion_status() == "Successful"
    }
}

impl RestoreSpec {
    /// Restore the first succeeded snapshot of `backup` with the backup's own
    /// cloud credential. `None` until such a snapshot exists.
    pub fn from_backup(backup: &Backup) -> Option<RestoreSpec> {
        let cloud_snap_id = backup.succeeded_snapshot_id()?;
        if backup.spec.cloud_credential_name.is_empty() {
            return None;
        }
        Some(RestoreSpec {
            cloud_credential_name: backup.spec.cloud_credential_name.clone(),
            cloud_snap_id: cloud_snap_id.to_string(),
        })
    }
}
