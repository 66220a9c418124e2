//! Backup and restore convergence.

use std::collections::BTreeMap;

use kube::api::ObjectMeta;
use tracing::info;

use super::CrossCluster;
use crate::cluster::ENVIRONMENT_LABEL;
use crate::crd::{Backup, BackupOutcome, Restore, RestoreSpec};
use crate::sink::{Sink, SinkExt};
use crate::timing::{DEFAULT_POLL_PERIOD, LONG_TIMEOUT, STANDARD_TIMEOUT};
use crate::wait::eventually;

/// Label the backup operator puts on backup job pods.
pub const BACKUP_NAME_LABEL: &str = "pds/backup-name";

impl CrossCluster {
    /// Wait for the Backup of a deployment to finish and fail the test unless
    /// it succeeded. A failure report carries the backup job pod logs.
    pub async fn ensure_backup_successful(&self, t: &dyn Sink, deployment_id: &str, backup_name: &str) {
        let location = self.must_locate(t, deployment_id).await;
        let namespace = location.namespace.as_str();

        let mut outcome = None;
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let backup = t.require_ok(
                self.cluster.get_backup(namespace, backup_name).await,
                &format!("get backup {backup_name}"),
            );
            outcome = backup.outcome();
            t.require_true(outcome.is_some(), &format!("backup {backup_name} finished"));
        })
        .await;

        if outcome == Some(BackupOutcome::Failed) {
            let selector = format!("{BACKUP_NAME_LABEL}={backup_name}");
            let mut report = format!("backup {backup_name} failed");
            if let Ok(jobs) = self.cluster.list_backup_jobs(namespace, &selector).await {
                for job in jobs.iter().filter_map(|j| j.status.as_ref()) {
                    if !job.error_code.is_empty() {
                        report.push_str(&format!("\n{}: {}", job.error_code, job.error_message));
                    }
                }
            }
            match self
                .cluster
                .collect_logs(namespace, &selector, Some(self.logs_since_seconds()))
                .await
            {
                Ok(logs) => report.push_str(&format!("\nbackup job logs:\n{logs}")),
                Err(e) => report.push_str(&format!("\ncollecting backup job logs: {e}")),
            }
            t.fatal(&report);
        }
        info!(backup = %backup_name, "Backup succeeded");
    }

    /// Create a Restore from the succeeded snapshot of `backup_name`.
    pub async fn must_create_restore(
        &self,
        t: &dyn Sink,
        namespace: &str,
        backup_name: &str,
        restore_name: &str,
    ) -> Restore {
        let backup: Backup = t.require_ok(
            self.cluster.get_backup(namespace, backup_name).await,
            &format!("get backup {backup_name}"),
        );
        let spec = t.require_some(
            RestoreSpec::from_backup(&backup),
            &format!("succeeded snapshot and cloud credential of backup {backup_name}"),
        );
        self.must_create_restore_from(t, namespace, restore_name, spec)
            .await
    }

    /// Create a Restore with an explicit spec.
    pub async fn must_create_restore_from(
        &self,
        t: &dyn Sink,
        namespace: &str,
        restore_name: &str,
        spec: RestoreSpec,
    ) -> Restore {
        let mut restore = Restore::new(restore_name, spec);
        restore.metadata = ObjectMeta {
            name: Some(restore_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                ENVIRONMENT_LABEL.to_string(),
                self.environment.clone(),
            )])),
            ..Default::default()
        };
        let created = t.require_ok(
            self.cluster.create_restore(namespace, &restore).await,
            &format!("create restore {restore_name}"),
        );
        info!(restore = %restore_name, namespace, "Created restore");
        created
    }

    /// Wait until the Restore is `Successful` or `Failed` and return it.
    pub async fn wait_for_restore_completion(
        &self,
        t: &dyn Sink,
        namespace: &str,
        restore_name: &str,
    ) -> Restore {
        let mut completed = None;
        eventually(t, LONG_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let restore = t.require_ok(
                self.cluster.get_restore(namespace, restore_name).await,
                &format!("get restore {restore_name}"),
            );
            t.require_true(
                restore.is_complete(),
                &format!(
                    "restore {restore_name} completion status {:?}",
                    restore.completion_status()
                ),
            );
            completed = Some(restore);
        })
        .await;
        t.require_some(completed, &format!("completed restore {restore_name}"))
    }

    pub async fn must_ensure_restore_successful(&self, t: &dyn Sink, namespace: &str, restore_name: &str) {
        let restore = self.wait_for_restore_completion(t, namespace, restore_name).await;
        let (code, message) = restore
            .status
            .as_ref()
            .map(|s| (s.error_code.as_str(), s.error_message.as_str()))
            .unwrap_or_default();
        t.require_true(
            restore.is_successful(),
            &format!("restore {restore_name} failed: {code}: {message}"),
        );
    }
}
