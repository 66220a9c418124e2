//! Request and response bodies of the Control Plane API.
//!
//! Response types default every field so that additive API changes never break
//! decoding. Request types skip unset optional fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Envelope of every list endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub account_id: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
}

/// Control Plane handle of a target cluster.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentTarget {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
    pub cluster_id: String,
    pub status: String,
    pub tls_required: Option<bool>,
    pub tls_issuer: Option<String>,
    /// Capability name (a data service, `backup`, `restore`, `crdReporting`,
    /// `eventReporting`, `dataServiceTls`, …) to reported version.
    pub capabilities: BTreeMap<String, String>,
}

impl DeploymentTarget {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains_key(capability)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateDeploymentTargetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_issuer: Option<String>,
}

/// Namespace of a target cluster as reflected on the Control Plane.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    pub deployment_target_id: String,
    pub status: String,
}

impl Namespace {
    pub fn is_available(&self) -> bool {
        self.status.eq_ignore_ascii_case("available")
    }
}

/// Data service entry of the catalog.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogDataService {
    pub id: String,
    pub name: String,
    pub short_name: String,
}

/// Deployable image of a data service version.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub data_service_id: String,
    pub version_id: String,
    pub tag: String,
    pub build: String,
    pub created_at: Option<jiff::Timestamp>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourceSettingsTemplate {
    pub id: String,
    pub name: String,
    pub data_service_id: String,
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
    pub storage_request: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateResourceSettingsTemplateRequest {
    pub name: String,
    pub data_service_id: String,
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
    pub storage_request: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
    pub deploy_time: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationConfigurationTemplate {
    pub id: String,
    pub name: String,
    pub data_service_id: String,
    pub config_items: Vec<ConfigItem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateApplicationConfigurationTemplateRequest {
    pub name: String,
    pub data_service_id: String,
    pub config_items: Vec<ConfigItem>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageOptionsTemplate {
    pub id: String,
    pub name: String,
    pub repl: i32,
    pub fs: String,
    pub secure: bool,
    pub provisioner: String,
    pub fg: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateStorageOptionsTemplateRequest {
    pub name: String,
    pub repl: i32,
    pub fs: String,
    pub secure: bool,
    pub provisioner: String,
    pub fg: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupSchedule {
    pub schedule: String,
    pub retention_count: i32,
    #[serde(rename = "type")]
    pub type_: String,
}

impl BackupSchedule {
    /// A full backup on `schedule` (cron syntax) keeping `retention_count` runs.
    pub fn full(schedule: impl Into<String>, retention_count: i32) -> Self {
        Self {
            schedule: schedule.into(),
            retention_count,
            type_: "full".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupPolicy {
    pub id: String,
    pub name: String,
    pub schedules: Vec<BackupSchedule>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateBackupPolicyRequest {
    pub name: String,
    pub schedules: Vec<BackupSchedule>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupCredentials {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Credentials {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureCredentials {
    pub account_name: String,
    pub account_key: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleCredentials {
    pub project_id: String,
    pub json_key: String,
}

/// Object-store credential set. Exactly one member is expected to be set.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Credentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_compatible: Option<S3Credentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleCredentials>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateBackupCredentialsRequest {
    pub name: String,
    pub credentials: CredentialsPayload,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateBackupCredentialsRequest {
    pub name: String,
    pub credentials: CredentialsPayload,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupTarget {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
    pub backup_credentials_id: String,
    pub bucket: String,
    pub region: String,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateBackupTargetRequest {
    pub name: String,
    pub backup_credentials_id: String,
    pub bucket: String,
    pub region: String,
    #[serde(rename = "type")]
    pub type_: String,
}

/// Sync state of a backup target on one deployment target.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupTargetState {
    pub backup_target_id: String,
    pub deployment_target_id: String,
    pub state: String,
    pub error_code: String,
    pub error_message: String,
    /// Name of the credential generated on the cluster for this target.
    pub px_credentials_name: String,
}

impl BackupTargetState {
    pub fn is_successful(&self) -> bool {
        self.state.eq_ignore_ascii_case("successful")
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsDetails {
    pub dns_zone: String,
}

/// A running data-service instance.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    /// Name of the Kubernetes resources realizing this deployment.
    pub cluster_resource_name: String,
    pub namespace_id: String,
    pub deployment_target_id: String,
    pub project_id: String,
    pub data_service_id: String,
    pub image_id: String,
    pub node_count: i32,
    pub service_type: String,
    pub resource_settings_template_id: String,
    pub application_configuration_template_id: String,
    pub storage_options_template_id: String,
    pub dns_zone: String,
    pub tls_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ScheduledBackup {
    pub backup_policy_id: String,
    pub backup_target_id: String,
}

/// Fully resolved body of `POST /projects/{id}/deployments`.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct CreateDeploymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    pub image_id: String,
    pub application_configuration_template_id: String,
    pub resource_settings_template_id: String,
    pub storage_options_template_id: String,
    pub deployment_target_id: String,
    pub namespace_id: String,
    pub node_count: i32,
    pub service_type: String,
    pub dns_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_backup: Option<ScheduledBackup>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UpdateDeploymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_settings_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_configuration_template_id: Option<String>,
}

/// Health as reported by the deployment's manifest on the Control Plane.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentStatus {
    pub health: String,
    pub replicas: Option<i32>,
    pub ready_replicas: Option<i32>,
}

impl DeploymentStatus {
    pub fn is_healthy(&self) -> bool {
        self.health.eq_ignore_ascii_case("healthy")
    }

    pub fn is_unavailable(&self) -> bool {
        self.health.eq_ignore_ascii_case("unavailable")
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Backup {
    pub id: String,
    pub deployment_id: String,
    pub backup_target_id: String,
    pub cluster_resource_name: String,
    pub backup_type: String,
    pub backup_level: String,
    pub job_history_limit: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateBackupRequest {
    pub backup_level: String,
    pub backup_target_id: String,
    pub backup_type: String,
    pub job_history_limit: i32,
}

impl CreateBackupRequest {
    /// One-off snapshot backup to `backup_target_id`.
    pub fn adhoc(backup_target_id: impl Into<String>) -> Self {
        Self {
            backup_level: "snapshot".to_string(),
            backup_target_id: backup_target_id.into(),
            backup_type: "adhoc".to_string(),
            job_history_limit: 1,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackupJob {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Restore {
    pub id: String,
    pub name: String,
    pub cluster_resource_name: String,
    pub deployment_id: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateRestoreRequest {
    pub name: String,
    pub namespace_id: String,
    pub deployment_target_id: String,
}
