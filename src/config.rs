//! Harness configuration, captured once from the environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::controlplane::{Credentials, OidcPasswordGrant};
use crate::error::{Error, Result};

/// Default value of the `pds/environment` label.
pub const DEFAULT_ENVIRONMENT: &str = "integration-test";

/// Default namespace of the Portworx installation.
pub const DEFAULT_PORTWORX_NAMESPACE: &str = "kube-system";

/// Object-store location used for backups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackupTargetConfig {
    pub bucket: String,
    pub region: String,
    pub s3_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

impl BackupTargetConfig {
    pub fn is_configured(&self) -> bool {
        !self.bucket.is_empty() && !self.s3_endpoint.is_empty()
    }
}

/// Location of the authoritative DNS server flushed before host checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsConfig {
    pub namespace: String,
    pub deployment: String,
    /// Label selector of the server pods, e.g. `app=external-dns-bind`.
    pub pod_selector: String,
}

/// One entry of `PDS_DATA_SERVICE_VERSIONS`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DataServiceVersions {
    pub name: String,
    /// Version tags to load; empty loads every tag.
    #[serde(default)]
    pub versions: Vec<String>,
}

/// Immutable harness configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub control_plane_api: String,
    pub credentials: Credentials,
    pub account_name: String,
    pub tenant_name: String,
    pub project_name: String,
    pub deployment_target_name: String,
    /// Test namespace; generated when `None`.
    pub test_namespace: Option<String>,
    /// Explicit kubeconfig; inferred when `None`.
    pub kubeconfig: Option<PathBuf>,
    pub prometheus_url: Option<String>,
    pub backup_target: BackupTargetConfig,
    pub latest_compatible_only: bool,
    pub skip_backups: bool,
    pub skip_backups_multinode: bool,
    pub data_service_versions: Vec<DataServiceVersions>,
    /// Value of the `pds/environment` label on everything the harness creates.
    pub environment: String,
    pub dns: Option<DnsConfig>,
    pub portworx_namespace: String,
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{key} must be set")))
        };
        let flag = |key: &str| -> Result<bool> {
            match get(key) {
                None => Ok(false),
                Some(value) => parse_bool(&value)
                    .ok_or_else(|| Error::Config(format!("{key}: invalid boolean {value:?}"))),
            }
        };

        let credentials = match (get("PDS_TOKEN"), get("PDS_ISSUER_URL")) {
            (Some(token), _) => Credentials::Token(token),
            (None, Some(issuer_url)) => Credentials::Password(OidcPasswordGrant {
                issuer_url,
                client_id: required("PDS_CLIENT_ID")?,
                client_secret: get("PDS_CLIENT_SECRET").unwrap_or_default(),
                username: required("PDS_USERNAME")?,
                password: required("PDS_PASSWORD")?,
            }),
            (None, None) => {
                return Err(Error::Config(
                    "either PDS_TOKEN or PDS_ISSUER_URL must be set".to_string(),
                ));
            }
        };

        let data_service_versions = match get("PDS_DATA_SERVICE_VERSIONS") {
            None => Vec::new(),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::Config(format!("PDS_DATA_SERVICE_VERSIONS: {e}"))
            })?,
        };

        let dns = match (get("PDS_DNS_NAMESPACE"), get("PDS_DNS_DEPLOYMENT")) {
            (Some(namespace), Some(deployment)) => Some(DnsConfig {
                pod_selector: get("PDS_DNS_POD_SELECTOR")
                    .unwrap_or_else(|| format!("app={deployment}")),
                namespace,
                deployment,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "PDS_DNS_NAMESPACE and PDS_DNS_DEPLOYMENT must be set together".to_string(),
                ));
            }
        };

        Ok(Self {
            control_plane_api: required("PDS_CONTROL_PLANE_API")?,
            credentials,
            account_name: required("PDS_ACCOUNT_NAME")?,
            tenant_name: required("PDS_TENANT_NAME")?,
            project_name: required("PDS_PROJECT_NAME")?,
            deployment_target_name: required("PDS_DEPLOYMENT_TARGET_NAME")?,
            test_namespace: get("PDS_TEST_NAMESPACE"),
            kubeconfig: get("KUBECONFIG").map(PathBuf::from),
            prometheus_url: get("PDS_PROMETHEUS_URL"),
            backup_target: BackupTargetConfig {
                bucket: get("PDS_BACKUP_BUCKET").unwrap_or_default(),
                region: get("PDS_BACKUP_REGION").unwrap_or_default(),
                s3_endpoint: get("PDS_S3_ENDPOINT").unwrap_or_default(),
                access_key: get("PDS_S3_ACCESS_KEY").unwrap_or_default(),
                secret_key: get("PDS_S3_SECRET_KEY").unwrap_or_default(),
            },
            latest_compatible_only: flag("PDS_LATEST_COMPATIBLE_ONLY")?,
            skip_backups: flag("PDS_SKIP_BACKUPS")?,
            skip_backups_multinode: flag("PDS_SKIP_BACKUPS_MULTINODE")?,
            data_service_versions,
            environment: get("PDS_ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            dns,
            portworx_namespace: get("PDS_PORTWORX_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_PORTWORX_NAMESPACE.to_string()),
        })
    }

    /// Version tags requested per data service name.
    pub fn versions_by_data_service(&self) -> BTreeMap<&str, &[String]> {
        self.data_service_versions
            .iter()
            .map(|entry| (entry.name.as_str(), entry.versions.as_slice()))
            .collect()
    }

    /// Whether backup scenarios should run for a deployment of `node_count`.
    pub fn backups_enabled(&self, node_count: i32) -> bool {
        !self.skip_backups && !(self.skip_backups_multinode && node_count > 1)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}
