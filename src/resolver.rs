//! Deployment spec resolver.
//!
//! Turns a [`ShortDeploymentSpec`] (names and a version tag) into a fully
//! qualified [`CreateDeploymentRequest`] by looking up the image catalog and
//! the tenant's templates, then submits it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use jiff::Timestamp;
use tracing::{debug, info, instrument};

use crate::config::DataServiceVersions;
use crate::controlplane::ControlPlane;
use crate::controlplane::models::{
    CatalogDataService, CreateDeploymentRequest, Deployment, Image, ScheduledBackup,
};
use crate::dataservice::DataService;
use crate::error::{Error, Result};

/// Service type used when a spec does not name one.
pub const DEFAULT_SERVICE_TYPE: &str = "ClusterIP";

/// Short name of the suite's storage options template.
pub const STORAGE_OPTION_DEFAULT: &str = "default";
/// Short name of the small resource settings template.
pub const RESOURCE_SETTINGS_SMALL: &str = "small";
/// Short name of a resource settings template no node can satisfy.
pub const RESOURCE_SETTINGS_ENORMOUS: &str = "enormous";
/// Short name of the suite's application configuration template.
pub const APP_CONFIG_DEFAULT: &str = "default";

/// One deployable image of the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageReference {
    pub data_service_name: String,
    pub data_service_id: String,
    pub version_id: String,
    pub version_tag: String,
    pub version_build: String,
    pub image_id: String,
    pub created_at: Option<Timestamp>,
}

impl ImageReference {
    pub fn from_catalog(data_service: &CatalogDataService, image: &Image) -> Self {
        Self {
            data_service_name: data_service.name.clone(),
            data_service_id: data_service.id.clone(),
            version_id: image.version_id.clone(),
            version_tag: image.tag.clone(),
            version_build: image.build.clone(),
            image_id: image.id.clone(),
            created_at: image.created_at,
        }
    }

    pub fn data_service(&self) -> Option<DataService> {
        DataService::from_name(&self.data_service_name)
    }
}

/// Images available to the suite, loaded once at start-up.
#[derive(Clone, Debug, Default)]
pub struct ImageCatalog {
    images: Vec<ImageReference>,
}

impl ImageCatalog {
    pub fn new(images: Vec<ImageReference>) -> Self {
        Self { images }
    }

    /// Load the images of the requested data services and versions.
    ///
    /// An empty `requested` list loads every catalog data service the harness
    /// knows; an entry with no versions loads every tag of that service.
    #[instrument(skip_all, fields(latest_compatible_only))]
    pub async fn load(
        cp: &ControlPlane,
        requested: &[DataServiceVersions],
        latest_compatible_only: bool,
    ) -> Result<Self> {
        let catalog = cp.list_data_services().await?;
        let wanted: Vec<(CatalogDataService, &[String])> = if requested.is_empty() {
            catalog
                .into_iter()
                .filter(|ds| DataService::from_name(&ds.name).is_some())
                .map(|ds| (ds, &[][..]))
                .collect()
        } else {
            requested
                .iter()
                .map(|entry| {
                    catalog
                        .iter()
                        .find(|ds| ds.name.eq_ignore_ascii_case(&entry.name))
                        .cloned()
                        .map(|ds| (ds, entry.versions.as_slice()))
                        .ok_or_else(|| Error::UnknownDataService(entry.name.clone()))
                })
                .collect::<Result<_>>()?
        };

        let mut images = Vec::new();
        for (data_service, versions) in wanted {
            let found = cp.list_images(&data_service.id, latest_compatible_only).await?;
            let before = images.len();
            images.extend(
                found
                    .iter()
                    .filter(|image| versions.is_empty() || versions.contains(&image.tag))
                    .map(|image| ImageReference::from_catalog(&data_service, image)),
            );
            debug!(
                data_service = %data_service.name,
                images = images.len() - before,
                "Loaded images"
            );
        }
        info!(images = images.len(), "Image catalog loaded");
        Ok(Self { images })
    }

    pub fn images(&self) -> &[ImageReference] {
        &self.images
    }

    /// Names of the data services present in the catalog.
    pub fn data_service_names(&self) -> BTreeSet<&str> {
        self.images
            .iter()
            .map(|image| image.data_service_name.as_str())
            .collect()
    }

    pub fn by_image_id(&self, image_id: &str) -> Option<&ImageReference> {
        self.images.iter().find(|image| image.image_id == image_id)
    }

    /// The single image matching name, tag and (optionally) build.
    pub fn find(
        &self,
        data_service_name: &str,
        tag: &str,
        build: Option<&str>,
    ) -> Result<&ImageReference> {
        let matches: Vec<&ImageReference> = self
            .images
            .iter()
            .filter(|image| {
                image.data_service_name.eq_ignore_ascii_case(data_service_name)
                    && image.version_tag == tag
                    && build.is_none_or(|build| image.version_build == build)
            })
            .collect();
        match matches.as_slice() {
            [image] => Ok(image),
            [] => Err(Error::ImageNotFound {
                data_service: data_service_name.to_string(),
                tag: tag.to_string(),
                build: build.map(|b| format!(" build {b}")).unwrap_or_default(),
            }),
            many => Err(Error::AmbiguousImage {
                data_service: data_service_name.to_string(),
                tag: tag.to_string(),
                count: many.len(),
            }),
        }
    }
}

/// Short description of a deployment.
///
/// Empty template names select the suite defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShortDeploymentSpec {
    pub data_service_name: String,
    pub image_version_tag: String,
    pub image_version_build: Option<String>,
    pub node_count: i32,
    pub app_config_template_name: String,
    pub resource_settings_template_name: String,
    pub storage_option_name: String,
    pub backup_policy_name: String,
    /// Target of the scheduled backups; required with a backup policy.
    pub backup_target_id: Option<String>,
    pub service_type: String,
    pub name_prefix: String,
    pub tls_enabled: bool,
}

impl ShortDeploymentSpec {
    pub fn new(data_service: DataService, tag: impl Into<String>, node_count: i32) -> Self {
        Self {
            data_service_name: data_service.name().to_string(),
            image_version_tag: tag.into(),
            node_count,
            ..Default::default()
        }
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.image_version_build = Some(build.into());
        self
    }

    pub fn with_resource_settings(mut self, name: impl Into<String>) -> Self {
        self.resource_settings_template_name = name.into();
        self
    }

    pub fn with_app_config(mut self, name: impl Into<String>) -> Self {
        self.app_config_template_name = name.into();
        self
    }

    pub fn with_scheduled_backup(
        mut self,
        policy_name: impl Into<String>,
        backup_target_id: impl Into<String>,
    ) -> Self {
        self.backup_policy_name = policy_name.into();
        self.backup_target_id = Some(backup_target_id.into());
        self
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_tls(mut self, enabled: bool) -> Self {
        self.tls_enabled = enabled;
        self
    }

    pub fn data_service(&self) -> Option<DataService> {
        DataService::from_name(&self.data_service_name)
    }
}

/// Templates created by the suite, and the prefix that makes their names
/// unique to this run.
#[derive(Clone, Debug, Default)]
pub struct SuiteTemplates {
    prefix: String,
    storage_options: Vec<String>,
    /// Data service name to resource settings short names, default first.
    resource_settings: BTreeMap<String, Vec<String>>,
    /// Data service name to app config short names, default first.
    app_configs: BTreeMap<String, Vec<String>>,
}

impl SuiteTemplates {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn add_storage_option(&mut self, short_name: &str) {
        self.storage_options.push(short_name.to_string());
    }

    pub fn add_resource_settings(&mut self, data_service_name: &str, short_name: &str) {
        self.resource_settings
            .entry(data_service_name.to_string())
            .or_default()
            .push(short_name.to_string());
    }

    pub fn add_app_config(&mut self, data_service_name: &str, short_name: &str) {
        self.app_configs
            .entry(data_service_name.to_string())
            .or_default()
            .push(short_name.to_string());
    }

    /// Whether `name` is the short name of a template the suite created.
    pub fn owns(&self, name: &str) -> bool {
        self.storage_options.iter().any(|n| n == name)
            || self.resource_settings.values().flatten().any(|n| n == name)
            || self.app_configs.values().flatten().any(|n| n == name)
    }

    /// Full template name: prefixed when the suite owns `name`, verbatim
    /// otherwise.
    pub fn qualify(&self, name: &str) -> String {
        if self.owns(name) {
            format!("{}-{}", self.prefix, name)
        } else {
            name.to_string()
        }
    }

    pub fn default_storage_option(&self) -> Option<&str> {
        self.storage_options.first().map(String::as_str)
    }

    pub fn default_resource_settings(&self, data_service_name: &str) -> Option<&str> {
        first_for(&self.resource_settings, data_service_name)
    }

    pub fn default_app_config(&self, data_service_name: &str) -> Option<&str> {
        first_for(&self.app_configs, data_service_name)
    }

    /// Every qualified name the suite owns, for teardown.
    pub fn qualified_names(&self) -> BTreeSet<String> {
        self.storage_options
            .iter()
            .chain(self.resource_settings.values().flatten())
            .chain(self.app_configs.values().flatten())
            .map(|n| format!("{}-{}", self.prefix, n))
            .collect()
    }
}

fn first_for<'a>(table: &'a BTreeMap<String, Vec<String>>, data_service_name: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(data_service_name))
        .and_then(|(_, names)| names.first())
        .map(String::as_str)
}

/// Exactly one element of `matches`, or a template error.
pub fn exactly_one<T>(kind: &'static str, name: &str, mut matches: Vec<T>) -> Result<T> {
    match matches.len() {
        1 => matches
            .pop()
            .ok_or_else(|| Error::TemplateNotFound { kind, name: name.to_string() }),
        0 => Err(Error::TemplateNotFound {
            kind,
            name: name.to_string(),
        }),
        count => Err(Error::AmbiguousTemplate {
            kind,
            name: name.to_string(),
            count,
        }),
    }
}

/// Where resolved deployments go.
#[derive(Clone, Debug, Default)]
pub struct DeploymentPlacement {
    pub tenant_id: String,
    pub project_id: String,
    pub deployment_target_id: String,
    pub namespace_id: String,
}

/// Resolves short specs against the catalog and the tenant's templates.
#[derive(Clone, Debug)]
pub struct DeploymentResolver {
    cp: ControlPlane,
    placement: DeploymentPlacement,
    catalog: Arc<ImageCatalog>,
    templates: Arc<SuiteTemplates>,
}

impl DeploymentResolver {
    pub fn new(
        cp: ControlPlane,
        placement: DeploymentPlacement,
        catalog: Arc<ImageCatalog>,
        templates: Arc<SuiteTemplates>,
    ) -> Self {
        Self {
            cp,
            placement,
            catalog,
            templates,
        }
    }

    /// Fill empty fields with the suite defaults.
    pub fn apply_defaults(&self, spec: &ShortDeploymentSpec) -> ShortDeploymentSpec {
        let mut spec = spec.clone();
        if spec.service_type.is_empty() {
            spec.service_type = DEFAULT_SERVICE_TYPE.to_string();
        }
        if spec.storage_option_name.is_empty()
            && let Some(name) = self.templates.default_storage_option()
        {
            spec.storage_option_name = name.to_string();
        }
        if spec.resource_settings_template_name.is_empty()
            && let Some(name) = self.templates.default_resource_settings(&spec.data_service_name)
        {
            spec.resource_settings_template_name = name.to_string();
        }
        if spec.app_config_template_name.is_empty()
            && let Some(name) = self.templates.default_app_config(&spec.data_service_name)
        {
            spec.app_config_template_name = name.to_string();
        }
        spec
    }

    /// Build the create request for `spec`.
    #[instrument(skip(self, spec), fields(data_service = %spec.data_service_name, tag = %spec.image_version_tag))]
    pub async fn resolve(&self, spec: &ShortDeploymentSpec) -> Result<CreateDeploymentRequest> {
        let image = self.catalog.find(
            &spec.data_service_name,
            &spec.image_version_tag,
            spec.image_version_build.as_deref(),
        )?;
        let spec = self.apply_defaults(spec);
        let tenant_id = &self.placement.tenant_id;

        let resource_name = self.templates.qualify(&spec.resource_settings_template_name);
        let resource_settings = exactly_one(
            "resource settings",
            &resource_name,
            self.cp
                .list_resource_settings_templates(tenant_id)
                .await?
                .into_iter()
                .filter(|t| t.name == resource_name && t.data_service_id == image.data_service_id)
                .collect(),
        )?;

        let app_config_name = self.templates.qualify(&spec.app_config_template_name);
        let app_config = exactly_one(
            "application configuration",
            &app_config_name,
            self.cp
                .list_application_configuration_templates(tenant_id)
                .await?
                .into_iter()
                .filter(|t| {
                    t.name == app_config_name && t.data_service_id == image.data_service_id
                })
                .collect(),
        )?;

        let storage_name = self.templates.qualify(&spec.storage_option_name);
        let storage_option = exactly_one(
            "storage options",
            &storage_name,
            self.cp
                .list_storage_options_templates(tenant_id)
                .await?
                .into_iter()
                .filter(|t| t.name == storage_name)
                .collect(),
        )?;

        let scheduled_backup = if spec.backup_policy_name.is_empty() {
            None
        } else {
            let policy = exactly_one(
                "backup policy",
                &spec.backup_policy_name,
                self.cp
                    .list_backup_policies(tenant_id)
                    .await?
                    .into_iter()
                    .filter(|p| p.name == spec.backup_policy_name)
                    .collect(),
            )?;
            let backup_target_id = spec.backup_target_id.clone().ok_or_else(|| {
                Error::MissingField("backup target for scheduled backups".to_string())
            })?;
            Some(ScheduledBackup {
                backup_policy_id: policy.id,
                backup_target_id,
            })
        };

        let dns = self.cp.get_dns_details(tenant_id).await?;

        Ok(CreateDeploymentRequest {
            name: None,
            name_prefix: (!spec.name_prefix.is_empty()).then(|| spec.name_prefix.clone()),
            image_id: image.image_id.clone(),
            application_configuration_template_id: app_config.id,
            resource_settings_template_id: resource_settings.id,
            storage_options_template_id: storage_option.id,
            deployment_target_id: self.placement.deployment_target_id.clone(),
            namespace_id: self.placement.namespace_id.clone(),
            node_count: spec.node_count,
            service_type: spec.service_type.clone(),
            dns_zone: dns.dns_zone,
            tls_enabled: spec.tls_enabled.then_some(true),
            scheduled_backup,
        })
    }

    /// Resolve `spec` and create the deployment.
    pub async fn deploy(&self, spec: &ShortDeploymentSpec) -> Result<Deployment> {
        let request = self.resolve(spec).await?;
        let deployment = self
            .cp
            .create_deployment(&self.placement.project_id, &request)
            .await?;
        info!(
            deployment_id = %deployment.id,
            cluster_resource_name = %deployment.cluster_resource_name,
            "Created deployment"
        );
        Ok(deployment)
    }
}
