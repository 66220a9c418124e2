//! StatefulSet waits.

use k8s_openapi::api::apps::v1::StatefulSet;

use super::CrossCluster;
use crate::sink::{Sink, SinkExt};
use crate::timing::{
    DEFAULT_POLL_PERIOD, LONG_TIMEOUT, STANDARD_TIMEOUT, VERY_LONG_TIMEOUT, for_node_count,
};
use crate::wait::eventually;

const PDS_MODE_ENV: &str = "PDS_MODE";

/// Ready and updated replicas both equal `node_count`.
pub fn statefulset_ready(sts: &StatefulSet, node_count: i32) -> bool {
    let Some(status) = sts.status.as_ref() else {
        return false;
    };
    status.ready_replicas.unwrap_or(0) == node_count
        && status.updated_replicas.unwrap_or(0) == node_count
}

/// Every container runs with `PDS_MODE` unset, empty or `Normal`.
pub fn pds_mode_normal(sts: &StatefulSet) -> bool {
    let containers = sts
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod| pod.containers.as_slice())
        .unwrap_or_default();
    containers.iter().all(|container| {
        container
            .env
            .iter()
            .flatten()
            .filter(|env| env.name == PDS_MODE_ENV)
            .all(|env| matches!(env.value.as_deref(), None | Some("") | Some("Normal")))
    })
}

/// Image of the named container.
pub fn container_image<'a>(sts: &'a StatefulSet, container: &str) -> Option<&'a str> {
    sts.spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == container)?
        .image
        .as_deref()
}

fn update_revision(sts: &StatefulSet) -> String {
    sts.status
        .as_ref()
        .and_then(|s| s.update_revision.clone())
        .unwrap_or_default()
}

impl CrossCluster {
    pub async fn wait_for_statefulset_ready(&self, t: &dyn Sink, deployment_id: &str) {
        self.wait_for_statefulset(t, deployment_id, false).await;
    }

    /// Ready, and no container left in a maintenance `PDS_MODE`.
    pub async fn wait_for_statefulset_pds_mode_normal_ready(&self, t: &dyn Sink, deployment_id: &str) {
        self.wait_for_statefulset(t, deployment_id, true).await;
    }

    async fn wait_for_statefulset(&self, t: &dyn Sink, deployment_id: &str, check_mode: bool) {
        let location = self.must_locate(t, deployment_id).await;
        // Multi-node clusters join members one at a time.
        let timeout = if location.node_count > 1 {
            for_node_count(VERY_LONG_TIMEOUT, location.node_count)
        } else {
            LONG_TIMEOUT
        };
        eventually(t, timeout, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let sts = t.require_ok(
                self.cluster
                    .get_statefulset(&location.namespace, &location.cluster_resource_name)
                    .await,
                "get statefulset",
            );
            t.require_true(
                statefulset_ready(&sts, location.node_count),
                &format!(
                    "statefulset {} has {} ready and updated replicas",
                    location.cluster_resource_name, location.node_count
                ),
            );
            if check_mode {
                t.require_true(pds_mode_normal(&sts), "PDS_MODE is Normal on every container");
            }
        })
        .await;
    }

    /// Current `updateRevision`, to compare against after an update.
    pub async fn statefulset_update_revision(&self, t: &dyn Sink, deployment_id: &str) -> String {
        let location = self.must_locate(t, deployment_id).await;
        let sts = t.require_ok(
            self.cluster
                .get_statefulset(&location.namespace, &location.cluster_resource_name)
                .await,
            "get statefulset",
        );
        update_revision(&sts)
    }

    /// Wait until the StatefulSet moved to a revision other than `prior`.
    pub async fn wait_for_statefulset_changed(&self, t: &dyn Sink, deployment_id: &str, prior: &str) {
        let location = self.must_locate(t, deployment_id).await;
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let sts = t.require_ok(
                self.cluster
                    .get_statefulset(&location.namespace, &location.cluster_resource_name)
                    .await,
                "get statefulset",
            );
            let current = update_revision(&sts);
            t.require_true(
                !current.is_empty() && current != prior,
                &format!("update revision {current:?} differs from {prior:?}"),
            );
        })
        .await;
    }

    /// Wait until the data-service container runs an image containing `tag`.
    pub async fn wait_for_statefulset_image(&self, t: &dyn Sink, deployment_id: &str, tag: &str) {
        let location = self.must_locate(t, deployment_id).await;
        let container = location.data_service.container_name();
        eventually(t, STANDARD_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
            let sts = t.require_ok(
                self.cluster
                    .get_statefulset(&location.namespace, &location.cluster_resource_name)
                    .await,
                "get statefulset",
            );
            let image = t.require_some(
                container_image(&sts, container),
                &format!("image of container {container}"),
            );
            t.require_true(
                image.contains(tag),
                &format!("image {image:?} contains {tag:?}"),
            );
        })
        .await;
    }
}
