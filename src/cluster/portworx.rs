//! Portworx storage cluster fixtures.

use jiff::Timestamp;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use kube::api::DynamicObject;
use serde_json::json;
use tracing::info;

use super::TargetCluster;
use crate::sink::{Sink, SinkExt};
use crate::timing::{DEFAULT_POLL_PERIOD, VERY_LONG_TIMEOUT};
use crate::wait::eventually;

/// Label selector of the Portworx pods.
pub const PORTWORX_POD_SELECTOR: &str = "name=portworx";

/// Time the node last transitioned to `Online`.
pub fn online_since(node: &DynamicObject) -> Option<Timestamp> {
    node.data
        .get("status")?
        .get("conditions")?
        .as_array()?
        .iter()
        .filter(|c| c.get("status").and_then(|s| s.as_str()) == Some("Online"))
        .filter_map(|c| c.get("lastTransitionTime")?.as_str()?.parse().ok())
        .max()
}

/// Latest online transition across all nodes.
pub fn latest_online_transition(nodes: &[DynamicObject]) -> Option<Timestamp> {
    nodes.iter().filter_map(online_since).max()
}

/// Whether every node came online strictly after `reference`.
pub fn all_nodes_restarted_after(nodes: &[DynamicObject], reference: Timestamp) -> bool {
    !nodes.is_empty()
        && nodes
            .iter()
            .all(|node| online_since(node).is_some_and(|since| since > reference))
}

fn csi_enabled(storage_cluster: &DynamicObject) -> bool {
    storage_cluster
        .data
        .pointer("/spec/csi/enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn pod_running_and_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    status.phase.as_deref() == Some("Running")
        && status
            .conditions
            .as_ref()
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            })
}

/// Toggle CSI on the storage cluster and wait for Portworx to restart.
///
/// Returns immediately when CSI already has the requested value, since no
/// restart would follow.
pub async fn must_set_storage_cluster_csi_enabled(
    t: &dyn Sink,
    cluster: &TargetCluster,
    namespace: &str,
    enabled: bool,
) {
    let clusters = t.require_ok(
        cluster.list_storage_clusters(namespace).await,
        "list storage clusters",
    );
    t.require_eq(1, clusters.len(), "number of storage clusters");
    let Some(storage_cluster) = clusters.first() else {
        return;
    };
    if csi_enabled(storage_cluster) == enabled {
        t.log(&format!("CSI already enabled={enabled}"));
        return;
    }

    let nodes = t.require_ok(
        cluster.list_storage_nodes(namespace).await,
        "list storage nodes",
    );
    let reference = t.require_some(
        latest_online_transition(&nodes),
        "online transition of storage nodes",
    );

    let name = storage_cluster.name_any();
    t.require_ok(
        cluster
            .patch_storage_cluster(
                namespace,
                &name,
                &json!({"spec": {"csi": {"enabled": enabled}}}),
            )
            .await,
        "patch storage cluster",
    );
    info!(storage_cluster = %name, enabled, %reference, "Toggled CSI");

    eventually(t, VERY_LONG_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
        let nodes = t.require_ok(
            cluster.list_storage_nodes(namespace).await,
            "list storage nodes",
        );
        t.require_true(
            all_nodes_restarted_after(&nodes, reference),
            "every storage node back online after the restart",
        );
    })
    .await;

    eventually(t, VERY_LONG_TIMEOUT, DEFAULT_POLL_PERIOD, async |t: &dyn Sink| {
        let pods = t.require_ok(
            cluster.list_pods(namespace, PORTWORX_POD_SELECTOR).await,
            "list portworx pods",
        );
        t.require_true(!pods.is_empty(), "portworx pods exist");
        for pod in &pods {
            t.require_true(
                pod_running_and_ready(pod),
                &format!("pod {} running and ready", pod.name_any()),
            );
        }
    })
    .await;
}
