//! Namespace synchronization between the target cluster and the Control Plane.

use pds_integration::cluster::ignore_not_found;
use pds_integration::cluster::namespace::{MANAGED_LABEL, NamespaceOptions, PodSecurityLevel};
use pds_integration::names::generate_name;
use pds_integration::SinkExt;
use pds_integration::timing::QUICK_CHECK_TIMEOUT;

use crate::start;

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane and target cluster"]
async fn test_namespace_without_label_is_never_listed() {
    let (t, suite) = start("test_namespace_without_label_is_never_listed").await;

    let name = generate_name();
    let options = NamespaceOptions::new(name.as_str(), suite.config.environment.as_str());
    suite.must_create_namespace(&t, &options).await;

    suite
        .cross
        .ensure_namespace_never_listed(&t, &suite.ids.deployment_target_id, &name, QUICK_CHECK_TIMEOUT)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane and target cluster"]
async fn test_namespace_with_invalid_label_is_never_listed() {
    let (t, suite) = start("test_namespace_with_invalid_label_is_never_listed").await;

    let name = generate_name();
    let options = NamespaceOptions::new(name.as_str(), suite.config.environment.as_str());
    suite.must_create_namespace(&t, &options).await;
    t.require_ok(
        suite
            .cluster
            .set_namespace_label(&name, MANAGED_LABEL, Some("xxx"))
            .await,
        "label namespace",
    );

    suite
        .cross
        .ensure_namespace_never_listed(&t, &suite.ids.deployment_target_id, &name, QUICK_CHECK_TIMEOUT)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane and target cluster"]
async fn test_namespace_status_follows_label() {
    let (t, suite) = start("test_namespace_status_follows_label").await;
    let target = suite.ids.deployment_target_id.as_str();

    let name = generate_name();
    let options = NamespaceOptions::new(name.as_str(), suite.config.environment.as_str())
        .with_pod_security(PodSecurityLevel::Privileged)
        .managed(true);
    suite.must_create_namespace(&t, &options).await;
    suite
        .cross
        .wait_for_namespace_status(&t, target, &name, "available")
        .await;

    t.require_ok(
        suite.cluster.set_namespace_label(&name, MANAGED_LABEL, None).await,
        "remove managed label",
    );
    suite
        .cross
        .wait_for_namespace_status(&t, target, &name, "unavailable")
        .await;

    t.require_ok(
        suite
            .cluster
            .set_namespace_label(&name, MANAGED_LABEL, Some("true"))
            .await,
        "restore managed label",
    );
    suite
        .cross
        .wait_for_namespace_status(&t, target, &name, "available")
        .await;
}

/// Finalizer that keeps a deleted namespace in `Terminating`.
const HOLD_FINALIZER: &str = "pds-integration/hold";

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane and target cluster"]
async fn test_terminating_namespace_is_released() {
    let (t, suite) = start("test_terminating_namespace_is_released").await;
    let target = suite.ids.deployment_target_id.as_str();

    let name = generate_name();
    let options = NamespaceOptions::new(name.as_str(), suite.config.environment.as_str())
        .with_pod_security(PodSecurityLevel::Privileged)
        .managed(true);
    suite.must_create_namespace(&t, &options).await;
    t.require_ok(
        suite
            .cluster
            .set_namespace_finalizers(&name, &[HOLD_FINALIZER])
            .await,
        "hold namespace",
    );
    {
        let cluster = suite.cluster.clone();
        let name = name.clone();
        t.cleanup(format!("release namespace {name}"), async move {
            let _ = ignore_not_found(cluster.set_namespace_finalizers(&name, &[]).await);
        });
    }
    suite
        .cross
        .wait_for_namespace_status(&t, target, &name, "available")
        .await;

    t.require_ok(suite.cluster.delete_namespace(&name).await, "delete namespace");
    suite
        .cross
        .wait_for_namespace_released(&t, target, &name)
        .await;

    t.require_ok(
        suite.cluster.set_namespace_finalizers(&name, &[]).await,
        "release namespace",
    );
    suite.cross.wait_for_namespace_absent(&t, target, &name).await;
}
