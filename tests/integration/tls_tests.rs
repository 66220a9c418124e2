//! TLS policy scenarios.

use pds_integration::names::random_name;
use pds_integration::{DataService, ShortDeploymentSpec, SinkExt};

use crate::start;

const TLS_REQUIRED_MESSAGE: &str = "policy requires enabling TLS for this deployment";

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane and target cluster"]
async fn test_tls_required_rejects_plain_deployment() {
    let (t, suite) = start("test_tls_required_rejects_plain_deployment").await;

    suite
        .must_update_deployment_target_tls(&t, true, Some(random_name("issuer")))
        .await;

    let spec = ShortDeploymentSpec::new(DataService::Postgres, "15.3", 1).with_tls(false);
    let result = suite.resolver.deploy(&spec).await;
    if let Ok(deployment) = &result {
        suite.delete_deployment_on_cleanup(&t, &deployment.id);
    }
    let error = t.require_some(result.err(), "deployment without TLS is rejected");

    let status = match &error {
        pds_integration::Error::ControlPlane(e) => e.status(),
        _ => None,
    };
    t.require_eq(Some(422), status.map(|s| s.as_u16()), "response status");
    t.require_true(
        error.to_string().contains(TLS_REQUIRED_MESSAGE),
        &format!("error {error} mentions the TLS policy"),
    );
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane and target cluster"]
async fn test_tls_deployment_with_cluster_issuer() {
    let (t, suite) = start("test_tls_deployment_with_cluster_issuer").await;

    let issuer = suite.must_create_cluster_issuer(&t).await;
    suite
        .must_update_deployment_target_tls(&t, true, Some(issuer))
        .await;

    let spec = ShortDeploymentSpec::new(DataService::Postgres, "15.3", 1).with_tls(true);
    let deployment = suite.must_deploy_healthy(&t, &spec).await;
    let reported = t.require_ok(
        suite.cp.get_deployment(&deployment.id).await,
        "get deployment",
    );
    t.require_eq(Some(true), reported.tls_enabled, "deployment TLS enabled");
}
