//! Metrics presence after a load test.

use pds_integration::loadtest::{LoadTestOptions, must_run_load_test};
use pds_integration::metrics::wait_for_expected_metrics;
use pds_integration::{DataService, ShortDeploymentSpec};

use crate::start;

async fn check_metrics(test: &str, data_service: DataService, tag: &str) {
    let (t, suite) = start(test).await;
    let prometheus = suite.prometheus(&t);

    let spec = ShortDeploymentSpec::new(data_service, tag, 1);
    let deployment = suite.must_deploy_healthy(&t, &spec).await;
    must_run_load_test(&t, &suite.cross, &deployment.id, &LoadTestOptions::default()).await;

    wait_for_expected_metrics(&t, &prometheus, &deployment.id, data_service).await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane, target cluster and Prometheus"]
async fn test_postgres_metrics() {
    check_metrics("test_postgres_metrics", DataService::Postgres, "15.3").await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane, target cluster and Prometheus"]
async fn test_cassandra_metrics() {
    check_metrics("test_cassandra_metrics", DataService::Cassandra, "4.1.2").await;
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a PDS Control Plane, target cluster and Prometheus"]
async fn test_catalog_metrics() {
    let (t, suite) = start("test_catalog_metrics").await;
    let prometheus = suite.prometheus(&t);

    for data_service in suite.catalog.data_service_names() {
        let Some(data_service) = DataService::from_name(data_service) else {
            continue;
        };
        let Some(image) = suite
            .catalog
            .images()
            .iter()
            .find(|image| image.data_service() == Some(data_service))
        else {
            continue;
        };
        let spec = ShortDeploymentSpec::new(data_service, image.version_tag.as_str(), 1)
            .with_build(image.version_build.as_str());
        let deployment = suite.must_deploy_healthy(&t, &spec).await;
        must_run_load_test(&t, &suite.cross, &deployment.id, &LoadTestOptions::default()).await;
        wait_for_expected_metrics(&t, &prometheus, &deployment.id, data_service).await;
    }
}
