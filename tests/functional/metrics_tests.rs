//! Prometheus client and the metrics verifier against a fake Prometheus.

use jiff::Timestamp;
use serde_json::json;

use pds_integration::DataService;
use pds_integration::metrics::{PrometheusClient, missing_metrics};

use crate::{fake_prometheus, vector};

#[tokio::test]
async fn test_query_decodes_vector() {
    let url = fake_prometheus(|_query: &str| vector(&[json!({"__name__": "pg_up", "pod": "pg-0"})])).await;
    let client = PrometheusClient::new(&url);

    let samples = client.query("pg_up", Timestamp::now()).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].metric.get("pod").map(String::as_str), Some("pg-0"));
    assert_eq!(samples[0].value.1, "1");
}

#[tokio::test]
async fn test_query_rejects_non_vector() {
    let url = fake_prometheus(|_query: &str| {
        json!({"status": "success", "data": {"resultType": "matrix", "result": []}})
    })
    .await;
    let client = PrometheusClient::new(&url);

    let err = client.query("pg_up[5m]", Timestamp::now()).await.unwrap_err();
    assert!(
        matches!(&err, pds_integration::Error::UnexpectedResultType(t) if t == "matrix"),
        "{err}"
    );
}

#[tokio::test]
async fn test_query_surfaces_prometheus_error() {
    let url = fake_prometheus(|_query: &str| {
        json!({"status": "error", "errorType": "bad_data", "error": "parse error at char 3"})
    })
    .await;
    let client = PrometheusClient::new(&url);

    let err = client.query("pg_up{", Timestamp::now()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bad_data"), "{message}");
    assert!(message.contains("parse error"), "{message}");
}

#[tokio::test]
async fn test_missing_metrics_lists_empty_selectors() {
    let url = fake_prometheus(|query: &str| {
        if query.starts_with("pg_database_size_bytes") {
            vector(&[])
        } else {
            vector(&[json!({"pds_deployment_id": "dep-1"})])
        }
    })
    .await;
    let client = PrometheusClient::new(&url);

    let missing = missing_metrics(&client, "dep-1", DataService::Postgres, Timestamp::now())
        .await
        .unwrap();
    let rendered: Vec<String> = missing.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["pg_database_size_bytes".to_string()]);
}

#[tokio::test]
async fn test_queries_are_scoped_to_deployment() {
    let url = fake_prometheus(|query: &str| {
        if query.contains(r#"pds_deployment_id="dep-42""#) {
            vector(&[json!({})])
        } else {
            vector(&[])
        }
    })
    .await;
    let client = PrometheusClient::new(&url);

    let missing = missing_metrics(&client, "dep-42", DataService::Redis, Timestamp::now())
        .await
        .unwrap();
    assert!(missing.is_empty(), "{missing:?}");
}
