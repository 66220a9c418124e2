//! Control Plane client behavior against the fake server.

use pds_integration::Error;
use pds_integration::cluster::ignore_not_found;
use pds_integration::controlplane::models::CreateDeploymentRequest;

use crate::{ControlPlaneState, fake_control_plane};

#[tokio::test]
async fn test_not_found_keeps_body_and_status() {
    let (_state, cp) = fake_control_plane(ControlPlaneState::default()).await;

    let err = cp.get_deployment("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_conflict());
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(err.body().unwrap().contains("deployment missing not found"));
    let message = err.to_string();
    assert!(message.contains("GET /deployments/missing"), "{message}");
    assert!(message.contains("HTTP 404"), "{message}");
}

#[tokio::test]
async fn test_not_found_is_recognized_through_crate_error() {
    let (_state, cp) = fake_control_plane(ControlPlaneState::default()).await;

    let result = cp.get_deployment("gone").await.map_err(Error::from);
    assert!(matches!(&result, Err(e) if e.is_not_found()));
    assert!(ignore_not_found(result).unwrap().is_none());
}

#[tokio::test]
async fn test_referenced_credentials_conflict() {
    let (_state, cp) = fake_control_plane(ControlPlaneState {
        referenced_credentials: vec!["creds-in-use".to_string()],
        ..Default::default()
    })
    .await;

    let err = cp.delete_backup_credentials("creds-in-use").await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("backup credentials are in use"));

    cp.delete_backup_credentials("creds-free").await.unwrap();
}

#[tokio::test]
async fn test_tls_policy_violation_is_verbatim() {
    let (_state, cp) = fake_control_plane(ControlPlaneState {
        tls_required: true,
        ..Default::default()
    })
    .await;

    let request = CreateDeploymentRequest {
        image_id: "img-1".to_string(),
        node_count: 1,
        ..Default::default()
    };
    let err = cp.create_deployment("proj-1", &request).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(422));
    assert!(
        err.to_string()
            .contains("policy requires enabling TLS for this deployment"),
        "{err}"
    );
}

#[tokio::test]
async fn test_list_images_passes_filters() {
    let (state, cp) = fake_control_plane(crate::postgres_state("integration-test-abcd1234")).await;

    let images = cp.list_images("ds-pg", true).await.unwrap();
    assert_eq!(images.len(), 2);
    assert!(images.iter().all(|image| image.data_service_id == "ds-pg"));
    assert!(images.iter().any(|image| image.created_at.is_some()));

    let queries = state.lock().unwrap().image_queries.clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].get("data_service_id").map(String::as_str), Some("ds-pg"));
    assert_eq!(
        queries[0].get("latest_compatible_only").map(String::as_str),
        Some("true")
    );
}
