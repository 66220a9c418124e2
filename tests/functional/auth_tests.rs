//! OIDC password grant against a fake provider.

use pds_integration::ControlPlane;
use pds_integration::controlplane::{ControlPlaneConfig, Credentials, OidcPasswordGrant};

use crate::{ControlPlaneState, control_plane_app, fake_oidc, serve};

fn grant(issuer_url: &str, password: &str) -> OidcPasswordGrant {
    OidcPasswordGrant {
        issuer_url: format!("{issuer_url}/"),
        client_id: "pds-harness".to_string(),
        client_secret: String::new(),
        username: "tester".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_password_grant_returns_access_token() {
    let issuer = fake_oidc("tester", "hunter2", "token-123").await;

    let token = grant(&issuer, "hunter2")
        .fetch_token(&reqwest::Client::new())
        .await
        .unwrap();
    assert_eq!(token, "token-123");
}

#[tokio::test]
async fn test_rejected_grant_is_auth_error() {
    let issuer = fake_oidc("tester", "hunter2", "token-123").await;

    let err = grant(&issuer, "wrong")
        .fetch_token(&reqwest::Client::new())
        .await
        .unwrap_err();
    assert!(matches!(err, pds_integration::Error::Auth(_)), "{err}");
    assert!(err.to_string().contains("invalid_grant"), "{err}");
}

#[tokio::test]
async fn test_control_plane_sends_bearer_token() {
    let issuer = fake_oidc("tester", "hunter2", "token-123").await;
    let state = std::sync::Arc::new(std::sync::Mutex::new(ControlPlaneState::default()));
    let url = serve(control_plane_app(state.clone())).await;

    let config = ControlPlaneConfig::new(url, Credentials::Password(grant(&issuer, "hunter2")));
    let cp = ControlPlane::connect(&config).await.unwrap();
    let accounts = cp.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);

    let seen = state.lock().unwrap().authorization.clone();
    assert_eq!(seen, vec!["Bearer token-123".to_string()]);
}

#[test]
fn test_debug_redacts_secrets() {
    let credentials = Credentials::Token("secret-token".to_string());
    assert!(!format!("{credentials:?}").contains("secret-token"));

    let credentials = Credentials::Password(grant("https://issuer.example", "hunter2"));
    assert!(!format!("{credentials:?}").contains("hunter2"));
}
