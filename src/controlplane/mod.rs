//! Thin Control Plane REST client.
//!
//! Covers exactly the endpoints the harness consumes. Every call returns
//! [`ApiError`] on transport failures and non-2xx responses; the raw response
//! body is kept so that policy violations reach the test log verbatim. There
//! are no retries at this layer; convergence belongs to the waiter.

pub mod auth;
mod backups;
mod catalog;
mod deployments;
pub mod models;
mod targets;
mod templates;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

pub use auth::{Credentials, OidcPasswordGrant};
use models::ListResponse;

/// Errors returned by the Control Plane client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{method} {path}: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path}: HTTP {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("{method} {path}: decoding response: {source}; body: {body}")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("encoding request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    /// HTTP status of a non-2xx response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body, when one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } | ApiError::Decode { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}

/// Configuration for [`ControlPlane`].
#[derive(Clone, Debug)]
pub struct ControlPlaneConfig {
    /// API base URL, e.g. `https://pds.example.com/api`.
    pub base_url: String,
    pub credentials: Credentials,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ControlPlaneConfig {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Handle to the Control Plane API. Cheap to clone.
#[derive(Clone)]
pub struct ControlPlane {
    http: reqwest::Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for ControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlane")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ControlPlane {
    /// Build a client, acquiring a bearer token first when the credentials
    /// require it.
    #[instrument(skip(config), fields(url = %config.base_url))]
    pub async fn connect(config: &ControlPlaneConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let token = config.credentials.bearer_token(&http).await?;
        debug!(authenticated = token.is_some(), "Control Plane client ready");
        Ok(Self::with_client(http, &config.base_url, token))
    }

    /// Build a client from an existing HTTP client and optional token.
    pub fn with_client(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: token.map(Arc::from),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let transport = |source| ApiError::Transport {
            method: method.clone(),
            path: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        debug!(%method, path, status = status.as_u16(), "Control Plane call");

        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                path: path.to_string(),
                status,
                body: text,
            });
        }
        Ok(text)
    }

    fn decode<T: DeserializeOwned>(method: Method, path: &str, text: String) -> Result<T, ApiError> {
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            method,
            path: path.to_string(),
            source,
            body: text,
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.execute(Method::GET, path, &[], None).await?;
        Self::decode(Method::GET, path, text)
    }

    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let text = self.execute(Method::GET, path, query, None).await?;
        let page: ListResponse<T> = Self::decode(Method::GET, path, text)?;
        Ok(page.data)
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        let text = self.execute(Method::POST, path, &[], Some(body)).await?;
        Self::decode(Method::POST, path, text)
    }

    pub(crate) async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        let text = self.execute(Method::PUT, path, &[], Some(body)).await?;
        Self::decode(Method::PUT, path, text)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}
