//! Bearer token acquisition.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// How the harness authenticates against the Control Plane.
#[derive(Clone)]
pub enum Credentials {
    /// Unauthenticated, for local fakes.
    None,
    /// Static bearer token.
    Token(String),
    /// Token obtained through an OIDC resource-owner password grant.
    Password(OidcPasswordGrant),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Password(grant) => f.debug_tuple("Password").field(grant).finish(),
        }
    }
}

impl Credentials {
    pub(crate) async fn bearer_token(&self, http: &reqwest::Client) -> Result<Option<String>> {
        match self {
            Credentials::None => Ok(None),
            Credentials::Token(token) => Ok(Some(token.clone())),
            Credentials::Password(grant) => grant.fetch_token(http).await.map(Some),
        }
    }
}

/// Parameters of an OIDC password grant.
#[derive(Clone)]
pub struct OidcPasswordGrant {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for OidcPasswordGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcPasswordGrant")
            .field("issuer_url", &self.issuer_url)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Discovery {
    token_endpoint: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OidcPasswordGrant {
    /// URL of the issuer's discovery document.
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.issuer_url.trim_end_matches('/')
        )
    }

    /// Resolve the token endpoint and exchange the user's password for an
    /// access token.
    #[instrument(skip(self, http), fields(issuer = %self.issuer_url, user = %self.username))]
    pub async fn fetch_token(&self, http: &reqwest::Client) -> Result<String> {
        let discovery: Discovery = http
            .get(self.discovery_url())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Auth(format!("fetching discovery document: {e}")))?
            .json()
            .await?;
        debug!(endpoint = %discovery.token_endpoint, "Resolved token endpoint");

        let response = http
            .post(&discovery.token_endpoint)
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
                ("scope", "openid"),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}
