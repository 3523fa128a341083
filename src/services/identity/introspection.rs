//! Remote verification through an OAuth 2.0 token introspection endpoint (RFC 7662).
//!
//! The token is POSTed as `token=<credential>`; the endpoint answers with a JSON
//! claim set carrying `active`. Failure classes:
//!
//! - connection / TLS / transport failure, non-2xx answer, unreadable body → `Unavailable`
//! - `active` not `true`, expired `exp`, missing `sub` → `Rejected`
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::services::identity::jwt::string_claim;
use crate::services::identity::verifier::{IdentityVerifier, VerifiedIdentity, VerifyError};

#[derive(Clone)]
pub struct IntrospectionVerifier {
    http_client: Client,
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl std::fmt::Debug for IntrospectionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Client secret stays out of logs
        f.debug_struct("IntrospectionVerifier")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.credentials.as_ref().map(|(id, _)| id))
            .finish()
    }
}

impl IntrospectionVerifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: Client::builder().build()?,
            endpoint: endpoint.into(),
            credentials: None,
        })
    }

    /// Authenticate to the endpoint with HTTP basic auth.
    pub fn with_client_credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.credentials = Some((client_id.into(), client_secret.into()));
        self
    }

    /// Lift an introspection answer into a `VerifiedIdentity`.
    fn identity_from(claims: Map<String, Value>) -> Result<VerifiedIdentity, VerifyError> {
        if claims.get("active").and_then(Value::as_bool) != Some(true) {
            return Err(VerifyError::Rejected("token is not active".to_string()));
        }

        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        if expires_at.is_some_and(|exp| exp <= Utc::now()) {
            return Err(VerifyError::Rejected("token expired".to_string()));
        }

        let uid = string_claim(&claims, "sub")
            .ok_or_else(|| VerifyError::Rejected("empty 'sub' claim".to_string()))?;

        Ok(VerifiedIdentity {
            uid,
            email: string_claim(&claims, "email"),
            display_name: string_claim(&claims, "name"),
            expires_at,
            claims,
        })
    }
}

#[async_trait]
impl IdentityVerifier for IntrospectionVerifier {
    fn backend_name(&self) -> &'static str {
        "introspection"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("token", token), ("token_type_hint", "access_token")]);
        if let Some((client_id, client_secret)) = &self.credentials {
            request = request.basic_auth(client_id, Some(client_secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("introspection request failed: {e}")))?;

        // 401/403 here mean our own client credentials were refused, not the caller's token.
        let status = response.status();
        if !status.is_success() {
            return Err(VerifyError::Unavailable(format!("introspection endpoint answered {status}")));
        }

        let claims: Map<String, Value> = response
            .json()
            .await
            .map_err(|e| VerifyError::Unavailable(format!("unreadable introspection response: {e}")))?;

        Self::identity_from(claims)
    }
}
