//! Identity verifier capability.
//!
//! The pipeline only ever talks to `dyn IdentityVerifier`; concrete backends
//! (JWT, static token table, ...) are interchangeable behind it.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// What a backend hands back for a credential it accepted.
///
/// `claims` is the raw claim set as the backend saw it. Interpreting optional
/// claims (role, tenant) is not the backend's job; see `Principal::from_verified`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub claims: Map<String, Value>,
}

impl VerifiedIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            expires_at: None,
            claims: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The backend answered and refused the credential.
    #[error("credential rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed internally.
    #[error("identity backend unavailable: {0}")]
    Unavailable(String),
}

/// Exchanges a bearer credential for a verified identity.
///
/// Implementations must be safe to call concurrently from independent requests.
/// Callers bound each call with a deadline and may drop the future at any await
/// point, so implementations must not rely on running to completion.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    // Backend name, for logs.
    fn backend_name(&self) -> &'static str;

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}
