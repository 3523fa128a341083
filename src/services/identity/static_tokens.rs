//! In-memory token table, for local development and tests.
//!
//! File format (JSON object keyed by the opaque bearer token):
//!
//! ```json
//! {
//!   "valid-admin-token": {
//!     "uid": "admin-1",
//!     "email": "admin@example.com",
//!     "claims": { "role": "admin", "tenantID": "tenant1" }
//!   }
//! }
//! ```
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::services::identity::verifier::{IdentityVerifier, VerifiedIdentity, VerifyError};

#[derive(Debug, Error)]
pub enum StaticTokensError {
    #[error("failed to read token table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse token table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("token entry '{0}' has an empty uid")]
    EmptyUid(String),
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    claims: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedIdentity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: VerifiedIdentity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, StaticTokensError> {
        let entries: HashMap<String, TokenEntry> = serde_json::from_str(raw)?;

        let mut tokens = HashMap::with_capacity(entries.len());
        for (token, entry) in entries {
            if entry.uid.trim().is_empty() {
                return Err(StaticTokensError::EmptyUid(token));
            }
            tokens.insert(
                token,
                VerifiedIdentity {
                    uid: entry.uid,
                    email: entry.email,
                    display_name: entry.name,
                    expires_at: None,
                    claims: entry.claims,
                },
            );
        }

        Ok(Self { tokens })
    }

    pub fn from_file(path: &Path) -> Result<Self, StaticTokensError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    fn backend_name(&self) -> &'static str {
        "static"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::Rejected("unknown token".to_string()))
    }
}
