use async_trait::async_trait;
use chrono::DateTime;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::services::identity::verifier::{IdentityVerifier, VerifiedIdentity, VerifyError};

pub(crate) fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Verifies identity-provider JWTs locally (signature, `iss`, `aud`, `exp`, `nbf`).
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    /// EdDSA (Ed25519) tokens; `public_key_pem` is an SPKI PEM.
    pub fn ed25519(
        public_key_pem: &str,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_ed_pem(public_key_pem.as_bytes())?;
        Ok(Self::with_key(
            decoding_key,
            Algorithm::EdDSA,
            issuer,
            audience,
            leeway_seconds,
        ))
    }

    /// HS256 tokens signed with a shared secret.
    pub fn hs256(secret: &[u8], issuer: &str, audience: &str, leeway_seconds: u64) -> Self {
        Self::with_key(
            DecodingKey::from_secret(secret),
            Algorithm::HS256,
            issuer,
            audience,
            leeway_seconds,
        )
    }

    fn with_key(
        decoding_key: DecodingKey,
        algorithm: Algorithm,
        issuer: &str,
        audience: &str,
        leeway_seconds: u64,
    ) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Decode + validate, then lift the claim set into a `VerifiedIdentity`.
    ///
    /// `jsonwebtoken::Validation` checks signature, `exp`/`nbf`, `iss` and `aud`.
    /// On top of that `sub` must be a non-empty string.
    pub fn decode(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
                .map_err(|e| VerifyError::Rejected(e.to_string()))?;
        let claims = data.claims;

        let uid = string_claim(&claims, "sub")
            .ok_or_else(|| VerifyError::Rejected("empty 'sub' claim".to_string()))?;

        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

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
impl IdentityVerifier for JwtVerifier {
    fn backend_name(&self) -> &'static str {
        "jwt"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.decode(token)
    }
}
