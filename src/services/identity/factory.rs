/// Factory: build the identity verifier selected by `IdentityConfig`.
use std::sync::Arc;

use crate::config::{ConfigError, IdentityBackend, IdentityConfig};
use crate::services::identity::{IdentityVerifier, IntrospectionVerifier, JwtVerifier, StaticTokenVerifier};

pub fn build_identity_verifier(
    config: &IdentityConfig,
) -> Result<Arc<dyn IdentityVerifier>, ConfigError> {
    let issuer = config.issuer.as_deref().unwrap_or_default();
    let audience = config.audience.as_deref().unwrap_or_default();

    let verifier: Arc<dyn IdentityVerifier> = match &config.backend {
        IdentityBackend::JwtEd25519 { public_key_pem } => Arc::new(
            JwtVerifier::ed25519(public_key_pem, issuer, audience, config.leeway_seconds)
                .map_err(|e| {
                    tracing::error!(error = %e, "invalid identity public key (expected Ed25519 SPKI PEM)");
                    ConfigError::Invalid("IDENTITY_JWT_PUBLIC_KEY_PEM")
                })?,
        ),
        IdentityBackend::JwtSecret { secret } => Arc::new(JwtVerifier::hs256(
            secret.as_bytes(),
            issuer,
            audience,
            config.leeway_seconds,
        )),
        IdentityBackend::Introspection {
            url,
            client_id,
            client_secret,
        } => {
            let mut verifier = IntrospectionVerifier::new(url.as_str()).map_err(|e| {
                tracing::error!(error = %e, "failed to build introspection HTTP client");
                ConfigError::Invalid("IDENTITY_INTROSPECTION_URL")
            })?;
            if let (Some(id), Some(secret)) = (client_id, client_secret) {
                verifier = verifier.with_client_credentials(id.as_str(), secret.as_str());
            }
            Arc::new(verifier)
        }
        IdentityBackend::StaticTokens { path } => {
            let verifier = StaticTokenVerifier::from_file(path).map_err(|e| {
                tracing::error!(error = %e, path = %path.display(), "failed to load static token table");
                ConfigError::Invalid("IDENTITY_STATIC_TOKENS_PATH")
            })?;
            tracing::warn!(
                tokens = verifier.len(),
                "using static token table; not for production"
            );
            Arc::new(verifier)
        }
    };

    tracing::info!(backend = verifier.backend_name(), "identity verifier ready");
    Ok(verifier)
}
