/*
 * Responsibility
 * - Load process configuration from the environment (.env via dotenvy)
 * - Validate it once at startup (missing/invalid values fail the boot)
 * - Everything downstream receives immutable values built from here
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How an unreachable or slow identity backend is reported to the caller.
///
/// Chosen once per deployment and applied to every upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamPolicy {
    #[default]
    Unauthorized,
    GatewayTimeout,
}

impl UpstreamPolicy {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Which identity backend verifies bearer credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentityBackend {
    /// JWTs signed with Ed25519; holds the SPKI public key PEM.
    JwtEd25519 { public_key_pem: String },
    /// JWTs signed with HS256; holds the shared secret.
    JwtSecret { secret: String },
    /// Remote token introspection endpoint, optionally with client credentials.
    Introspection {
        url: String,
        client_id: Option<String>,
        client_secret: Option<String>,
    },
    /// In-memory token table loaded from a JSON file (development only).
    StaticTokens { path: PathBuf },
}

impl fmt::Debug for IdentityBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs
        match self {
            Self::JwtEd25519 { .. } => f.write_str("JwtEd25519"),
            Self::JwtSecret { .. } => f.write_str("JwtSecret"),
            Self::Introspection { url, client_id, .. } => f
                .debug_struct("Introspection")
                .field("url", url)
                .field("client_id", client_id)
                .finish(),
            Self::StaticTokens { path } => f.debug_struct("StaticTokens").field("path", path).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    // Only consulted by the JWT backends.
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
    pub verify_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub identity: IdentityConfig,
    pub upstream_policy: UpstreamPolicy,
    pub tenant_cross_check: bool,
    pub route_policy_path: Option<PathBuf>,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let backend = if let Some(pem) = var("IDENTITY_JWT_PUBLIC_KEY_PEM") {
            IdentityBackend::JwtEd25519 {
                public_key_pem: pem.replace("\\n", "\n"),
            }
        } else if let Some(secret) = var("IDENTITY_JWT_SECRET") {
            IdentityBackend::JwtSecret { secret }
        } else if let Some(url) = var("IDENTITY_INTROSPECTION_URL") {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid("IDENTITY_INTROSPECTION_URL"));
            }
            let client_id = var("IDENTITY_INTROSPECTION_CLIENT_ID");
            let client_secret = var("IDENTITY_INTROSPECTION_CLIENT_SECRET");
            // Both or neither.
            if client_id.is_some() != client_secret.is_some() {
                return Err(ConfigError::Missing(if client_id.is_some() {
                    "IDENTITY_INTROSPECTION_CLIENT_SECRET"
                } else {
                    "IDENTITY_INTROSPECTION_CLIENT_ID"
                }));
            }
            IdentityBackend::Introspection {
                url,
                client_id,
                client_secret,
            }
        } else if let Some(path) = var("IDENTITY_STATIC_TOKENS_PATH") {
            if app_env.is_production() {
                return Err(ConfigError::Invalid("IDENTITY_STATIC_TOKENS_PATH"));
            }
            IdentityBackend::StaticTokens {
                path: PathBuf::from(path),
            }
        } else {
            return Err(ConfigError::Missing("IDENTITY_JWT_PUBLIC_KEY_PEM"));
        };

        let (issuer, audience) = match &backend {
            IdentityBackend::StaticTokens { .. } | IdentityBackend::Introspection { .. } => {
                (var("IDENTITY_ISSUER"), var("IDENTITY_AUDIENCE"))
            }
            _ => (
                Some(var("IDENTITY_ISSUER").ok_or(ConfigError::Missing("IDENTITY_ISSUER"))?),
                Some(var("IDENTITY_AUDIENCE").ok_or(ConfigError::Missing("IDENTITY_AUDIENCE"))?),
            ),
        };

        let leeway_seconds = match var("IDENTITY_LEEWAY_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("IDENTITY_LEEWAY_SECONDS"))?,
            None => 60,
        };

        let verify_timeout_ms = match var("IDENTITY_VERIFY_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::Invalid("IDENTITY_VERIFY_TIMEOUT_MS"))?,
            None => 5_000,
        };

        let upstream_policy = match var("UPSTREAM_FAILURE_STATUS").as_deref().map(str::trim) {
            None | Some("401") => UpstreamPolicy::Unauthorized,
            Some("504") => UpstreamPolicy::GatewayTimeout,
            Some(_) => return Err(ConfigError::Invalid("UPSTREAM_FAILURE_STATUS")),
        };

        let tenant_cross_check = match var("TENANT_CROSS_CHECK")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("true") | Some("1") | Some("yes") => true,
            Some("false") | Some("0") | Some("no") => false,
            Some(_) => return Err(ConfigError::Invalid("TENANT_CROSS_CHECK")),
        };

        let route_policy_path = var("ROUTE_POLICY_PATH").map(PathBuf::from);

        let request_timeout_seconds = match var("REQUEST_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))?,
            None => 30,
        };

        // The verify deadline must expire first so the Authentication stage reports it.
        let verify_timeout = Duration::from_millis(verify_timeout_ms);
        let request_timeout = Duration::from_secs(request_timeout_seconds);
        if verify_timeout >= request_timeout {
            return Err(ConfigError::Invalid("IDENTITY_VERIFY_TIMEOUT_MS"));
        }

        Ok(Self {
            addr,
            app_env,
            identity: IdentityConfig {
                backend,
                issuer,
                audience,
                leeway_seconds,
                verify_timeout,
            },
            upstream_policy,
            tenant_cross_check,
            route_policy_path,
            request_timeout,
        })
    }
}
