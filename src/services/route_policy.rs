//! Static role → permitted path mapping.
//!
//! Built once at startup (built-in default or a JSON file) and shared read-only
//! across requests. There is no reload path.
//!
//! JSON format:
//!
//! ```json
//! { "admin": "*", "user": ["/", "/health", "/version", "/user", "/reports/*"] }
//! ```
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const ADMIN_ROLE: &str = "admin";
pub const USER_ROLE: &str = "user";

/// Paths every `user` may reach by default.
pub const USER_PATHS: [&str; 4] = ["/", "/health", "/version", "/user"];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read route policy: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse route policy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("role '{0}' has an invalid grant (expected \"*\" or a list of paths)")]
    InvalidGrant(String),
    #[error("role '{role}' has an invalid path pattern '{pattern}'")]
    InvalidPattern { role: String, pattern: String },
    #[error("route policy contains an empty role name")]
    EmptyRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// `/reports/*`: matches `/reports` and everything below it.
    Prefix(String),
}

impl PathPattern {
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.starts_with('/') {
            return None;
        }
        match raw.strip_suffix("/*") {
            Some("") => Some(Self::Prefix(String::new())),
            Some(base) if base.contains('*') => None,
            Some(base) => Some(Self::Prefix(base.to_string())),
            None if raw.contains('*') => None,
            None => Some(Self::Exact(raw.to_string())),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => p == path,
            Self::Prefix(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleGrant {
    /// Every path, including ones no route is registered for.
    All,
    Paths(Vec<PathPattern>),
}

impl RoleGrant {
    pub fn permits(&self, path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Paths(patterns) => patterns.iter().any(|p| p.matches(path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    grants: HashMap<String, RoleGrant>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        let user_paths = USER_PATHS
            .iter()
            .map(|p| PathPattern::Exact((*p).to_string()))
            .collect();

        Self::new()
            .grant(ADMIN_ROLE, RoleGrant::All)
            .grant(USER_ROLE, RoleGrant::Paths(user_paths))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GrantSpec {
    Marker(String),
    Paths(Vec<String>),
}

impl RoutePolicy {
    /// An empty policy: every role is denied everywhere.
    pub fn new() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    pub fn grant(mut self, role: impl Into<String>, grant: RoleGrant) -> Self {
        self.grants.insert(role.into(), grant);
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let specs: HashMap<String, GrantSpec> = serde_json::from_str(raw)?;

        let mut policy = Self::new();
        for (role, spec) in specs {
            if role.trim().is_empty() {
                return Err(PolicyError::EmptyRole);
            }
            let grant = match spec {
                GrantSpec::Marker(marker) if marker == "*" => RoleGrant::All,
                GrantSpec::Marker(_) => return Err(PolicyError::InvalidGrant(role)),
                GrantSpec::Paths(paths) => {
                    let mut patterns = Vec::with_capacity(paths.len());
                    for raw in paths {
                        match PathPattern::parse(&raw) {
                            Some(pattern) => patterns.push(pattern),
                            None => {
                                return Err(PolicyError::InvalidPattern { role, pattern: raw });
                            }
                        }
                    }
                    RoleGrant::Paths(patterns)
                }
            };
            policy.grants.insert(role, grant);
        }

        Ok(policy)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Roles without a grant are denied on every path.
    pub fn is_allowed(&self, role: &str, path: &str) -> bool {
        self.grants
            .get(role)
            .is_some_and(|grant| grant.permits(path))
    }

    pub fn grant_for(&self, role: &str) -> Option<&RoleGrant> {
        self.grants.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }
}
