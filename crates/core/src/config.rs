//! Connection configuration for the remote backend service.
//!
//! The endpoint and access key are resolved from the environment once at
//! process start and then passed explicitly to everything that talks to the
//! remote service.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{CoreError, CoreResult};

/// Variables checked, in order, for the service endpoint
pub const ENDPOINT_VARS: &[&str] = &["SUPABASE_URL", "VITE_SUPABASE_URL"];

/// Variables checked for the elevated service-role key
pub const SERVICE_ROLE_KEY_VARS: &[&str] = &["SUPABASE_SERVICE_ROLE_KEY"];

/// Variables checked for the anonymous key, used only when no service-role key is set
pub const ANON_KEY_VARS: &[&str] = &["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value loaded from environment variable
    EnvVar(String),
    /// Value provided programmatically
    Programmatic,
}

impl ConfigSource {
    /// Get source description
    pub fn description(&self) -> String {
        match self {
            ConfigSource::EnvVar(var) => format!("Environment variable: {}", var),
            ConfigSource::Programmatic => "Programmatically set".to_string(),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Privilege level of the access key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Elevated key that bypasses row-level security
    ServiceRole,
    /// Public anonymous key
    Anonymous,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::ServiceRole => write!(f, "service-role"),
            CredentialKind::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Access key for the remote service
#[derive(Clone)]
pub struct Credential {
    kind: CredentialKind,
    key: String,
    source: ConfigSource,
}

impl Credential {
    pub fn new(kind: CredentialKind, key: impl Into<String>, source: ConfigSource) -> Self {
        Self {
            kind,
            key: key.into(),
            source,
        }
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Raw key, sent as both `apikey` and bearer token
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolved connection settings for one provisioning run
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    endpoint: Url,
    endpoint_source: ConfigSource,
    credential: Credential,
}

impl ProvisionConfig {
    /// Build a configuration from explicit values
    pub fn new(endpoint: &str, credential: Credential) -> CoreResult<Self> {
        Ok(Self {
            endpoint: parse_endpoint(endpoint)?,
            endpoint_source: ConfigSource::Programmatic,
            credential,
        })
    }

    /// Resolve the configuration from the process environment
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    ///
    /// Every missing variable group is reported in a single error so the
    /// operator can fix them all at once. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |names: &[&str]| -> Option<(String, String)> {
            names.iter().find_map(|name| {
                lookup(name)
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .map(|value| (name.to_string(), value))
            })
        };

        let endpoint = first_set(ENDPOINT_VARS);
        let credential = first_set(SERVICE_ROLE_KEY_VARS)
            .map(|(name, key)| Credential::new(CredentialKind::ServiceRole, key, ConfigSource::EnvVar(name)))
            .or_else(|| {
                first_set(ANON_KEY_VARS).map(|(name, key)| {
                    Credential::new(CredentialKind::Anonymous, key, ConfigSource::EnvVar(name))
                })
            });

        let mut missing = Vec::new();
        if endpoint.is_none() {
            missing.push(describe_group(ENDPOINT_VARS));
        }
        if credential.is_none() {
            let all_keys: Vec<&str> = SERVICE_ROLE_KEY_VARS
                .iter()
                .chain(ANON_KEY_VARS.iter())
                .copied()
                .collect();
            missing.push(describe_group(&all_keys));
        }

        match (endpoint, credential) {
            (Some((endpoint_var, endpoint)), Some(credential)) => {
                if credential.kind() == CredentialKind::Anonymous {
                    tracing::warn!(
                        "No service-role key set, falling back to the anonymous key from {}; DDL statements may be rejected",
                        credential.source()
                    );
                }
                Ok(Self {
                    endpoint: parse_endpoint(&endpoint)?,
                    endpoint_source: ConfigSource::EnvVar(endpoint_var),
                    credential,
                })
            }
            _ => Err(CoreError::missing_configuration(missing)),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn endpoint_source(&self) -> &ConfigSource {
        &self.endpoint_source
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Load a `.env` file from the working directory (or a parent), never
/// overriding variables that are already set.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

fn describe_group(names: &[&str]) -> String {
    match names.split_first() {
        Some((first, [])) => first.to_string(),
        Some((first, rest)) => format!("{} (or {})", first, rest.join(", ")),
        None => String::new(),
    }
}

fn parse_endpoint(raw: &str) -> CoreResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| CoreError::configuration(format!("Invalid service URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(CoreError::configuration(format!(
            "Service URL must use http or https, got '{}'",
            scheme
        ))),
    }
}
