use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Environment variable holding the UPN domain suffix.
pub const DOMAIN_ENV: &str = "FTD_DOMAIN";
/// Environment variable holding the default usage location.
pub const USAGE_LOCATION_ENV: &str = "FTD_USAGE_LOCATION";
/// Environment variable holding the directory tenant id.
pub const TENANT_ID_ENV: &str = "GRAPH_TENANT_ID";
/// Environment variable holding the application (client) id.
pub const CLIENT_ID_ENV: &str = "GRAPH_CLIENT_ID";
/// Environment variable holding the application client secret.
pub const CLIENT_SECRET_ENV: &str = "GRAPH_CLIENT_SECRET";

/// Directory tenant configuration.
///
/// Credentials are optional: when any of `tenant_id`, `client_id` or
/// `client_secret` is missing the service starts in mock mode.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Domain suffix used to build user principal names.
    #[serde(default)]
    pub domain: String,

    /// Usage location assigned to new accounts (required for licensing).
    #[serde(default = "default_usage_location")]
    pub usage_location: String,

    /// Directory tenant id.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Application (client) id.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Application client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Base URL of the Graph API, including the version segment.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Deadline applied to every individual directory call, in seconds.
    ///
    /// Unset by default: directory calls run without a timeout override.
    #[serde(default)]
    pub call_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("domain", &self.domain)
            .field("usage_location", &self.usage_location)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "****"))
            .field("graph_base_url", &self.graph_base_url)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .finish()
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            usage_location: default_usage_location(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            graph_base_url: default_graph_base_url(),
            call_timeout_secs: None,
        }
    }
}

/// Complete set of client credentials for the directory.
#[derive(Clone, Copy)]
pub struct DirectoryCredentials<'a> {
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl DirectoryConfig {
    /// Returns the credentials if all three values are present and non-empty.
    pub fn credentials(&self) -> Option<DirectoryCredentials<'_>> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        Some(DirectoryCredentials {
            tenant_id: non_empty(&self.tenant_id)?,
            client_id: non_empty(&self.client_id)?,
            client_secret: non_empty(&self.client_secret)?,
        })
    }

    /// Fill values not set in the file from the given environment lookup.
    pub(crate) fn apply_env_overlay(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.domain.is_empty()
            && let Some(domain) = lookup(DOMAIN_ENV)
        {
            self.domain = domain;
        }
        if self.usage_location == default_usage_location()
            && let Some(location) = lookup(USAGE_LOCATION_ENV).filter(|v| !v.is_empty())
        {
            self.usage_location = location;
        }
        if self.tenant_id.is_none() {
            self.tenant_id = lookup(TENANT_ID_ENV);
        }
        if self.client_id.is_none() {
            self.client_id = lookup(CLIENT_ID_ENV);
        }
        if self.client_secret.is_none() {
            self.client_secret = lookup(CLIENT_SECRET_ENV);
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "directory.domain is required (or set {DOMAIN_ENV})"
            )));
        }
        if self.domain.contains('@') {
            return Err(ConfigError::Validation(
                "directory.domain must not contain '@'".into(),
            ));
        }
        url::Url::parse(&self.graph_base_url).map_err(|e| {
            ConfigError::Validation(format!("directory.graph_base_url is invalid: {e}"))
        })?;
        if self.call_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "directory.call_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_usage_location() -> String {
    "US".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}
