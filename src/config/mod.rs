//! Configuration module for the provisioner.
//!
//! The service is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. Values left unset in the
//! file are filled from the environment variables the function deployment
//! already uses (`FTD_DOMAIN`, `GRAPH_TENANT_ID`, ...).
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [directory]
//! domain = "contoso.com"
//! tenant_id = "${GRAPH_TENANT_ID}"
//! client_id = "${GRAPH_CLIENT_ID}"
//! client_secret = "${GRAPH_CLIENT_SECRET}"
//!
//! [mappings]
//! path = "config/group-mappings.json"
//! ```

mod directory;
mod mappings;
mod observability;
mod server;

use std::{path::Path, sync::LazyLock};

pub use directory::*;
pub use mappings::*;
pub use observability::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Root configuration for the provisioner.
///
/// All sections are optional with sensible defaults. A configuration without
/// directory credentials runs the service in mock mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ProvisionerConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Directory tenant, credentials and account defaults.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Role and department to group mapping table.
    #[serde(default)]
    pub mappings: MappingsConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ProvisionerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let mut config: ProvisionerConfig =
            toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.apply_env_overlay();
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration purely from defaults and the environment overlay.
    ///
    /// Used when no configuration file is given on the command line.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overlay();
        config.validate()?;
        Ok(config)
    }

    /// Fill unset values from the process environment.
    fn apply_env_overlay(&mut self) {
        self.directory.apply_env_overlay(|name| std::env::var(name).ok());
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.directory.validate()?;
        self.mappings.validate()?;
        Ok(())
    }

    /// Generate the JSON schema for the configuration file.
    #[cfg(feature = "json-schema")]
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ProvisionerConfig)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    static ENV_VAR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in ENV_VAR.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

/// Default configuration written by `provisioner init`.
pub fn default_config_toml() -> &'static str {
    r#"# Provisioner configuration
#
# Directory credentials may be given here or through GRAPH_TENANT_ID,
# GRAPH_CLIENT_ID and GRAPH_CLIENT_SECRET. Without all three the service
# runs in mock mode and never contacts the directory.

[server]
host = "127.0.0.1"
port = 8080

[directory]
# domain = "contoso.com"
usage_location = "US"

[mappings]
path = "config/group-mappings.json"

[observability.logging]
level = "info"
format = "compact"
"#
}
