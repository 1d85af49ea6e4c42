use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Location of the role/department to group mapping table.
///
/// The table itself is read lazily on first use, so a missing file does not
/// prevent startup in mock mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct MappingsConfig {
    /// Path to the JSON mapping file.
    #[serde(default = "default_mappings_path")]
    pub path: PathBuf,
}

impl Default for MappingsConfig {
    fn default() -> Self {
        Self {
            path: default_mappings_path(),
        }
    }
}

impl MappingsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "mappings.path cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_mappings_path() -> PathBuf {
    PathBuf::from("config/group-mappings.json")
}
