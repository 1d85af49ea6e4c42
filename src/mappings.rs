//! Role and department to group mapping table.
//!
//! The table is a JSON document:
//!
//! ```json
//! {
//!   "roleMappings": { "Engineer": { "groups": ["Engineering", "VPN Users"] } },
//!   "departmentMappings": { "IT": { "groups": ["IT Staff", "VPN Users"] } },
//!   "defaultLicense": "ENTERPRISEPACK"
//! }
//! ```
//!
//! It is read on first use and kept for the lifetime of the process.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use once_cell::sync::OnceCell;
use serde::Deserialize;

/// Errors loading the mapping table. These are configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Failed to read group mappings {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid group mappings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupList {
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Parsed mapping table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMappings {
    #[serde(default)]
    pub role_mappings: HashMap<String, GroupList>,
    #[serde(default)]
    pub department_mappings: HashMap<String, GroupList>,
    /// License name matched against the tenant's subscribed SKUs.
    pub default_license: String,
}

impl GroupMappings {
    /// Group names for a role and department. Unknown keys contribute nothing;
    /// duplicates are removed keeping the first occurrence.
    pub fn groups_for(&self, role: &str, department: &str) -> Vec<String> {
        let role_groups = self.role_mappings.get(role).map(|g| g.groups.as_slice());
        let department_groups = self
            .department_mappings
            .get(department)
            .map(|g| g.groups.as_slice());

        let mut groups: Vec<String> = Vec::new();
        for group in role_groups
            .into_iter()
            .chain(department_groups)
            .flatten()
        {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
        groups
    }
}

/// Lazily loaded, process-wide mapping table.
#[derive(Debug)]
pub struct GroupMappingResolver {
    path: PathBuf,
    table: OnceCell<GroupMappings>,
}

impl GroupMappingResolver {
    /// Create a resolver reading from `path` on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: OnceCell::new(),
        }
    }

    /// Create a resolver from an already parsed table.
    pub fn from_mappings(mappings: GroupMappings) -> Self {
        Self {
            path: PathBuf::new(),
            table: OnceCell::with_value(mappings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the table if it has not been loaded yet.
    ///
    /// A failed load is not cached; the next call tries again.
    pub fn load(&self) -> Result<&GroupMappings, MappingError> {
        self.table.get_or_try_init(|| {
            let table = read_mappings(&self.path)?;
            tracing::debug!(
                path = %self.path.display(),
                roles = table.role_mappings.len(),
                departments = table.department_mappings.len(),
                "Loaded group mappings"
            );
            Ok(table)
        })
    }

    /// Group names for a role and department.
    pub fn resolve(&self, role: &str, department: &str) -> Result<Vec<String>, MappingError> {
        Ok(self.load()?.groups_for(role, department))
    }

    /// The license name new accounts receive.
    pub fn default_license(&self) -> Result<&str, MappingError> {
        Ok(&self.load()?.default_license)
    }
}

fn read_mappings(path: &Path) -> Result<GroupMappings, MappingError> {
    let contents = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| MappingError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
