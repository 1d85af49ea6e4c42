use serde::{Deserialize, Serialize};

/// A validated request to provision a new employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub department: String,
    /// Explicit role used for group mapping; falls back to `job_title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Free text, recorded for audit only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
}

impl ProvisionRequest {
    /// Role key used for the group mapping lookup.
    pub fn mapping_role(&self) -> &str {
        self.role.as_deref().unwrap_or(&self.job_title)
    }

    /// `First Last`
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Lowercased `first.last`.
    pub fn mail_nickname(&self) -> String {
        format!("{}.{}", self.first_name, self.last_name).to_lowercase()
    }
}

/// Result of a successful provision call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResult {
    pub upn: String,
    pub correlation_id: String,
    pub user_id: String,
    /// Identifiers of the groups the account was actually added to.
    pub groups: Vec<String>,
    pub license_assigned: bool,
    pub message: String,
}
