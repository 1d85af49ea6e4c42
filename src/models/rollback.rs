use serde::{Deserialize, Serialize};

/// A validated request to reverse a provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub upn: String,
    /// Group identifiers to remove the account from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    /// Accepted but never acted upon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// Correlation id of the provision call being reversed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Account identifier; skips the lookup by UPN when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// License SKU to remove.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_sku_id: Option<String>,
}

/// Which effects a rollback achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOperations {
    pub user_disabled: bool,
    pub license_removed: bool,
    /// The group identifiers removal was attempted for. Per-group results are
    /// in [`RollbackOutcome::steps`].
    pub groups_removed: Vec<String>,
    pub site_deleted: bool,
}

/// The individual actions a rollback performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStep {
    ResolveAccount,
    RemoveGroupMember,
    RemoveLicense,
    DisableAccount,
    DeleteSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Result of one rollback action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: RollbackStep,
    /// Object the step acted on (group id, SKU id, account id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StepReport {
    pub fn succeeded(step: RollbackStep, target: &str) -> Self {
        Self {
            step,
            target: Some(target.to_owned()),
            status: StepStatus::Succeeded,
            reason: None,
        }
    }

    pub fn failed(step: RollbackStep, target: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            step,
            target: Some(target.to_owned()),
            status: StepStatus::Failed,
            reason: Some(reason.to_string()),
        }
    }

    pub fn skipped(step: RollbackStep, target: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            step,
            target: target.map(str::to_owned),
            status: StepStatus::Skipped,
            reason: Some(reason.into()),
        }
    }
}

/// Result of a rollback call. `rolled_back` is true whenever the call
/// completed, regardless of which steps succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub rolled_back: bool,
    pub correlation_id: String,
    pub upn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_correlation_id: Option<String>,
    pub operations: RollbackOperations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepReport>,
    pub message: String,
}

impl RollbackOutcome {
    /// Reports of the steps that failed.
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }
}
