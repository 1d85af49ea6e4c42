//! Directory capability used by the orchestrators.
//!
//! [`DirectoryClient`] is the narrow set of tenant operations provisioning and
//! rollback need. [`graph::GraphClient`] binds it to the Microsoft Graph REST
//! API; [`DirectoryGate`] decides once per process whether a live client
//! exists at all.

mod error;
mod gate;
pub mod graph;
mod token;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
pub use error::DirectoryError;
pub use gate::DirectoryGate;
use serde::{Deserialize, Serialize};
pub use token::{GRAPH_SCOPE, GraphTokenSource, TokenProvider};

/// Attributes of an account to create.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub user_principal_name: String,
    pub display_name: String,
    pub mail_nickname: String,
    pub given_name: String,
    pub surname: String,
    pub job_title: String,
    pub department: String,
    pub usage_location: String,
    #[serde(skip)]
    pub temporary_password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("user_principal_name", &self.user_principal_name)
            .field("display_name", &self.display_name)
            .field("mail_nickname", &self.mail_nickname)
            .field("job_title", &self.job_title)
            .field("department", &self.department)
            .field("usage_location", &self.usage_location)
            .finish_non_exhaustive()
    }
}

/// An account that exists in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryAccount {
    pub id: String,
    #[serde(default)]
    pub user_principal_name: String,
}

/// A license SKU the tenant subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSku {
    pub sku_id: String,
    #[serde(default)]
    pub sku_part_number: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl LicenseSku {
    /// Whether the part number or display name contains `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.sku_part_number.contains(name)
            || self
                .display_name
                .as_deref()
                .is_some_and(|display| display.contains(name))
    }
}

/// Tenant operations needed to provision and roll back an employee.
///
/// Implementations perform exactly one remote operation per call and never
/// retry.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Create an enabled account that must change its password at first sign-in.
    async fn create_account(&self, account: &NewAccount) -> Result<DirectoryAccount, DirectoryError>;

    /// Look up an account by id or principal name. `Ok(None)` when it does not exist.
    async fn get_account(&self, id_or_upn: &str) -> Result<Option<DirectoryAccount>, DirectoryError>;

    /// Disable sign-in for an account.
    async fn disable_account(&self, account_id: &str) -> Result<(), DirectoryError>;

    /// Find a group id by exact display name. `Ok(None)` when no group matches.
    async fn find_group_by_name(&self, name: &str) -> Result<Option<String>, DirectoryError>;

    async fn add_group_member(&self, group_id: &str, account_id: &str) -> Result<(), DirectoryError>;

    async fn remove_group_member(&self, group_id: &str, account_id: &str)
    -> Result<(), DirectoryError>;

    /// License SKUs the tenant subscribes to.
    async fn subscribed_skus(&self) -> Result<Vec<LicenseSku>, DirectoryError>;

    async fn assign_license(&self, account_id: &str, sku_id: &str) -> Result<(), DirectoryError>;

    async fn remove_license(&self, account_id: &str, sku_id: &str) -> Result<(), DirectoryError>;

    /// First subscribed SKU whose part number or display name contains `name`.
    ///
    /// A missing SKU is `Ok(None)`, not an error.
    async fn find_license_sku(&self, name: &str) -> Result<Option<LicenseSku>, DirectoryError> {
        Ok(self
            .subscribed_skus()
            .await?
            .into_iter()
            .find(|sku| sku.matches(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(part: &str, display: Option<&str>) -> LicenseSku {
        LicenseSku {
            sku_id: format!("{part}-id"),
            sku_part_number: part.into(),
            display_name: display.map(Into::into),
        }
    }

    #[test]
    fn test_sku_matches_part_number_or_display_name() {
        assert!(sku("ENTERPRISEPACK", None).matches("ENTERPRISE"));
        assert!(sku("SPE_E3", Some("Microsoft 365 E3")).matches("365 E3"));
        assert!(!sku("SPE_E3", None).matches("ENTERPRISEPACK"));
        assert!(!sku("spe_e3", None).matches("SPE_E3"), "match is case sensitive");
    }

    #[test]
    fn test_new_account_never_serializes_password() {
        let account = NewAccount {
            user_principal_name: "jane.doe@contoso.com".into(),
            display_name: "Jane Doe".into(),
            mail_nickname: "jane.doe".into(),
            given_name: "Jane".into(),
            surname: "Doe".into(),
            job_title: "Engineer".into(),
            department: "IT".into(),
            usage_location: "US".into(),
            temporary_password: "Secr3t!Secr3t!xx".into(),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("Secr3t"));
        assert!(!format!("{account:?}").contains("Secr3t"));
        assert!(json.contains("\"userPrincipalName\":\"jane.doe@contoso.com\""));
    }
}
