//! In-memory [`DirectoryClient`] for orchestrator tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use super::{DirectoryAccount, DirectoryClient, DirectoryError, LicenseSku, NewAccount};

#[derive(Default)]
struct State {
    calls: Vec<String>,
    failing: HashSet<&'static str>,
    groups: HashMap<String, String>,
    skus: Vec<LicenseSku>,
    accounts: HashMap<String, String>,
    members: HashSet<(String, String)>,
    licenses: HashSet<(String, String)>,
    disabled: HashSet<String>,
    delay: Option<Duration>,
}

/// Records every call and fails the operations named with [`FakeDirectory::fail`].
#[derive(Default)]
pub(crate) struct FakeDirectory {
    state: Mutex<State>,
}

impl FakeDirectory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_group(self, name: &str, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .groups
            .insert(name.to_string(), id.to_string());
        self
    }

    pub(crate) fn with_sku(self, sku_id: &str, part_number: &str) -> Self {
        self.state.lock().unwrap().skus.push(LicenseSku {
            sku_id: sku_id.to_string(),
            sku_part_number: part_number.to_string(),
            display_name: None,
        });
        self
    }

    pub(crate) fn with_account(self, upn: &str, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(upn.to_string(), id.to_string());
        self
    }

    /// Make every call to `operation` fail.
    pub(crate) fn fail(self, operation: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(operation);
        self
    }

    /// Delay every call by `delay` before answering.
    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    /// Calls made so far, as `operation` or `operation:arg,arg`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn is_member(&self, group_id: &str, account_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .members
            .contains(&(group_id.to_string(), account_id.to_string()))
    }

    pub(crate) fn has_license(&self, account_id: &str, sku_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .licenses
            .contains(&(account_id.to_string(), sku_id.to_string()))
    }

    pub(crate) fn is_disabled(&self, account_id: &str) -> bool {
        self.state.lock().unwrap().disabled.contains(account_id)
    }

    async fn enter(&self, operation: &'static str, args: &[&str]) -> Result<(), DirectoryError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(if args.is_empty() {
                operation.to_string()
            } else {
                format!("{operation}:{}", args.join(","))
            });
            if state.failing.contains(operation) {
                return Err(DirectoryError::Api {
                    status: 500,
                    code: "InternalServerError".into(),
                    message: format!("{operation} failed"),
                });
            }
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn create_account(&self, account: &NewAccount) -> Result<DirectoryAccount, DirectoryError> {
        self.enter("create_account", &[&account.user_principal_name])
            .await?;
        let id = format!("id-{}", account.mail_nickname);
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(account.user_principal_name.clone(), id.clone());
        Ok(DirectoryAccount {
            id,
            user_principal_name: account.user_principal_name.clone(),
        })
    }

    async fn get_account(&self, id_or_upn: &str) -> Result<Option<DirectoryAccount>, DirectoryError> {
        self.enter("get_account", &[id_or_upn]).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .accounts
            .get(id_or_upn)
            .map(|id| DirectoryAccount {
                id: id.clone(),
                user_principal_name: id_or_upn.to_string(),
            }))
    }

    async fn disable_account(&self, account_id: &str) -> Result<(), DirectoryError> {
        self.enter("disable_account", &[account_id]).await?;
        self.state
            .lock()
            .unwrap()
            .disabled
            .insert(account_id.to_string());
        Ok(())
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<String>, DirectoryError> {
        self.enter("find_group_by_name", &[name]).await?;
        Ok(self.state.lock().unwrap().groups.get(name).cloned())
    }

    async fn add_group_member(&self, group_id: &str, account_id: &str) -> Result<(), DirectoryError> {
        self.enter("add_group_member", &[group_id, account_id])
            .await?;
        self.state
            .lock()
            .unwrap()
            .members
            .insert((group_id.to_string(), account_id.to_string()));
        Ok(())
    }

    async fn remove_group_member(
        &self,
        group_id: &str,
        account_id: &str,
    ) -> Result<(), DirectoryError> {
        self.enter("remove_group_member", &[group_id, account_id])
            .await?;
        self.state
            .lock()
            .unwrap()
            .members
            .remove(&(group_id.to_string(), account_id.to_string()));
        Ok(())
    }

    async fn subscribed_skus(&self) -> Result<Vec<LicenseSku>, DirectoryError> {
        self.enter("subscribed_skus", &[]).await?;
        Ok(self.state.lock().unwrap().skus.clone())
    }

    async fn assign_license(&self, account_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        self.enter("assign_license", &[account_id, sku_id]).await?;
        self.state
            .lock()
            .unwrap()
            .licenses
            .insert((account_id.to_string(), sku_id.to_string()));
        Ok(())
    }

    async fn remove_license(&self, account_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        self.enter("remove_license", &[account_id, sku_id]).await?;
        self.state
            .lock()
            .unwrap()
            .licenses
            .remove(&(account_id.to_string(), sku_id.to_string()));
        Ok(())
    }
}
