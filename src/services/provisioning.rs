//! Account provisioning.
//!
//! Provisioning is fail-fast: an error creating the account, looking up the
//! license SKU or assigning it aborts the invocation. Only two things are
//! tolerated: a license SKU that does not exist (the license is skipped) and
//! failures inside the group loop (the group is skipped).

use std::sync::Arc;

use super::OperationContext;
use crate::{
    directory::{DirectoryClient, DirectoryError, DirectoryGate, NewAccount},
    identity::{generate_temporary_password, principal_name},
    mappings::{GroupMappingResolver, MappingError},
    models::{ProvisionRequest, ProvisionResult},
    observability::audit::{AuditEvent, AuditSink, AuditStatus, Operation},
};

pub const MOCK_USER_ID: &str = "mock-user-id";
pub const MOCK_GROUP_ID: &str = "mock-group-id";

/// Errors that abort a provision invocation.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Failed to {step}: {source}")]
    Directory {
        step: &'static str,
        #[source]
        source: DirectoryError,
    },
}

impl ProvisionError {
    fn directory(step: &'static str) -> impl FnOnce(DirectoryError) -> Self {
        move |source| ProvisionError::Directory { step, source }
    }
}

/// Creates accounts, assigns the default license and adds group memberships.
pub struct ProvisionService {
    gate: Arc<DirectoryGate>,
    mappings: Arc<GroupMappingResolver>,
    audit: Arc<dyn AuditSink>,
    domain: String,
    usage_location: String,
}

impl ProvisionService {
    pub fn new(
        gate: Arc<DirectoryGate>,
        mappings: Arc<GroupMappingResolver>,
        audit: Arc<dyn AuditSink>,
        domain: impl Into<String>,
        usage_location: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            mappings,
            audit,
            domain: domain.into(),
            usage_location: usage_location.into(),
        }
    }

    /// Provision an account for a validated request.
    ///
    /// Emits a `started` audit event, then exactly one of `success` or `error`.
    pub async fn provision(
        &self,
        ctx: &OperationContext,
        request: &ProvisionRequest,
    ) -> Result<ProvisionResult, ProvisionError> {
        let upn = principal_name(&request.first_name, &request.last_name, &self.domain);

        self.audit.record(
            &AuditEvent::new(Operation::Provision, AuditStatus::Started, ctx.correlation_id())
                .with_upn(&upn)
                .with_payload(request),
        );

        let result = match self.gate.client() {
            Some(client) => self.provision_live(client.as_ref(), ctx, request, &upn).await,
            None => {
                tracing::info!(%upn, "Directory unavailable, returning mock provision result");
                Ok(mock_result(ctx, upn.clone()))
            }
        };

        match &result {
            Ok(provisioned) => {
                tracing::info!(
                    %upn,
                    user_id = %provisioned.user_id,
                    groups = provisioned.groups.len(),
                    license_assigned = provisioned.license_assigned,
                    "Provision completed"
                );
                self.audit.record(
                    &AuditEvent::new(Operation::Provision, AuditStatus::Success, ctx.correlation_id())
                        .with_upn(&upn)
                        .with_result(provisioned),
                );
            }
            Err(e) => {
                tracing::error!(%upn, error = %e, "Provision failed");
                self.audit.record(
                    &AuditEvent::new(Operation::Provision, AuditStatus::Error, ctx.correlation_id())
                        .with_upn(&upn)
                        .with_error(e),
                );
            }
        }

        result
    }

    async fn provision_live(
        &self,
        client: &dyn DirectoryClient,
        ctx: &OperationContext,
        request: &ProvisionRequest,
        upn: &str,
    ) -> Result<ProvisionResult, ProvisionError> {
        // Loaded before any directory write.
        let mappings = self.mappings.load()?;

        let account = NewAccount {
            user_principal_name: upn.to_string(),
            display_name: request.display_name(),
            mail_nickname: request.mail_nickname(),
            given_name: request.first_name.clone(),
            surname: request.last_name.clone(),
            job_title: request.job_title.clone(),
            department: request.department.clone(),
            usage_location: self.usage_location.clone(),
            temporary_password: generate_temporary_password(),
        };

        tracing::info!(%upn, "Creating account");
        let created = ctx
            .policy
            .run(client.create_account(&account))
            .await
            .map_err(ProvisionError::directory("create account"))?;

        let sku = ctx
            .policy
            .run(client.find_license_sku(&mappings.default_license))
            .await
            .map_err(ProvisionError::directory("look up license SKU"))?;
        let license_assigned = match sku {
            Some(sku) => {
                ctx.policy
                    .run(client.assign_license(&created.id, &sku.sku_id))
                    .await
                    .map_err(ProvisionError::directory("assign license"))?;
                tracing::info!(sku_id = %sku.sku_id, "License assigned");
                true
            }
            None => {
                tracing::warn!(
                    license = %mappings.default_license,
                    "License SKU not found, skipping license assignment"
                );
                false
            }
        };

        let group_names = mappings.groups_for(request.mapping_role(), &request.department);
        let mut groups = Vec::with_capacity(group_names.len());
        for name in &group_names {
            match ctx.policy.run(client.find_group_by_name(name)).await {
                Ok(Some(group_id)) => {
                    match ctx
                        .policy
                        .run(client.add_group_member(&group_id, &created.id))
                        .await
                    {
                        Ok(()) => groups.push(group_id),
                        Err(e) => {
                            tracing::warn!(group = %name, error = %e, "Failed to add account to group")
                        }
                    }
                }
                Ok(None) => tracing::warn!(group = %name, "Group not found"),
                Err(e) => tracing::warn!(group = %name, error = %e, "Group lookup failed"),
            }
        }

        Ok(ProvisionResult {
            upn: upn.to_string(),
            correlation_id: ctx.correlation_id().to_string(),
            user_id: created.id,
            groups,
            license_assigned,
            message: "User provisioned successfully".to_string(),
        })
    }
}

fn mock_result(ctx: &OperationContext, upn: String) -> ProvisionResult {
    ProvisionResult {
        upn,
        correlation_id: ctx.correlation_id().to_string(),
        user_id: MOCK_USER_ID.to_string(),
        groups: vec![MOCK_GROUP_ID.to_string()],
        license_assigned: true,
        message: "User provisioned successfully (mock mode)".to_string(),
    }
}
