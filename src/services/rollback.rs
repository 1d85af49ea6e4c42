//! Best-effort reversal of a provisioning.
//!
//! Every step is attempted regardless of earlier failures, and each result
//! is recorded in the outcome. A rollback that ran to completion always
//! reports `rolledBack: true`; callers inspect the operation flags and steps
//! to see what was actually achieved.

use std::sync::Arc;

use super::OperationContext;
use crate::{
    directory::{DirectoryClient, DirectoryGate},
    models::{
        RollbackOperations, RollbackOutcome, RollbackRequest, RollbackStep, StepReport,
        StepStatus,
    },
    observability::audit::{AuditEvent, AuditSink, AuditStatus, Operation},
};

const ACCOUNT_NOT_RESOLVED: &str = "account not resolved";

/// Disables accounts and removes the license and group memberships they were given.
pub struct RollbackService {
    gate: Arc<DirectoryGate>,
    audit: Arc<dyn AuditSink>,
}

impl RollbackService {
    pub fn new(gate: Arc<DirectoryGate>, audit: Arc<dyn AuditSink>) -> Self {
        Self { gate, audit }
    }

    /// Roll back a provisioning. Never fails; see [`RollbackOutcome`].
    pub async fn rollback(&self, ctx: &OperationContext, request: &RollbackRequest) -> RollbackOutcome {
        let original = request.correlation_id.as_deref();

        self.audit.record(
            &AuditEvent::new(Operation::Rollback, AuditStatus::Started, ctx.correlation_id())
                .with_upn(&request.upn)
                .with_original_correlation_id(original)
                .with_payload(request),
        );

        let outcome = match self.gate.client() {
            Some(client) => rollback_live(client.as_ref(), ctx, request).await,
            None => {
                tracing::info!(upn = %request.upn, "Directory unavailable, returning mock rollback result");
                mock_outcome(ctx, request)
            }
        };

        tracing::info!(
            upn = %request.upn,
            original_correlation_id = original,
            user_disabled = outcome.operations.user_disabled,
            license_removed = outcome.operations.license_removed,
            failed_steps = outcome.failures().count(),
            "Rollback completed"
        );
        self.audit.record(
            &AuditEvent::new(Operation::Rollback, AuditStatus::Success, ctx.correlation_id())
                .with_upn(&request.upn)
                .with_original_correlation_id(original)
                .with_result(&outcome),
        );

        outcome
    }
}

async fn rollback_live(
    client: &dyn DirectoryClient,
    ctx: &OperationContext,
    request: &RollbackRequest,
) -> RollbackOutcome {
    let mut steps = Vec::new();
    let mut operations = RollbackOperations::default();
    let groups = request.groups.as_deref().unwrap_or_default();

    let account_id = match &request.user_id {
        Some(id) => Some(id.clone()),
        None => match ctx.policy.run(client.get_account(&request.upn)).await {
            Ok(Some(account)) => {
                steps.push(StepReport::succeeded(RollbackStep::ResolveAccount, &account.id));
                Some(account.id)
            }
            Ok(None) => {
                tracing::warn!(upn = %request.upn, "Account not found");
                steps.push(StepReport::failed(
                    RollbackStep::ResolveAccount,
                    &request.upn,
                    "account not found",
                ));
                None
            }
            Err(e) => {
                tracing::warn!(upn = %request.upn, error = %e, "Account lookup failed");
                steps.push(StepReport::failed(
                    RollbackStep::ResolveAccount,
                    &request.upn,
                    e,
                ));
                None
            }
        },
    };

    match account_id {
        Some(account_id) => {
            for group_id in groups {
                match ctx
                    .policy
                    .run(client.remove_group_member(group_id, &account_id))
                    .await
                {
                    Ok(()) => steps.push(StepReport::succeeded(
                        RollbackStep::RemoveGroupMember,
                        group_id,
                    )),
                    Err(e) => {
                        tracing::warn!(group_id = %group_id, error = %e, "Failed to remove group membership");
                        steps.push(StepReport::failed(
                            RollbackStep::RemoveGroupMember,
                            group_id,
                            e,
                        ));
                    }
                }
            }
            if let Some(groups) = &request.groups {
                operations.groups_removed = groups.clone();
            }

            if let Some(sku_id) = &request.license_sku_id {
                match ctx.policy.run(client.remove_license(&account_id, sku_id)).await {
                    Ok(()) => {
                        operations.license_removed = true;
                        steps.push(StepReport::succeeded(RollbackStep::RemoveLicense, sku_id));
                    }
                    Err(e) => {
                        tracing::warn!(sku_id = %sku_id, error = %e, "Failed to remove license");
                        steps.push(StepReport::failed(RollbackStep::RemoveLicense, sku_id, e));
                    }
                }
            }

            match ctx.policy.run(client.disable_account(&account_id)).await {
                Ok(()) => {
                    operations.user_disabled = true;
                    steps.push(StepReport::succeeded(
                        RollbackStep::DisableAccount,
                        &account_id,
                    ));
                }
                Err(e) => {
                    tracing::warn!(account_id = %account_id, error = %e, "Failed to disable account");
                    steps.push(StepReport::failed(
                        RollbackStep::DisableAccount,
                        &account_id,
                        e,
                    ));
                }
            }
        }
        None => {
            for group_id in groups {
                steps.push(StepReport::skipped(
                    RollbackStep::RemoveGroupMember,
                    Some(group_id.as_str()),
                    ACCOUNT_NOT_RESOLVED,
                ));
            }
            if let Some(sku_id) = &request.license_sku_id {
                steps.push(StepReport::skipped(
                    RollbackStep::RemoveLicense,
                    Some(sku_id.as_str()),
                    ACCOUNT_NOT_RESOLVED,
                ));
            }
            steps.push(StepReport::skipped(
                RollbackStep::DisableAccount,
                None,
                ACCOUNT_NOT_RESOLVED,
            ));
        }
    }

    if let Some(site_id) = &request.site_id {
        tracing::warn!(site_id = %site_id, "Site deletion is not supported, site left in place");
        steps.push(StepReport::skipped(
            RollbackStep::DeleteSite,
            Some(site_id.as_str()),
            "site deletion is not supported",
        ));
    }

    let failed = steps
        .iter()
        .filter(|s| s.status == StepStatus::Failed)
        .count();
    let message = if failed == 0 {
        "Rollback completed successfully".to_string()
    } else {
        format!("Rollback completed with {failed} failed step(s)")
    };

    RollbackOutcome {
        rolled_back: true,
        correlation_id: ctx.correlation_id().to_string(),
        upn: request.upn.clone(),
        original_correlation_id: request.correlation_id.clone(),
        operations,
        steps,
        message,
    }
}

fn mock_outcome(ctx: &OperationContext, request: &RollbackRequest) -> RollbackOutcome {
    RollbackOutcome {
        rolled_back: true,
        correlation_id: ctx.correlation_id().to_string(),
        upn: request.upn.clone(),
        original_correlation_id: request.correlation_id.clone(),
        operations: RollbackOperations {
            user_disabled: true,
            license_removed: true,
            groups_removed: request.groups.clone().unwrap_or_default(),
            site_deleted: request.site_id.is_some(),
        },
        steps: Vec::new(),
        message: "Rollback completed successfully (mock mode)".to_string(),
    }
}
