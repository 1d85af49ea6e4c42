//! Provisioning and rollback orchestration.

mod context;
mod provisioning;
mod rollback;

use std::sync::Arc;

pub use context::{CallPolicy, OperationContext};
pub use provisioning::{MOCK_GROUP_ID, MOCK_USER_ID, ProvisionError, ProvisionService};
pub use rollback::RollbackService;

use crate::{
    config::DirectoryConfig, directory::DirectoryGate, mappings::GroupMappingResolver,
    observability::audit::AuditSink,
};

/// Container for the orchestrators.
pub struct Services {
    pub provisioning: ProvisionService,
    pub rollback: RollbackService,
}

impl Services {
    pub fn new(
        gate: Arc<DirectoryGate>,
        mappings: Arc<GroupMappingResolver>,
        audit: Arc<dyn AuditSink>,
        directory: &DirectoryConfig,
    ) -> Self {
        Self {
            provisioning: ProvisionService::new(
                gate.clone(),
                mappings,
                audit.clone(),
                &directory.domain,
                &directory.usage_location,
            ),
            rollback: RollbackService::new(gate, audit),
        }
    }
}
