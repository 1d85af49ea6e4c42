//! Employee identity provisioning and rollback service.
//!
//! `POST /provision` creates a directory account, assigns the default license
//! and adds role and department groups. `POST /rollback` reverses those
//! effects on a best-effort basis. Without directory credentials both
//! endpoints answer with mock results and never contact the directory.

pub mod config;
pub mod directory;
pub mod identity;
pub mod mappings;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod validation;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    config::ProvisionerConfig,
    directory::DirectoryGate,
    mappings::GroupMappingResolver,
    observability::audit::AuditSink,
    services::{CallPolicy, Services},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProvisionerConfig>,
    /// Live directory client, or mock mode for the lifetime of the process.
    pub gate: Arc<DirectoryGate>,
    pub services: Arc<Services>,
    pub audit: Arc<dyn AuditSink>,
    /// Applied to every directory call made while serving a request.
    pub call_policy: CallPolicy,
}

impl AppState {
    /// Build the state, reading the mapping table from the configured path on first use.
    pub fn new(config: ProvisionerConfig, gate: Arc<DirectoryGate>, audit: Arc<dyn AuditSink>) -> Self {
        let mappings = Arc::new(GroupMappingResolver::new(&config.mappings.path));
        Self::with_mappings(config, gate, mappings, audit)
    }

    pub fn with_mappings(
        config: ProvisionerConfig,
        gate: Arc<DirectoryGate>,
        mappings: Arc<GroupMappingResolver>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let services = Services::new(gate.clone(), mappings, audit.clone(), &config.directory);
        Self {
            call_policy: CallPolicy::from_config(&config.directory),
            config: Arc::new(config),
            gate,
            services: Arc::new(services),
            audit,
        }
    }
}

/// Router with all routes and middleware applied.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    routes::router()
        .layer(axum::middleware::from_fn(middleware::correlation_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
