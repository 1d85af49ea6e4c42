//! Process-wide decision between live and mock mode.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::{DirectoryClient, DirectoryError, GraphTokenSource, graph::GraphClient};
use crate::config::{DirectoryConfig, DirectoryCredentials};

/// Holds the live directory client, if one could be configured.
///
/// Initialization runs at most once. When credentials are incomplete the gate
/// stays unavailable for the lifetime of the process and both orchestrators
/// answer in mock mode.
#[derive(Default)]
pub struct DirectoryGate {
    client: OnceCell<Option<Arc<dyn DirectoryClient>>>,
}

impl std::fmt::Debug for DirectoryGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.client.get() {
            None => "uninitialized",
            Some(None) => "mock",
            Some(Some(_)) => "live",
        };
        f.debug_struct("DirectoryGate").field("state", &state).finish()
    }
}

impl DirectoryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate that already holds `client`.
    pub fn with_client(client: Arc<dyn DirectoryClient>) -> Self {
        Self {
            client: OnceCell::with_value(Some(client)),
        }
    }

    /// Gate that is permanently in mock mode.
    pub fn unavailable() -> Self {
        Self {
            client: OnceCell::with_value(None),
        }
    }

    /// Build the Graph client from configuration, once.
    ///
    /// Returns whether a live client is available. A failure to construct the
    /// credential is returned and leaves the gate uninitialized.
    pub fn initialize(
        &self,
        config: &DirectoryConfig,
        http: &reqwest::Client,
    ) -> Result<bool, DirectoryError> {
        self.initialize_with(config, |credentials| {
            let token = GraphTokenSource::from_credentials(credentials)?;
            let client = GraphClient::new(http.clone(), &config.graph_base_url, Arc::new(token))?;
            Ok(Arc::new(client) as Arc<dyn DirectoryClient>)
        })
    }

    fn initialize_with<F>(&self, config: &DirectoryConfig, build: F) -> Result<bool, DirectoryError>
    where
        F: FnOnce(DirectoryCredentials<'_>) -> Result<Arc<dyn DirectoryClient>, DirectoryError>,
    {
        let client = self.client.get_or_try_init(|| match config.credentials() {
            Some(credentials) => {
                let client = build(credentials)?;
                tracing::info!(
                    tenant_id = credentials.tenant_id,
                    graph_base_url = %config.graph_base_url,
                    "Directory client initialized"
                );
                Ok::<_, DirectoryError>(Some(client))
            }
            None => {
                tracing::warn!(
                    "Directory credentials not configured, running in mock mode. \
                     No accounts will be created or changed."
                );
                Ok(None)
            }
        })?;
        Ok(client.is_some())
    }

    /// Whether a live client exists. Never initializes.
    pub fn is_available(&self) -> bool {
        matches!(self.client.get(), Some(Some(_)))
    }

    /// The live client, if any.
    pub fn client(&self) -> Option<&Arc<dyn DirectoryClient>> {
        self.client.get()?.as_ref()
    }
}
