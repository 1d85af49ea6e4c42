//! Per-invocation context shared by the orchestrators.

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{config::DirectoryConfig, directory::DirectoryError, middleware::CorrelationId};

/// Limits applied to every individual directory call.
///
/// The default policy imposes neither a deadline nor cancellation.
#[derive(Debug, Clone, Default)]
pub struct CallPolicy {
    deadline: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl CallPolicy {
    /// Policy derived from `directory.call_timeout_secs`.
    pub fn from_config(config: &DirectoryConfig) -> Self {
        match config.call_timeout_secs {
            Some(secs) => Self::default().with_deadline(Duration::from_secs(secs)),
            None => Self::default(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Run one directory call under this policy.
    pub async fn run<T, F>(&self, call: F) -> Result<T, DirectoryError>
    where
        F: Future<Output = Result<T, DirectoryError>>,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout(deadline, call)
                    .await
                    .map_err(|_| DirectoryError::DeadlineExceeded(deadline))?,
                None => call.await,
            }
        };

        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(DirectoryError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}

/// Correlation id and call policy for one provision or rollback invocation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub correlation_id: CorrelationId,
    pub policy: CallPolicy,
}

impl OperationContext {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            policy: CallPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn correlation_id(&self) -> &str {
        self.correlation_id.as_str()
    }
}
