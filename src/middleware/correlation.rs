//! Correlation id middleware.
//!
//! Every invocation gets a fresh correlation id. It is stored in the request
//! extensions for handlers, attached to a `tracing` span wrapping the whole
//! request, and echoed back in the `X-Correlation-Id` response header.
//! Handlers also copy it into every response body.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for the correlation id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Extension containing the correlation id for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Generate a new correlation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing id.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Middleware that assigns a correlation id to each request.
///
/// Incoming `X-Correlation-Id` headers are ignored: the id identifies this
/// invocation, and the id of an earlier provision travels in the rollback
/// body as `correlationId` instead.
pub async fn correlation_middleware(mut req: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::new();

    req.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = correlation_id.0.parse() {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}
