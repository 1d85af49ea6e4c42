//! HTTP surface: `POST /provision`, `POST /rollback` and `GET /health`.

pub mod health;
mod provision;
mod rollback;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
pub use provision::provision;
pub use rollback::rollback;
use serde::Serialize;
use serde_json::Value;

use crate::{
    AppState,
    middleware::CorrelationId,
    observability::audit::{AuditEvent, AuditStatus, Operation},
    validation::ValidationErrors,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/provision", post(provision))
        .route("/rollback", post(rollback))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationFailedBody {
    error: &'static str,
    details: Vec<String>,
    correlation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationFailedBody {
    error: &'static str,
    message: String,
    correlation_id: String,
}

/// Error responses of the provision and rollback endpoints.
#[derive(Debug)]
pub enum RouteError {
    /// 400 with every violation found in the payload.
    Validation {
        details: Vec<String>,
        correlation_id: CorrelationId,
    },
    /// 500 for an operation that could not complete.
    Failed {
        operation: Operation,
        message: String,
        correlation_id: CorrelationId,
    },
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            RouteError::Validation {
                details,
                correlation_id,
            } => (
                StatusCode::BAD_REQUEST,
                Json(ValidationFailedBody {
                    error: "Validation failed",
                    details,
                    correlation_id: correlation_id.0,
                }),
            )
                .into_response(),
            RouteError::Failed {
                operation,
                message,
                correlation_id,
            } => {
                let error = match operation {
                    Operation::Provision => "Provision failed",
                    Operation::Rollback => "Rollback failed",
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(OperationFailedBody {
                        error,
                        message,
                        correlation_id: correlation_id.0,
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl AppState {
    /// Parse a request body as JSON, recording an audit error when it is not.
    fn parse_body(
        &self,
        operation: Operation,
        correlation_id: &CorrelationId,
        body: &[u8],
    ) -> Result<Value, RouteError> {
        serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(error = %e, "Request body is not valid JSON");
            self.operation_failed(operation, correlation_id, format!("Invalid JSON body: {e}"))
        })
    }

    /// Record the validation failure and build the 400 response.
    fn validation_failed(
        &self,
        operation: Operation,
        correlation_id: &CorrelationId,
        errors: ValidationErrors,
    ) -> RouteError {
        tracing::info!(errors = %errors, "Validation failed");
        self.audit.record(
            &AuditEvent::new(operation, AuditStatus::Error, correlation_id.as_str())
                .with_error(&errors),
        );
        RouteError::Validation {
            details: errors.into_messages(),
            correlation_id: correlation_id.clone(),
        }
    }

    /// Record the failure and build the 500 response.
    fn operation_failed(
        &self,
        operation: Operation,
        correlation_id: &CorrelationId,
        message: String,
    ) -> RouteError {
        self.audit.record(
            &AuditEvent::new(operation, AuditStatus::Error, correlation_id.as_str())
                .with_error(&message),
        );
        RouteError::Failed {
            operation,
            message,
            correlation_id: correlation_id.clone(),
        }
    }
}
