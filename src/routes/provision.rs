use axum::{Extension, Json, extract::State};
use bytes::Bytes;

use super::RouteError;
use crate::{
    AppState,
    middleware::CorrelationId,
    models::ProvisionResult,
    observability::audit::Operation,
    services::OperationContext,
    validation::validate_provision,
};

/// Provision a new employee account.
///
/// 200 with the provision result, 400 when the payload is invalid, 500 when
/// the body is not JSON or a directory step fails.
#[tracing::instrument(name = "provision", skip_all)]
pub async fn provision(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    body: Bytes,
) -> Result<Json<ProvisionResult>, RouteError> {
    tracing::info!("Provision request received");

    let payload = state.parse_body(Operation::Provision, &correlation_id, &body)?;
    let request = validate_provision(&payload)
        .map_err(|errors| state.validation_failed(Operation::Provision, &correlation_id, errors))?;

    let ctx = OperationContext::new(correlation_id.clone()).with_policy(state.call_policy.clone());
    let result = state
        .services
        .provisioning
        .provision(&ctx, &request)
        .await
        .map_err(|e| RouteError::Failed {
            operation: Operation::Provision,
            message: e.to_string(),
            correlation_id,
        })?;

    Ok(Json(result))
}
