use axum::{Extension, Json, extract::State};
use bytes::Bytes;

use super::RouteError;
use crate::{
    AppState,
    middleware::CorrelationId,
    models::RollbackOutcome,
    observability::audit::Operation,
    services::OperationContext,
    validation::validate_rollback,
};

/// Roll back a previous provisioning.
///
/// Once the payload validates this always answers 200; individual step
/// failures are reported in the outcome.
#[tracing::instrument(name = "rollback", skip_all)]
pub async fn rollback(
    State(state): State<AppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    body: Bytes,
) -> Result<Json<RollbackOutcome>, RouteError> {
    tracing::info!("Rollback request received");

    let payload = state.parse_body(Operation::Rollback, &correlation_id, &body)?;
    let request = validate_rollback(&payload)
        .map_err(|errors| state.validation_failed(Operation::Rollback, &correlation_id, errors))?;

    let ctx = OperationContext::new(correlation_id).with_policy(state.call_policy.clone());
    Ok(Json(state.services.rollback.rollback(&ctx, &request).await))
}
