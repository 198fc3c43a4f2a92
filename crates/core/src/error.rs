use crate::types::DbId;

/// Domain error taxonomy for the loan workflow.
///
/// Workflow-discipline violations (`OutOfOrderSignature`, `AlreadySigned`,
/// `InvalidTransition`, `DuplicateGateAction`) are surfaced verbatim to the
/// caller and never retried. Custody conflicts carry the identifiers of the
/// conflicting entities so the caller can adjust its selection. `Retryable`
/// marks transient transaction contention with no side effects.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Request {request_id} is in state '{state}'; it is not the turn of role '{role}' to sign")]
    OutOfOrderSignature {
        request_id: DbId,
        role: String,
        state: String,
    },

    #[error("Role '{role}' has already signed request {request_id}")]
    AlreadySigned { request_id: DbId, role: String },

    #[error("Invalid transition for request {request_id}: {reason}")]
    InvalidTransition { request_id: DbId, reason: String },

    #[error("Assets unavailable for loan: {}", plates.join(", "))]
    UnavailableAsset { plates: Vec<String> },

    #[error("Custody assignment {assignment_id} is locked by an active loan")]
    AssetOnLoan { assignment_id: DbId },

    #[error("Asset {asset_id} already has an active custody assignment")]
    AlreadyAssigned { asset_id: DbId },

    #[error("Request {request_id} is in state '{state}', not approved")]
    RequestNotApproved { request_id: DbId, state: String },

    #[error("Request {request_id} already has a recorded '{direction}' gate event")]
    DuplicateGateAction {
        request_id: DbId,
        direction: String,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Transient conflict, safe to retry: {0}")]
    Retryable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
