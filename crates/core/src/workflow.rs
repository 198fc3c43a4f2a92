//! Request lifecycle state machine.
//!
//! A loan request advances through an ordered chain of three signatures:
//! custodian, then coordinator, then administrator. The status is modelled
//! as one closed variant set instead of per-role booleans, so illegal
//! combinations (coordinator signed but custodian not) are unrepresentable.
//!
//! `REJECTED` and `CANCELLED` are terminal absorbing states. A negative
//! signature from any role rejects the request permanently; cancellation is
//! only possible while still `PENDING`, and only by the original requester.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Lifecycle state of a loan request, derived from its signature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    SignedCustodian,
    SignedCoordinator,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::SignedCustodian => "signed_custodian",
            RequestState::SignedCoordinator => "signed_coordinator",
            RequestState::Approved => "approved",
            RequestState::Rejected => "rejected",
            RequestState::Cancelled => "cancelled",
        }
    }

    /// Parse a persisted state string.
    ///
    /// The `loan_requests.state` column carries a CHECK constraint over the
    /// same value set, so an unknown string here means schema drift.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "pending" => Ok(RequestState::Pending),
            "signed_custodian" => Ok(RequestState::SignedCustodian),
            "signed_coordinator" => Ok(RequestState::SignedCoordinator),
            "approved" => Ok(RequestState::Approved),
            "rejected" => Ok(RequestState::Rejected),
            "cancelled" => Ok(RequestState::Cancelled),
            other => Err(CoreError::Internal(format!(
                "unknown request state '{other}' in database"
            ))),
        }
    }

    /// Whether this state absorbs all further signature attempts.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Rejected | RequestState::Cancelled)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three ordered signature slots of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    Custodian,
    Coordinator,
    Administrator,
}

impl SignerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerRole::Custodian => "custodian",
            SignerRole::Coordinator => "coordinator",
            SignerRole::Administrator => "administrator",
        }
    }

    /// Parse a role name supplied by a caller.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "custodian" => Ok(SignerRole::Custodian),
            "coordinator" => Ok(SignerRole::Coordinator),
            "administrator" => Ok(SignerRole::Administrator),
            other => Err(CoreError::Validation(format!(
                "'{other}' is not a signing role (expected custodian, coordinator or administrator)"
            ))),
        }
    }

    /// The request state during which this role's signature is due.
    pub fn signs_from(&self) -> RequestState {
        match self {
            SignerRole::Custodian => RequestState::Pending,
            SignerRole::Coordinator => RequestState::SignedCustodian,
            SignerRole::Administrator => RequestState::SignedCoordinator,
        }
    }

    /// The state a positive signature from this role advances the request to.
    fn advances_to(&self) -> RequestState {
        match self {
            SignerRole::Custodian => RequestState::SignedCustodian,
            SignerRole::Coordinator => RequestState::SignedCoordinator,
            SignerRole::Administrator => RequestState::Approved,
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the state a request moves to when `role` signs it.
///
/// A role may only sign while the request sits in exactly the state that
/// role is responsible for; any other combination is an
/// [`CoreError::OutOfOrderSignature`]. A duplicate signature by the same
/// role is detected by the caller against the persisted signature set (and
/// backed by a uniqueness constraint) before this function is consulted.
///
/// A negative signature moves the request to `Rejected` regardless of which
/// role signed. Reaching the administrator's positive signature yields
/// `Approved`; approval itself changes no asset state, since physical
/// movement is recorded separately at the gate.
pub fn apply_signature(
    request_id: DbId,
    current: RequestState,
    role: SignerRole,
    approve: bool,
) -> Result<RequestState, CoreError> {
    if current != role.signs_from() {
        return Err(CoreError::OutOfOrderSignature {
            request_id,
            role: role.as_str().to_string(),
            state: current.as_str().to_string(),
        });
    }

    Ok(if approve {
        role.advances_to()
    } else {
        RequestState::Rejected
    })
}

/// Validate a cancellation attempt.
///
/// Only the original requester may cancel, and only while the request is
/// still `PENDING`. Everything else is an [`CoreError::InvalidTransition`].
pub fn validate_cancel(
    request_id: DbId,
    current: RequestState,
    requester_id: DbId,
    caller_id: DbId,
) -> Result<(), CoreError> {
    if current != RequestState::Pending {
        return Err(CoreError::InvalidTransition {
            request_id,
            reason: format!(
                "only pending requests can be cancelled (current state is '{current}')"
            ),
        });
    }
    if requester_id != caller_id {
        return Err(CoreError::InvalidTransition {
            request_id,
            reason: format!(
                "only the original requester (user {requester_id}) may cancel"
            ),
        });
    }
    Ok(())
}

/// Validate the shared metadata of a submission before any request is created.
pub fn validate_submission(
    destination: &str,
    reason: &str,
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
    asset_count: usize,
) -> Result<(), CoreError> {
    if destination.trim().is_empty() {
        return Err(CoreError::Validation("destination must not be empty".into()));
    }
    if reason.trim().is_empty() {
        return Err(CoreError::Validation("reason must not be empty".into()));
    }
    if end_date < start_date {
        return Err(CoreError::Validation(format!(
            "loan end date {end_date} is before start date {start_date}"
        )));
    }
    if asset_count == 0 {
        return Err(CoreError::Validation(
            "a request must include at least one asset".into(),
        ));
    }
    Ok(())
}
