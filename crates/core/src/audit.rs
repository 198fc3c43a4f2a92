//! Audit trail action-type constants.
//!
//! Every state transition in the workflow writes exactly one immutable audit
//! row inside the same transaction as the transition itself. These constants
//! name the actions; the rows feed the external audit-trail ("bitácora")
//! view.

/// Known action types for audit log entries.
pub mod action_types {
    pub const LOGIN: &str = "login";
    pub const ROLE_SWITCH: &str = "role_switch";
    pub const ASSET_CREATE: &str = "asset_create";
    pub const ASSET_UPDATE: &str = "asset_update";
    pub const ASSIGNMENT_CREATE: &str = "assignment_create";
    pub const ASSIGNMENT_RELEASE: &str = "assignment_release";
    pub const REQUEST_SUBMIT: &str = "request_submit";
    pub const REQUEST_SIGN: &str = "request_sign";
    pub const REQUEST_CANCEL: &str = "request_cancel";
    pub const GATE_EXIT: &str = "gate_exit";
    pub const GATE_REENTRY: &str = "gate_reentry";
}

/// Known entity types referenced by audit log entries.
pub mod entity_types {
    pub const ASSET: &str = "asset";
    pub const CUSTODY_ASSIGNMENT: &str = "custody_assignment";
    pub const LOAN_REQUEST: &str = "loan_request";
    pub const GATE_EVENT: &str = "gate_event";
    pub const USER: &str = "user";
}
