//! Gate ledger rules: exit/re-entry validation and physical state derivation.
//!
//! An asset's physical state is never stored on the asset row. It is derived
//! by folding the append-only gate event rows affecting that asset within
//! its most recent non-closed request, which removes the class of "stuck
//! asset" bugs a mutable current-location field would invite.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Direction of one gate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDirection {
    Exit,
    Reentry,
}

impl GateDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDirection::Exit => "exit",
            GateDirection::Reentry => "reentry",
        }
    }
}

impl fmt::Display for GateDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-asset movement recorded under one gate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetMovement {
    /// Left through the gate under an exit event.
    Exited,
    /// Listed on an exit event but stayed behind, with a recorded reason.
    Stayed,
    /// Came back through the gate under a re-entry event.
    Returned,
}

impl AssetMovement {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetMovement::Exited => "exited",
            AssetMovement::Stayed => "stayed",
            AssetMovement::Returned => "returned",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "exited" => Ok(AssetMovement::Exited),
            "stayed" => Ok(AssetMovement::Stayed),
            "returned" => Ok(AssetMovement::Returned),
            other => Err(CoreError::Internal(format!(
                "unknown asset movement '{other}' in database"
            ))),
        }
    }
}

/// Derived physical state of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalState {
    OnSite,
    OffSite,
}

/// Fold a chronological sequence of movement rows for one asset into its
/// physical state. No rows means the asset never moved: `ON_SITE`.
pub fn derive_physical_state(movements: &[AssetMovement]) -> PhysicalState {
    movements
        .iter()
        .fold(PhysicalState::OnSite, |_, movement| match movement {
            AssetMovement::Exited => PhysicalState::OffSite,
            AssetMovement::Stayed | AssetMovement::Returned => PhysicalState::OnSite,
        })
}

/// One asset of a request, identified for validation messages by its plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAssetRef {
    pub assignment_id: DbId,
    pub plate: String,
}

/// Validated outcome of an exit event: which assignments leave and which
/// stay behind with their recorded reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitPlan {
    pub leaving: Vec<DbId>,
    pub staying: Vec<(DbId, String)>,
}

/// Validate an exit against the request's asset set.
///
/// Every leaving assignment must belong to the request, and at least one
/// asset must actually leave (an exit that moves nothing is recorded as no
/// event at all). On a request with more than one asset, every asset left
/// behind needs a stated reason; a single-asset request needs none, since
/// "not leaving" would simply mean no exit event. A stay reason naming an
/// asset that is leaving, or one outside the request, is rejected rather
/// than dropped -- at the gate a mismatched reason means the guard and the
/// caller disagree about what is moving.
pub fn plan_exit(
    request_assets: &[RequestAssetRef],
    leaving: &[DbId],
    stay_reasons: &HashMap<DbId, String>,
) -> Result<ExitPlan, CoreError> {
    if leaving.is_empty() {
        return Err(CoreError::Validation(
            "an exit event must include at least one asset leaving".into(),
        ));
    }

    let known: HashMap<DbId, &str> = request_assets
        .iter()
        .map(|a| (a.assignment_id, a.plate.as_str()))
        .collect();

    let foreign: Vec<String> = leaving
        .iter()
        .filter(|id| !known.contains_key(id))
        .map(|id| format!("assignment {id}"))
        .collect();
    if !foreign.is_empty() {
        return Err(CoreError::Validation(format!(
            "assets not part of this request: {}",
            foreign.join(", ")
        )));
    }

    let mut plan = ExitPlan {
        leaving: Vec::new(),
        staying: Vec::new(),
    };
    for id in leaving {
        if !plan.leaving.contains(id) {
            plan.leaving.push(*id);
        }
    }

    let mut misplaced: Vec<String> = stay_reasons
        .keys()
        .filter_map(|id| match known.get(id) {
            Some(plate) if plan.leaving.contains(id) => Some((*plate).to_string()),
            Some(_) => None,
            None => Some(format!("assignment {id}")),
        })
        .collect();
    if !misplaced.is_empty() {
        misplaced.sort();
        return Err(CoreError::Validation(format!(
            "stay reasons name assets that are not staying behind: {}",
            misplaced.join(", ")
        )));
    }

    let mut missing_reasons = Vec::new();
    for asset in request_assets {
        if plan.leaving.contains(&asset.assignment_id) {
            continue;
        }
        match stay_reasons.get(&asset.assignment_id) {
            Some(reason) if !reason.trim().is_empty() => {
                plan.staying.push((asset.assignment_id, reason.clone()));
            }
            _ if request_assets.len() > 1 => missing_reasons.push(asset.plate.clone()),
            // Single-asset request left behind entirely is rejected above
            // (empty `leaving`), so this arm is unreachable in practice.
            _ => plan.staying.push((asset.assignment_id, String::new())),
        }
    }

    if !missing_reasons.is_empty() {
        return Err(CoreError::Validation(format!(
            "a reason is required for each asset staying behind: {}",
            missing_reasons.join(", ")
        )));
    }

    Ok(plan)
}

/// Validate a re-entry against the set of assets currently off-site under
/// the request. Returns the deduplicated assignment ids returning.
pub fn plan_reentry(
    off_site: &[RequestAssetRef],
    returning: &[DbId],
) -> Result<Vec<DbId>, CoreError> {
    if returning.is_empty() {
        return Err(CoreError::Validation(
            "a re-entry event must include at least one asset returning".into(),
        ));
    }

    let off_site_ids: Vec<DbId> = off_site.iter().map(|a| a.assignment_id).collect();
    let invalid: Vec<String> = returning
        .iter()
        .filter(|id| !off_site_ids.contains(id))
        .map(|id| format!("assignment {id}"))
        .collect();
    if !invalid.is_empty() {
        return Err(CoreError::Validation(format!(
            "assets not currently off-site under this request: {}",
            invalid.join(", ")
        )));
    }

    let mut ids = Vec::new();
    for id in returning {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn asset(id: DbId, plate: &str) -> RequestAssetRef {
        RequestAssetRef {
            assignment_id: id,
            plate: plate.to_string(),
        }
    }

    #[test]
    fn test_single_asset_exit_needs_no_reason() {
        let assets = vec![asset(1, "P-001")];
        let plan = plan_exit(&assets, &[1], &HashMap::new()).unwrap();
        assert_eq!(plan.leaving, vec![1]);
        assert!(plan.staying.is_empty());
    }

    #[test]
    fn test_multi_asset_exit_requires_reason_for_stayed() {
        let assets = vec![asset(1, "P-001"), asset(2, "P-002")];

        // No reason for the asset staying behind: rejected, names the plate.
        let err = plan_exit(&assets, &[1], &HashMap::new()).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("P-002"));

        // Retry with a reason: succeeds, records the reason.
        let reasons = HashMap::from([(2, "too heavy for transport".to_string())]);
        let plan = plan_exit(&assets, &[1], &reasons).unwrap();
        assert_eq!(plan.leaving, vec![1]);
        assert_eq!(plan.staying, vec![(2, "too heavy for transport".to_string())]);
    }

    #[test]
    fn test_blank_reason_is_not_a_reason() {
        let assets = vec![asset(1, "P-001"), asset(2, "P-002")];
        let reasons = HashMap::from([(2, "   ".to_string())]);
        let err = plan_exit(&assets, &[1], &reasons).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn test_stay_reason_must_name_an_asset_actually_staying() {
        let assets = vec![asset(1, "P-001"), asset(2, "P-002")];

        // Reason attached to the asset that is leaving.
        let reasons = HashMap::from([
            (1, "left behind".to_string()),
            (2, "in repair".to_string()),
        ]);
        let err = plan_exit(&assets, &[1], &reasons).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("P-001"));

        // Reason naming an assignment outside the request.
        let reasons = HashMap::from([
            (2, "in repair".to_string()),
            (42, "stray".to_string()),
        ]);
        let err = plan_exit(&assets, &[1], &reasons).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("42"));
    }

    #[test]
    fn test_exit_rejects_foreign_assets() {
        let assets = vec![asset(1, "P-001")];
        let err = plan_exit(&assets, &[1, 42], &HashMap::new()).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("42"));
    }

    #[test]
    fn test_exit_with_nothing_leaving_is_rejected() {
        let assets = vec![asset(1, "P-001")];
        let err = plan_exit(&assets, &[], &HashMap::new()).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn test_exit_deduplicates_leaving_list() {
        let assets = vec![asset(1, "P-001")];
        let plan = plan_exit(&assets, &[1, 1, 1], &HashMap::new()).unwrap();
        assert_eq!(plan.leaving, vec![1]);
    }

    #[test]
    fn test_reentry_only_accepts_off_site_assets() {
        let off_site = vec![asset(1, "P-001")];

        assert_eq!(plan_reentry(&off_site, &[1]).unwrap(), vec![1]);

        // Asset 2 never exited.
        let err = plan_reentry(&off_site, &[1, 2]).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("2"));

        let err = plan_reentry(&off_site, &[]).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn test_physical_state_derivation() {
        use AssetMovement::*;

        assert_eq!(derive_physical_state(&[]), PhysicalState::OnSite);
        assert_eq!(derive_physical_state(&[Exited]), PhysicalState::OffSite);
        assert_eq!(derive_physical_state(&[Stayed]), PhysicalState::OnSite);
        assert_eq!(
            derive_physical_state(&[Exited, Returned]),
            PhysicalState::OnSite
        );
    }
}
