use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tms_core::{DomainError, DomainResult};
use tms_stages::StageId;

tms_core::record_id!(
    /// Team identifier.
    TeamId
);

/// A group of drivers, vehicles and crews working together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
    /// Sort key, lower first.
    pub sequence: i32,
    pub active: bool,
    /// Stages shown on the team board. New teams get the default-flagged stages.
    pub stage_ids: Vec<StageId>,
}

impl Team {
    pub fn new(name: impl Into<String>, stage_ids: Vec<StageId>) -> Self {
        Self {
            id: TeamId::generate(),
            name: name.into(),
            description: None,
            sequence: 1,
            active: true,
            stage_ids,
        }
    }
}

/// Derived team figures. Every field is zero (or empty) for a team without
/// matching records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamStats {
    /// Orders of the team in a stage that is not closed.
    pub order_count: usize,
    pub driver_count: usize,
    pub vehicle_count: usize,
    pub open_orders_by_stage: BTreeMap<StageId, usize>,
}

/// Name uniqueness among records of one kind (teams, tags). Comparison is
/// exact after trimming.
pub fn ensure_unique_name<'a>(
    kind: &str,
    name: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> DomainResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{kind} name cannot be empty")));
    }
    if existing.into_iter().any(|n| n.trim() == name) {
        return Err(DomainError::conflict(format!("{kind} name already exists: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_conflict() {
        let err = ensure_unique_name("team", " North ", ["North", "South"]).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(ensure_unique_name("team", "East", ["North"]).is_ok());
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = TeamStats::default();
        assert_eq!(stats.order_count, 0);
        assert!(stats.open_orders_by_stage.is_empty());
    }
}
