use serde::{Deserialize, Serialize};

use crate::partner::PartnerId;
use crate::team::TeamId;
use crate::vehicle::VehicleId;

tms_core::record_id!(
    /// Crew identifier.
    CrewId
);

/// Drivers assigned together, optionally with a default vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    pub id: CrewId,
    pub name: String,
    pub team_id: Option<TeamId>,
    pub driver_ids: Vec<PartnerId>,
    pub default_vehicle_id: Option<VehicleId>,
    pub active: bool,
}

impl Crew {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CrewId::generate(),
            name: name.into(),
            team_id: None,
            driver_ids: Vec::new(),
            default_vehicle_id: None,
            active: true,
        }
    }

    pub fn has_driver(&self, driver_id: PartnerId) -> bool {
        self.driver_ids.contains(&driver_id)
    }

    /// Vehicle to use when this crew is assigned: the caller's pick, else the
    /// crew default while the crew is active.
    pub fn vehicle_for(&self, chosen: Option<VehicleId>) -> Option<VehicleId> {
        chosen.or(if self.active { self.default_vehicle_id } else { None })
    }
}
