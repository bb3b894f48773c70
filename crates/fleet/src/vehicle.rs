use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::partner::PartnerId;
use crate::team::TeamId;

tms_core::record_id!(
    /// Vehicle identifier.
    VehicleId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Bike,
    /// Cargo vehicle pulling trailers.
    Tractor,
    Trailer,
}

/// Fleet vehicle as seen by TMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub name: String,
    pub license_plate: Option<String>,
    pub vehicle_type: VehicleType,
    pub driver_id: Option<PartnerId>,
    pub team_id: Option<TeamId>,
    /// Trailer usually coupled to this vehicle.
    pub trailer_id: Option<VehicleId>,
    pub insurance_expiration: Option<NaiveDate>,
}

impl Vehicle {
    pub fn new(name: impl Into<String>, vehicle_type: VehicleType) -> Self {
        Self {
            id: VehicleId::generate(),
            name: name.into(),
            license_plate: None,
            vehicle_type,
            driver_id: None,
            team_id: None,
            trailer_id: None,
            insurance_expiration: None,
        }
    }

    pub fn is_trailer(&self) -> bool {
        self.vehicle_type == VehicleType::Trailer
    }

    /// Whether the insurance expires on or before `today + days`.
    pub fn insurance_expires_within(&self, today: NaiveDate, days: u32) -> bool {
        let Some(expiration) = self.insurance_expiration else {
            return false;
        };
        today
            .checked_add_days(Days::new(u64::from(days)))
            .is_some_and(|limit| expiration <= limit)
    }
}
