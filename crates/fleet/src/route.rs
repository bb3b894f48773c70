use serde::{Deserialize, Serialize};

use crate::partner::PartnerId;

tms_core::record_id!(
    /// Route identifier.
    RouteId
);

/// Unit of a route time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUom {
    #[default]
    Hours,
    Days,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    Hub,
    Inland,
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    A,
    B,
}

/// Extended route attributes used by regional operations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteDetails {
    pub region_type: Option<RegionType>,
    pub operation_type: Option<OperationType>,
    pub restricted: bool,
    pub pickup: bool,
    pub delivery: bool,
    pub deadline_1: i32,
    pub deadline_2: i32,
    pub quantity: i32,
    pub td_value: f64,
    pub su_value: f64,
    pub pickup_value: f64,
    pub square: Option<String>,
}

/// Reusable origin/destination template with a time estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub origin_location_id: Option<PartnerId>,
    pub destination_location_id: Option<PartnerId>,
    pub estimated_time: f64,
    pub estimated_time_uom: TimeUom,
    pub active: bool,
    pub details: RouteDetails,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        origin_location_id: Option<PartnerId>,
        destination_location_id: Option<PartnerId>,
    ) -> Self {
        Self {
            id: RouteId::generate(),
            name: name.into(),
            origin_location_id,
            destination_location_id,
            estimated_time: 0.0,
            estimated_time_uom: TimeUom::Hours,
            active: true,
            details: RouteDetails::default(),
        }
    }

    pub fn with_estimate(mut self, estimated_time: f64, uom: TimeUom) -> Self {
        self.estimated_time = estimated_time;
        self.estimated_time_uom = uom;
        self
    }

    /// Estimate in hours.
    pub fn estimated_hours(&self) -> f64 {
        match self.estimated_time_uom {
            TimeUom::Hours => self.estimated_time,
            TimeUom::Days => self.estimated_time * 24.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_convert_to_hours() {
        let route = Route::new("Coast run", None, None).with_estimate(1.5, TimeUom::Days);
        assert_eq!(route.estimated_hours(), 36.0);

        let route = Route::new("City loop", None, None).with_estimate(3.0, TimeUom::Hours);
        assert_eq!(route.estimated_hours(), 3.0);
    }
}
