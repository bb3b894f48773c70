use serde::{Deserialize, Serialize};

use tms_fleet::{Crew, CrewId, PartnerId, Route, RouteId, TeamId, VehicleId};

/// Where a record travels: either a predefined route or ad hoc origin and
/// destination locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Itinerary {
    pub use_route: bool,
    pub route_id: Option<RouteId>,
    pub origin_id: Option<PartnerId>,
    pub destination_id: Option<PartnerId>,
    /// Effective locations, resolved by [`Itinerary::resolve`].
    pub origin_location_id: Option<PartnerId>,
    pub destination_location_id: Option<PartnerId>,
}

impl Itinerary {
    pub fn ad_hoc(origin_id: Option<PartnerId>, destination_id: Option<PartnerId>) -> Self {
        Self {
            origin_id,
            destination_id,
            ..Self::default()
        }
        .resolve(None)
    }

    pub fn via_route(route: &Route) -> Self {
        Self {
            use_route: true,
            route_id: Some(route.id),
            ..Self::default()
        }
        .resolve(Some(route))
    }

    /// Fill the effective locations. With the route flag and a route they
    /// come from the route, otherwise from the ad hoc fields.
    pub fn resolve(mut self, route: Option<&Route>) -> Self {
        match route.filter(|r| self.use_route && self.route_id == Some(r.id)) {
            Some(route) => {
                self.origin_location_id = route.origin_location_id;
                self.destination_location_id = route.destination_location_id;
            }
            None => {
                self.origin_location_id = self.origin_id;
                self.destination_location_id = self.destination_id;
            }
        }
        self
    }

    /// Turning the route flag on drops the ad hoc locations; turning it off
    /// drops the route.
    pub fn with_route_flag(mut self, use_route: bool) -> Self {
        self.use_route = use_route;
        if use_route {
            self.origin_id = None;
            self.destination_id = None;
        } else {
            self.route_id = None;
        }
        self
    }
}

/// Transport resources assigned to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub driver_id: Option<PartnerId>,
    pub vehicle_id: Option<VehicleId>,
    pub trailer_id: Option<VehicleId>,
    pub team_id: Option<TeamId>,
    pub crew_id: Option<CrewId>,
}

impl Resources {
    /// Apply the crew default vehicle when no vehicle was picked.
    pub fn with_crew_defaults(mut self, crew: Option<&Crew>) -> Self {
        if let Some(crew) = crew.filter(|c| Some(c.id) == self.crew_id) {
            self.vehicle_id = crew.vehicle_for(self.vehicle_id);
        }
        self
    }
}
