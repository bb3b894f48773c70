//! Selectable drivers, vehicles and crews for an order or shipment.

use serde::{Deserialize, Serialize};

use crate::crew::{Crew, CrewId};
use crate::partner::{Partner, PartnerId};
use crate::team::TeamId;
use crate::vehicle::{Vehicle, VehicleId};

/// Candidate lists offered when assigning resources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssignmentDomain {
    pub driver_ids: Vec<PartnerId>,
    pub vehicle_ids: Vec<VehicleId>,
    pub trailer_ids: Vec<VehicleId>,
    pub crew_ids: Vec<CrewId>,
}

impl AssignmentDomain {
    /// Restrict candidates by the selected team and crew.
    ///
    /// * team set: drivers, vehicles (trailers included) and crews of the team
    /// * crew set: drivers narrowed to the crew members
    /// * neither: active drivers, non-trailer vehicles, every crew
    ///
    /// Unknown ids simply match nothing.
    pub fn compute(
        team_id: Option<TeamId>,
        crew: Option<&Crew>,
        drivers: &[Partner],
        vehicles: &[Vehicle],
        crews: &[Crew],
    ) -> Self {
        let mut domain = match team_id {
            Some(team) => Self {
                driver_ids: drivers
                    .iter()
                    .filter(|p| p.is_driver() && p.team_id() == Some(team))
                    .map(Partner::id_typed)
                    .collect(),
                vehicle_ids: vehicles
                    .iter()
                    .filter(|v| v.team_id == Some(team))
                    .map(|v| v.id)
                    .collect(),
                trailer_ids: vehicles
                    .iter()
                    .filter(|v| v.is_trailer() && v.team_id == Some(team))
                    .map(|v| v.id)
                    .collect(),
                crew_ids: crews
                    .iter()
                    .filter(|c| c.team_id == Some(team))
                    .map(|c| c.id)
                    .collect(),
            },
            None => Self {
                driver_ids: drivers
                    .iter()
                    .filter(|p| p.is_active_driver())
                    .map(Partner::id_typed)
                    .collect(),
                vehicle_ids: vehicles
                    .iter()
                    .filter(|v| !v.is_trailer())
                    .map(|v| v.id)
                    .collect(),
                trailer_ids: vehicles
                    .iter()
                    .filter(|v| v.is_trailer())
                    .map(|v| v.id)
                    .collect(),
                crew_ids: crews.iter().map(|c| c.id).collect(),
            },
        };

        if let Some(crew) = crew {
            if team_id.is_some() {
                domain.driver_ids.retain(|id| crew.has_driver(*id));
            } else {
                domain.driver_ids = drivers
                    .iter()
                    .filter(|p| p.is_driver() && crew.has_driver(p.id_typed()))
                    .map(Partner::id_typed)
                    .collect();
            }
        }

        domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::{AssignTeam, PartnerCommand, PartnerKind, RegisterPartner};
    use crate::vehicle::VehicleType;
    use chrono::Utc;
    use tms_core::TenantId;
    use tms_events::execute;
    use tms_stages::StageId;

    fn driver(tenant_id: TenantId, name: &str, team: Option<TeamId>) -> Partner {
        let partner_id = PartnerId::generate();
        let mut partner = Partner::empty(partner_id);
        execute(
            &mut partner,
            &PartnerCommand::RegisterPartner(RegisterPartner {
                tenant_id,
                partner_id,
                kind: PartnerKind::Driver,
                name: name.to_string(),
                address: None,
                driver_stage_id: Some(StageId::generate()),
                coordinates: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        execute(
            &mut partner,
            &PartnerCommand::AssignTeam(AssignTeam {
                tenant_id,
                partner_id,
                team_id: team,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        partner
    }

    struct Fixture {
        team: TeamId,
        drivers: Vec<Partner>,
        vehicles: Vec<Vehicle>,
        crews: Vec<Crew>,
    }

    fn fixture() -> Fixture {
        let tenant_id = TenantId::new();
        let team = TeamId::generate();
        let drivers = vec![
            driver(tenant_id, "A", Some(team)),
            driver(tenant_id, "B", Some(team)),
            driver(tenant_id, "C", None),
        ];

        let mut truck = Vehicle::new("Truck", VehicleType::Tractor);
        truck.team_id = Some(team);
        let mut trailer = Vehicle::new("Trailer", VehicleType::Trailer);
        trailer.team_id = Some(team);
        let van = Vehicle::new("Van", VehicleType::Car);

        let mut crew = Crew::new("Pair");
        crew.team_id = Some(team);
        crew.driver_ids = vec![drivers[1].id_typed(), drivers[2].id_typed()];

        Fixture {
            team,
            drivers,
            vehicles: vec![truck, trailer, van],
            crews: vec![crew, Crew::new("Loose")],
        }
    }

    #[test]
    fn team_restricts_every_list() {
        let f = fixture();
        let domain = AssignmentDomain::compute(Some(f.team), None, &f.drivers, &f.vehicles, &f.crews);

        assert_eq!(domain.driver_ids, vec![f.drivers[0].id_typed(), f.drivers[1].id_typed()]);
        assert_eq!(domain.vehicle_ids, vec![f.vehicles[0].id, f.vehicles[1].id]);
        assert_eq!(domain.trailer_ids, vec![f.vehicles[1].id]);
        assert_eq!(domain.crew_ids, vec![f.crews[0].id]);
    }

    #[test]
    fn crew_intersects_team_drivers() {
        let f = fixture();
        let domain =
            AssignmentDomain::compute(Some(f.team), Some(&f.crews[0]), &f.drivers, &f.vehicles, &f.crews);
        assert_eq!(domain.driver_ids, vec![f.drivers[1].id_typed()]);
    }

    #[test]
    fn crew_alone_offers_its_drivers() {
        let f = fixture();
        let domain = AssignmentDomain::compute(None, Some(&f.crews[0]), &f.drivers, &f.vehicles, &f.crews);
        assert_eq!(domain.driver_ids, vec![f.drivers[1].id_typed(), f.drivers[2].id_typed()]);
        assert_eq!(domain.crew_ids.len(), 2);
    }

    #[test]
    fn no_selection_excludes_trailers_from_vehicles() {
        let f = fixture();
        let domain = AssignmentDomain::compute(None, None, &f.drivers, &f.vehicles, &f.crews);

        assert_eq!(domain.driver_ids.len(), 3);
        assert_eq!(domain.vehicle_ids, vec![f.vehicles[0].id, f.vehicles[2].id]);
        assert_eq!(domain.crew_ids.len(), 2);
    }

    #[test]
    fn empty_inputs_yield_empty_domain() {
        let domain = AssignmentDomain::compute(Some(TeamId::generate()), None, &[], &[], &[]);
        assert_eq!(domain, AssignmentDomain::default());
    }
}
