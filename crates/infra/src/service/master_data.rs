use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use tms_core::{DomainError, TenantId};
use tms_events::{EventBus, EventEnvelope};
use tms_fleet::{
    ArchivePartner, AssignTeam, AssignmentDomain, Coordinates, Crew, CrewId, DriverProfile, Partner, PartnerCommand,
    PartnerId, PartnerKind, RegisterPartner, Route, SetCoordinates, Tag, Team, TeamId, TeamStats,
    UpdateDriverProfile, Vehicle, VehicleId, ensure_unique_name,
};
use tms_sales::SaleProduct;
use tms_stages::{StageQuery, StageType};

use super::{ServiceError, ServiceResult, TmsService};
use crate::event_store::EventStore;
use crate::read_model::TenantStore;
use crate::recompute::Touched;

/// Registration data of a driver or location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPartner {
    pub kind: PartnerKind,
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl NewPartner {
    pub fn driver(name: impl Into<String>) -> Self {
        Self {
            kind: PartnerKind::Driver,
            name: name.into(),
            address: None,
            coordinates: None,
        }
    }

    pub fn location(name: impl Into<String>, address: Option<String>) -> Self {
        Self {
            kind: PartnerKind::Location,
            name: name.into(),
            address,
            coordinates: None,
        }
    }
}

impl<S, B> TmsService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Drivers start in the default driver stage.
    #[instrument(skip(self, partner), fields(name = %partner.name))]
    pub fn register_partner(
        &mut self,
        tenant_id: TenantId,
        partner: NewPartner,
        at: DateTime<Utc>,
    ) -> ServiceResult<Partner> {
        let driver_stage_id = match partner.kind {
            PartnerKind::Driver => Some(self.stages.default_stage(StageType::Driver)?.id),
            PartnerKind::Location => None,
        };
        let partner_id = PartnerId::generate();
        let command = PartnerCommand::RegisterPartner(RegisterPartner {
            tenant_id,
            partner_id,
            kind: partner.kind,
            name: partner.name,
            address: partner.address,
            driver_stage_id,
            coordinates: partner.coordinates,
            occurred_at: at,
        });
        let (partner, _) = self.write_partner(tenant_id, partner_id, command)?;
        info!(%tenant_id, %partner_id, kind = ?partner.kind(), "partner registered");
        Ok(partner)
    }

    pub fn update_driver_profile(
        &mut self,
        tenant_id: TenantId,
        partner_id: PartnerId,
        profile: DriverProfile,
        at: DateTime<Utc>,
    ) -> ServiceResult<Partner> {
        let command = PartnerCommand::UpdateDriverProfile(UpdateDriverProfile {
            tenant_id,
            partner_id,
            profile,
            occurred_at: at,
        });
        Ok(self.write_partner(tenant_id, partner_id, command)?.0)
    }

    #[instrument(skip(self))]
    pub fn assign_driver_team(
        &mut self,
        tenant_id: TenantId,
        partner_id: PartnerId,
        team_id: Option<TeamId>,
        at: DateTime<Utc>,
    ) -> ServiceResult<Partner> {
        if let Some(team_id) = team_id {
            self.team(tenant_id, team_id)?;
        }
        let command = PartnerCommand::AssignTeam(AssignTeam {
            tenant_id,
            partner_id,
            team_id,
            occurred_at: at,
        });
        let (partner, touched) = self.write_partner(tenant_id, partner_id, command)?;
        self.recompute(tenant_id, touched, at)?;
        Ok(partner)
    }

    pub fn set_partner_coordinates(
        &mut self,
        tenant_id: TenantId,
        partner_id: PartnerId,
        coordinates: Coordinates,
        at: DateTime<Utc>,
    ) -> ServiceResult<Partner> {
        let command = PartnerCommand::SetCoordinates(SetCoordinates {
            tenant_id,
            partner_id,
            coordinates,
            occurred_at: at,
        });
        Ok(self.write_partner(tenant_id, partner_id, command)?.0)
    }

    pub fn archive_partner(
        &mut self,
        tenant_id: TenantId,
        partner_id: PartnerId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Partner> {
        let command = PartnerCommand::ArchivePartner(ArchivePartner {
            tenant_id,
            partner_id,
            occurred_at: at,
        });
        Ok(self.write_partner(tenant_id, partner_id, command)?.0)
    }
}

impl<S, B> TmsService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Insert or replace a vehicle. Team moves refresh both teams' figures.
    #[instrument(skip(self, vehicle), fields(vehicle_id = %vehicle.id))]
    pub fn save_vehicle(&mut self, tenant_id: TenantId, vehicle: Vehicle, at: DateTime<Utc>) -> ServiceResult<Vehicle> {
        if vehicle.name.trim().is_empty() {
            return Err(DomainError::validation("vehicle name cannot be empty").into());
        }
        if let Some(team_id) = vehicle.team_id {
            self.team(tenant_id, team_id)?;
        }
        let before = self.models.vehicles.get(tenant_id, &vehicle.id);
        let mut touched = Touched::new();
        touched.vehicle_team(before.and_then(|v| v.team_id), vehicle.team_id);

        self.models.vehicles.upsert(tenant_id, vehicle.id, vehicle.clone());
        self.recompute(tenant_id, touched, at)?;
        Ok(vehicle)
    }

    /// New team with a unique name. Its board shows the default-flagged
    /// order stages.
    #[instrument(skip(self))]
    pub fn register_team(&mut self, tenant_id: TenantId, name: &str) -> ServiceResult<Team> {
        let existing = self.models.teams.list(tenant_id);
        ensure_unique_name("team", name, existing.iter().map(|t| t.name.as_str()))?;

        let stage_ids = self
            .stages
            .search(StageQuery::of_type(StageType::Order).default_flagged(), None)
            .into_iter()
            .map(|s| s.id)
            .collect();
        let team = Team::new(name.trim(), stage_ids);
        self.models.teams.upsert(tenant_id, team.id, team.clone());
        self.models.team_stats.upsert(tenant_id, team.id, TeamStats::default());
        info!(%tenant_id, team_id = %team.id, "team registered");
        Ok(team)
    }

    pub fn save_crew(&mut self, tenant_id: TenantId, crew: Crew) -> ServiceResult<Crew> {
        if let Some(team_id) = crew.team_id {
            self.team(tenant_id, team_id)?;
        }
        self.models.crews.upsert(tenant_id, crew.id, crew.clone());
        Ok(crew)
    }

    /// Route template with the configured default time unit.
    pub fn new_route(
        &self,
        name: impl Into<String>,
        origin_location_id: Option<PartnerId>,
        destination_location_id: Option<PartnerId>,
    ) -> Route {
        Route::new(name, origin_location_id, destination_location_id).with_estimate(0.0, self.settings.time_uom)
    }

    pub fn save_route(&mut self, tenant_id: TenantId, route: Route) -> ServiceResult<Route> {
        if route.name.trim().is_empty() {
            return Err(DomainError::validation("route name cannot be empty").into());
        }
        if !route.estimated_time.is_finite() || route.estimated_time < 0.0 {
            return Err(DomainError::validation("route estimate must be greater than or equal to zero").into());
        }
        self.models.routes.upsert(tenant_id, route.id, route.clone());
        Ok(route)
    }

    pub fn register_tag(&mut self, tenant_id: TenantId, tag: Tag) -> ServiceResult<Tag> {
        let existing = self.models.tags.list(tenant_id);
        ensure_unique_name("tag", &tag.name, existing.iter().map(|t| t.name.as_str()))?;
        self.models.tags.upsert(tenant_id, tag.id, tag.clone());
        Ok(tag)
    }

    pub fn save_product(&mut self, tenant_id: TenantId, product: SaleProduct) -> ServiceResult<SaleProduct> {
        if product.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty").into());
        }
        self.models.products.upsert(tenant_id, product.id, product.clone());
        Ok(product)
    }
}

impl<S, B> TmsService<S, B> {
    pub fn partner(&self, tenant_id: TenantId, partner_id: PartnerId) -> ServiceResult<Partner> {
        self.models
            .partners
            .get(tenant_id, &partner_id)
            .ok_or_else(|| ServiceError::missing("partner", partner_id))
    }

    pub fn drivers(&self, tenant_id: TenantId) -> Vec<Partner> {
        self.models.partners.filter(tenant_id, &|p: &Partner| p.is_driver())
    }

    pub fn vehicle(&self, tenant_id: TenantId, vehicle_id: VehicleId) -> ServiceResult<Vehicle> {
        self.models
            .vehicles
            .get(tenant_id, &vehicle_id)
            .ok_or_else(|| ServiceError::missing("vehicle", vehicle_id))
    }

    pub fn team(&self, tenant_id: TenantId, team_id: TeamId) -> ServiceResult<Team> {
        self.models
            .teams
            .get(tenant_id, &team_id)
            .ok_or_else(|| ServiceError::missing("team", team_id))
    }

    /// Teams ordered by `sequence`, then name.
    pub fn teams(&self, tenant_id: TenantId) -> Vec<Team> {
        let mut teams = self.models.teams.list(tenant_id);
        teams.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        teams
    }

    pub fn team_stats(&self, tenant_id: TenantId, team_id: TeamId) -> ServiceResult<TeamStats> {
        self.team(tenant_id, team_id)?;
        Ok(self.models.team_stats.get(tenant_id, &team_id).unwrap_or_default())
    }

    pub fn crew(&self, tenant_id: TenantId, crew_id: CrewId) -> ServiceResult<Crew> {
        self.models
            .crews
            .get(tenant_id, &crew_id)
            .ok_or_else(|| ServiceError::missing("crew", crew_id))
    }

    pub fn tags(&self, tenant_id: TenantId) -> Vec<Tag> {
        self.models.tags.list(tenant_id)
    }

    /// Candidate drivers, vehicles and crews for the given team and crew.
    /// Unknown ids match nothing.
    pub fn assignment_domain(
        &self,
        tenant_id: TenantId,
        team_id: Option<TeamId>,
        crew_id: Option<CrewId>,
    ) -> AssignmentDomain {
        let crew = crew_id.and_then(|id| self.models.crews.get(tenant_id, &id));
        AssignmentDomain::compute(
            team_id,
            crew.as_ref(),
            &self.drivers(tenant_id),
            &self.models.vehicles.list(tenant_id),
            &self.models.crews.list(tenant_id),
        )
    }

    /// Drivers whose license expires within the security window. Empty when
    /// license tracking is off.
    pub fn expiring_licenses(&self, tenant_id: TenantId, today: NaiveDate) -> Vec<Partner> {
        if !self.settings.features.driver_license {
            return Vec::new();
        }
        let days = self.settings.driver_license_security_days;
        self.models
            .partners
            .filter(tenant_id, &|p: &Partner| p.is_driver() && p.license_expires_within(today, days))
    }

    pub fn expiring_insurance(&self, tenant_id: TenantId, today: NaiveDate) -> Vec<Vehicle> {
        if !self.settings.features.vehicle_insurance {
            return Vec::new();
        }
        let days = self.settings.vehicle_insurance_security_days;
        self.models
            .vehicles
            .filter(tenant_id, &|v: &Vehicle| v.insurance_expires_within(today, days))
    }
}
