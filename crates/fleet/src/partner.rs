use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{Aggregate, AggregateRoot, DomainError, TenantId};
use tms_events::Event;
use tms_stages::StageId;

use crate::team::TeamId;

tms_core::record_id!(
    /// Partner identifier (driver or location).
    PartnerId
);

/// TMS role of a partner, chosen by the caller when registering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerKind {
    Driver,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    Active,
    Archived,
}

/// Mode of transport a driver or location serves. Only land transport exists
/// today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Terrestrial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseType {
    /// Motorcycles.
    A,
    /// Automobiles.
    B,
    /// Trucks.
    C,
    /// Buses.
    D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverLicense {
    pub number: String,
    pub license_type: LicenseType,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Km,
    Mi,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrivingExperience {
    pub distance_traveled: u64,
    pub distance_unit: DistanceUnit,
    pub driving_experience_years: u32,
}

/// Driver-only attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub is_external: bool,
    pub is_training: bool,
    /// Available for TMS work.
    pub is_active: bool,
    pub driver_type: TransportMode,
    pub license: Option<DriverLicense>,
    pub experience: DrivingExperience,
}

impl Default for DriverProfile {
    fn default() -> Self {
        Self {
            is_external: false,
            is_training: false,
            is_active: true,
            driver_type: TransportMode::Terrestrial,
            license: None,
            experience: DrivingExperience::default(),
        }
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::validation(format!(
                "coordinates out of range: ({latitude}, {longitude})"
            )));
        }
        Ok(Self { latitude, longitude })
    }
}

/// Aggregate root: Partner (a driver or a location).
#[derive(Debug, Clone, PartialEq)]
pub struct Partner {
    id: PartnerId,
    tenant_id: Option<TenantId>,
    kind: PartnerKind,
    name: String,
    address: Option<String>,
    status: PartnerStatus,
    driver: Option<DriverProfile>,
    location_type: Option<TransportMode>,
    coordinates: Option<Coordinates>,
    team_id: Option<TeamId>,
    stage_id: Option<StageId>,
    version: u64,
    created: bool,
}

impl Partner {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: PartnerId) -> Self {
        Self {
            id,
            tenant_id: None,
            kind: PartnerKind::Location,
            name: String::new(),
            address: None,
            status: PartnerStatus::Active,
            driver: None,
            location_type: None,
            coordinates: None,
            team_id: None,
            stage_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartnerId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn kind(&self) -> PartnerKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn status(&self) -> PartnerStatus {
        self.status
    }

    pub fn driver_profile(&self) -> Option<&DriverProfile> {
        self.driver.as_ref()
    }

    pub fn location_type(&self) -> Option<TransportMode> {
        self.location_type
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    /// Current driver stage. Always `None` for locations.
    pub fn stage_id(&self) -> Option<StageId> {
        self.stage_id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_driver(&self) -> bool {
        self.kind == PartnerKind::Driver
    }

    pub fn is_location(&self) -> bool {
        self.kind == PartnerKind::Location
    }

    /// Driver that is not archived and flagged active on TMS.
    pub fn is_active_driver(&self) -> bool {
        self.is_driver()
            && self.status == PartnerStatus::Active
            && self.driver.as_ref().is_some_and(|d| d.is_active)
    }

    /// Whether the driver license expires on or before `today + days`.
    /// Already expired licenses count. No license or no expiration date never
    /// triggers.
    pub fn license_expires_within(&self, today: NaiveDate, days: u32) -> bool {
        let Some(expiration) = self
            .driver
            .as_ref()
            .and_then(|d| d.license.as_ref())
            .and_then(|l| l.expiration_date)
        else {
            return false;
        };
        today
            .checked_add_days(Days::new(u64::from(days)))
            .is_some_and(|limit| expiration <= limit)
    }
}

impl AggregateRoot for Partner {
    type Id = PartnerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterPartner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPartner {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub kind: PartnerKind,
    pub name: String,
    pub address: Option<String>,
    /// Initial driver stage. Required for drivers, ignored for locations.
    pub driver_stage_id: Option<StageId>,
    pub coordinates: Option<Coordinates>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDriverProfile {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub profile: DriverProfile,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTeam {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub team_id: Option<TeamId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCoordinates {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub coordinates: Coordinates,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SyncDriverStage.
///
/// `in_progress` tells whether the driver has an order in an unclosed stage
/// with a started trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncDriverStage {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub in_progress: bool,
    pub transit_stage_id: StageId,
    pub default_stage_id: StageId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivePartner {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartnerCommand {
    RegisterPartner(RegisterPartner),
    UpdateDriverProfile(UpdateDriverProfile),
    AssignTeam(AssignTeam),
    SetCoordinates(SetCoordinates),
    SyncDriverStage(SyncDriverStage),
    ArchivePartner(ArchivePartner),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerRegistered {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub kind: PartnerKind,
    pub name: String,
    pub address: Option<String>,
    pub driver_stage_id: Option<StageId>,
    pub coordinates: Option<Coordinates>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverProfileUpdated {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub profile: DriverProfile,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAssigned {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub team_id: Option<TeamId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesSet {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub coordinates: Coordinates,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStageChanged {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub stage_id: StageId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerArchived {
    pub tenant_id: TenantId,
    pub partner_id: PartnerId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartnerEvent {
    PartnerRegistered(PartnerRegistered),
    DriverProfileUpdated(DriverProfileUpdated),
    TeamAssigned(TeamAssigned),
    CoordinatesSet(CoordinatesSet),
    DriverStageChanged(DriverStageChanged),
    PartnerArchived(PartnerArchived),
}

impl Event for PartnerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartnerEvent::PartnerRegistered(_) => "tms.partner.registered",
            PartnerEvent::DriverProfileUpdated(_) => "tms.partner.driver_profile_updated",
            PartnerEvent::TeamAssigned(_) => "tms.partner.team_assigned",
            PartnerEvent::CoordinatesSet(_) => "tms.partner.coordinates_set",
            PartnerEvent::DriverStageChanged(_) => "tms.partner.driver_stage_changed",
            PartnerEvent::PartnerArchived(_) => "tms.partner.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartnerEvent::PartnerRegistered(e) => e.occurred_at,
            PartnerEvent::DriverProfileUpdated(e) => e.occurred_at,
            PartnerEvent::TeamAssigned(e) => e.occurred_at,
            PartnerEvent::CoordinatesSet(e) => e.occurred_at,
            PartnerEvent::DriverStageChanged(e) => e.occurred_at,
            PartnerEvent::PartnerArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Partner {
    type Command = PartnerCommand;
    type Event = PartnerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartnerEvent::PartnerRegistered(e) => {
                self.id = e.partner_id;
                self.tenant_id = Some(e.tenant_id);
                self.kind = e.kind;
                self.name = e.name.clone();
                self.address = e.address.clone();
                self.status = PartnerStatus::Active;
                self.coordinates = e.coordinates;
                match e.kind {
                    PartnerKind::Driver => {
                        self.driver = Some(DriverProfile::default());
                        self.stage_id = e.driver_stage_id;
                    }
                    PartnerKind::Location => {
                        self.location_type = Some(TransportMode::Terrestrial);
                    }
                }
                self.created = true;
            }
            PartnerEvent::DriverProfileUpdated(e) => {
                self.driver = Some(e.profile.clone());
            }
            PartnerEvent::TeamAssigned(e) => {
                self.team_id = e.team_id;
            }
            PartnerEvent::CoordinatesSet(e) => {
                self.coordinates = Some(e.coordinates);
            }
            PartnerEvent::DriverStageChanged(e) => {
                self.stage_id = Some(e.stage_id);
            }
            PartnerEvent::PartnerArchived(_) => {
                self.status = PartnerStatus::Archived;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartnerCommand::RegisterPartner(cmd) => self.handle_register(cmd),
            PartnerCommand::UpdateDriverProfile(cmd) => self.handle_update_profile(cmd),
            PartnerCommand::AssignTeam(cmd) => self.handle_assign_team(cmd),
            PartnerCommand::SetCoordinates(cmd) => self.handle_set_coordinates(cmd),
            PartnerCommand::SyncDriverStage(cmd) => self.handle_sync_stage(cmd),
            PartnerCommand::ArchivePartner(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Partner {
    fn ensure_existing(&self, tenant_id: TenantId, partner_id: PartnerId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != partner_id {
            return Err(DomainError::invariant("partner_id mismatch"));
        }
        Ok(())
    }

    fn ensure_driver(&self) -> Result<(), DomainError> {
        if !self.is_driver() {
            return Err(DomainError::validation(format!("partner '{}' is not a driver", self.name)));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterPartner) -> Result<Vec<PartnerEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("partner already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let driver_stage_id = match cmd.kind {
            PartnerKind::Driver => Some(cmd.driver_stage_id.ok_or_else(|| {
                DomainError::configuration("drivers need an initial driver stage")
            })?),
            PartnerKind::Location => None,
        };

        Ok(vec![PartnerEvent::PartnerRegistered(PartnerRegistered {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            kind: cmd.kind,
            name: cmd.name.clone(),
            address: cmd.address.clone(),
            driver_stage_id,
            coordinates: cmd.coordinates,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_profile(&self, cmd: &UpdateDriverProfile) -> Result<Vec<PartnerEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.partner_id)?;
        self.ensure_driver()?;
        if let Some(license) = &cmd.profile.license {
            if license.number.trim().is_empty() {
                return Err(DomainError::validation("license number cannot be empty"));
            }
        }

        Ok(vec![PartnerEvent::DriverProfileUpdated(DriverProfileUpdated {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            profile: cmd.profile.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_team(&self, cmd: &AssignTeam) -> Result<Vec<PartnerEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.partner_id)?;
        self.ensure_driver()?;
        if self.team_id == cmd.team_id {
            return Ok(vec![]);
        }

        Ok(vec![PartnerEvent::TeamAssigned(TeamAssigned {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            team_id: cmd.team_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_coordinates(&self, cmd: &SetCoordinates) -> Result<Vec<PartnerEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.partner_id)?;
        Coordinates::new(cmd.coordinates.latitude, cmd.coordinates.longitude)?;

        Ok(vec![PartnerEvent::CoordinatesSet(CoordinatesSet {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            coordinates: cmd.coordinates,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sync_stage(&self, cmd: &SyncDriverStage) -> Result<Vec<PartnerEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.partner_id)?;
        self.ensure_driver()?;

        let target = if cmd.in_progress {
            cmd.transit_stage_id
        } else {
            cmd.default_stage_id
        };
        if self.stage_id == Some(target) {
            return Ok(vec![]);
        }

        Ok(vec![PartnerEvent::DriverStageChanged(DriverStageChanged {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            stage_id: target,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchivePartner) -> Result<Vec<PartnerEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.partner_id)?;
        if self.status == PartnerStatus::Archived {
            return Err(DomainError::conflict("partner is already archived"));
        }

        Ok(vec![PartnerEvent::PartnerArchived(PartnerArchived {
            tenant_id: cmd.tenant_id,
            partner_id: cmd.partner_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
