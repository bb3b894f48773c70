use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{Aggregate, AggregateRoot, DomainError, TenantId};
use tms_events::Event;
use tms_fleet::TagId;
use tms_orders::{Itinerary, OrderId, Resources, Schedule, ScheduleEdit, Trip, TripStages};
use tms_stages::{Stage, StageId};

tms_core::record_id!(
    /// Shipment identifier.
    ShipmentId
);

/// Kanban progress marker inside the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KanbanState {
    #[default]
    Normal,
    Done,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    Low,
    High,
    VeryHigh,
}

/// Aggregate root: Shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    id: ShipmentId,
    tenant_id: Option<TenantId>,
    name: String,
    description: Option<String>,
    itinerary: Itinerary,
    resources: Resources,
    stage_id: Option<StageId>,
    schedule: Schedule,
    trip: Trip,
    order_ids: Vec<OrderId>,
    kanban_state: KanbanState,
    priority: Priority,
    tag_ids: Vec<TagId>,
    version: u64,
    created: bool,
}

impl Shipment {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ShipmentId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            description: None,
            itinerary: Itinerary::default(),
            resources: Resources::default(),
            stage_id: None,
            schedule: Schedule::default(),
            trip: Trip::default(),
            order_ids: Vec::new(),
            kanban_state: KanbanState::Normal,
            priority: Priority::Normal,
            tag_ids: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ShipmentId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn stage_id(&self) -> Option<StageId> {
        self.stage_id
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn trip(&self) -> &Trip {
        &self.trip
    }

    pub fn order_ids(&self) -> &[OrderId] {
        &self.order_ids
    }

    pub fn kanban_state(&self) -> KanbanState {
        self.kanban_state
    }

    /// Label of the kanban state taken from the stage legends.
    pub fn kanban_state_label<'a>(&self, stage: &'a Stage) -> &'a str {
        match self.kanban_state {
            KanbanState::Normal => &stage.legend_normal,
            KanbanState::Blocked => &stage.legend_blocked,
            KanbanState::Done => &stage.legend_done,
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn tag_ids(&self) -> &[TagId] {
        &self.tag_ids
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Shipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateShipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShipment {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub name: String,
    pub description: Option<String>,
    pub itinerary: Itinerary,
    pub resources: Resources,
    pub schedule: Schedule,
    pub stage_id: StageId,
    pub order_ids: Vec<OrderId>,
    pub tag_ids: Vec<TagId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateShipmentItinerary {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub itinerary: Itinerary,
    pub route_hours: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditShipmentSchedule {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub edit: ScheduleEdit,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignShipmentResources {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub resources: Resources,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeShipmentStage {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub stage_id: StageId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetKanbanState {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub kanban_state: KanbanState,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPriority {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
}

/// Trip command of a shipment. `occurred_at` is the trip timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentTripCommand {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub stages: TripStages,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditShipmentActual {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub edit: ActualEdit,
    pub stages: TripStages,
    pub occurred_at: DateTime<Utc>,
}

/// User edit of the actual trip window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActualEdit {
    Start(Option<DateTime<Utc>>),
    End(Option<DateTime<Utc>>),
    Duration(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOrders {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub order_ids: Vec<OrderId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveOrder {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShipmentCommand {
    CreateShipment(CreateShipment),
    UpdateItinerary(UpdateShipmentItinerary),
    EditSchedule(EditShipmentSchedule),
    AssignResources(AssignShipmentResources),
    ChangeStage(ChangeShipmentStage),
    SetKanbanState(SetKanbanState),
    SetPriority(SetPriority),
    StartShipment(ShipmentTripCommand),
    EndShipment(ShipmentTripCommand),
    RefreshDuration(ShipmentTripCommand),
    EditActual(EditShipmentActual),
    AddOrders(AddOrders),
    RemoveOrder(RemoveOrder),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentCreated {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub name: String,
    pub description: Option<String>,
    pub itinerary: Itinerary,
    pub resources: Resources,
    pub schedule: Schedule,
    pub stage_id: StageId,
    pub order_ids: Vec<OrderId>,
    pub tag_ids: Vec<TagId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentItineraryUpdated {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub itinerary: Itinerary,
    pub schedule: Schedule,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentScheduleChanged {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub schedule: Schedule,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentResourcesAssigned {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub resources: Resources,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentStageChanged {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub stage_id: StageId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanStateChanged {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub kanban_state: KanbanState,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityChanged {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentTripChanged {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub trip: Trip,
    pub stage_id: Option<StageId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersAdded {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub order_ids: Vec<OrderId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRemoved {
    pub tenant_id: TenantId,
    pub shipment_id: ShipmentId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShipmentEvent {
    ShipmentCreated(ShipmentCreated),
    ItineraryUpdated(ShipmentItineraryUpdated),
    ScheduleChanged(ShipmentScheduleChanged),
    ResourcesAssigned(ShipmentResourcesAssigned),
    StageChanged(ShipmentStageChanged),
    KanbanStateChanged(KanbanStateChanged),
    PriorityChanged(PriorityChanged),
    TripStarted(ShipmentTripChanged),
    TripEnded(ShipmentTripChanged),
    DurationRefreshed(ShipmentTripChanged),
    ActualTimesEdited(ShipmentTripChanged),
    OrdersAdded(OrdersAdded),
    OrderRemoved(OrderRemoved),
}

impl Event for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::ShipmentCreated(_) => "tms.shipment.created",
            ShipmentEvent::ItineraryUpdated(_) => "tms.shipment.itinerary_updated",
            ShipmentEvent::ScheduleChanged(_) => "tms.shipment.schedule_changed",
            ShipmentEvent::ResourcesAssigned(_) => "tms.shipment.resources_assigned",
            ShipmentEvent::StageChanged(_) => "tms.shipment.stage_changed",
            ShipmentEvent::KanbanStateChanged(_) => "tms.shipment.kanban_state_changed",
            ShipmentEvent::PriorityChanged(_) => "tms.shipment.priority_changed",
            ShipmentEvent::TripStarted(_) => "tms.shipment.trip_started",
            ShipmentEvent::TripEnded(_) => "tms.shipment.trip_ended",
            ShipmentEvent::DurationRefreshed(_) => "tms.shipment.duration_refreshed",
            ShipmentEvent::ActualTimesEdited(_) => "tms.shipment.actual_times_edited",
            ShipmentEvent::OrdersAdded(_) => "tms.shipment.orders_added",
            ShipmentEvent::OrderRemoved(_) => "tms.shipment.order_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ShipmentEvent::ShipmentCreated(e) => e.occurred_at,
            ShipmentEvent::ItineraryUpdated(e) => e.occurred_at,
            ShipmentEvent::ScheduleChanged(e) => e.occurred_at,
            ShipmentEvent::ResourcesAssigned(e) => e.occurred_at,
            ShipmentEvent::StageChanged(e) => e.occurred_at,
            ShipmentEvent::KanbanStateChanged(e) => e.occurred_at,
            ShipmentEvent::PriorityChanged(e) => e.occurred_at,
            ShipmentEvent::TripStarted(e)
            | ShipmentEvent::TripEnded(e)
            | ShipmentEvent::DurationRefreshed(e)
            | ShipmentEvent::ActualTimesEdited(e) => e.occurred_at,
            ShipmentEvent::OrdersAdded(e) => e.occurred_at,
            ShipmentEvent::OrderRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Shipment {
    type Command = ShipmentCommand;
    type Event = ShipmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ShipmentEvent::ShipmentCreated(e) => {
                self.id = e.shipment_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.itinerary = e.itinerary;
                self.resources = e.resources;
                self.schedule = e.schedule;
                self.stage_id = Some(e.stage_id);
                self.order_ids = e.order_ids.clone();
                self.tag_ids = e.tag_ids.clone();
                self.kanban_state = KanbanState::Normal;
                self.created = true;
            }
            ShipmentEvent::ItineraryUpdated(e) => {
                self.itinerary = e.itinerary;
                self.schedule = e.schedule;
            }
            ShipmentEvent::ScheduleChanged(e) => {
                self.schedule = e.schedule;
            }
            ShipmentEvent::ResourcesAssigned(e) => {
                self.resources = e.resources;
            }
            ShipmentEvent::StageChanged(e) => {
                self.stage_id = Some(e.stage_id);
            }
            ShipmentEvent::KanbanStateChanged(e) => {
                self.kanban_state = e.kanban_state;
            }
            ShipmentEvent::PriorityChanged(e) => {
                self.priority = e.priority;
            }
            ShipmentEvent::TripStarted(e)
            | ShipmentEvent::TripEnded(e)
            | ShipmentEvent::DurationRefreshed(e)
            | ShipmentEvent::ActualTimesEdited(e) => {
                self.trip = e.trip;
                if let Some(stage_id) = e.stage_id {
                    self.stage_id = Some(stage_id);
                }
            }
            ShipmentEvent::OrdersAdded(e) => {
                for order_id in &e.order_ids {
                    if !self.order_ids.contains(order_id) {
                        self.order_ids.push(*order_id);
                    }
                }
            }
            ShipmentEvent::OrderRemoved(e) => {
                self.order_ids.retain(|id| *id != e.order_id);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if let ShipmentCommand::CreateShipment(cmd) = command {
            return self.handle_create(cmd);
        }
        if !self.created {
            return Err(DomainError::not_found());
        }

        match command {
            ShipmentCommand::CreateShipment(_) => Err(DomainError::conflict("shipment already exists")),
            ShipmentCommand::UpdateItinerary(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                let schedule = self
                    .schedule
                    .follow_itinerary(&self.itinerary, &cmd.itinerary, cmd.route_hours)?;
                Ok(vec![ShipmentEvent::ItineraryUpdated(ShipmentItineraryUpdated {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    itinerary: cmd.itinerary,
                    schedule,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::EditSchedule(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                let schedule = self.schedule.apply(cmd.edit)?;
                Ok(vec![ShipmentEvent::ScheduleChanged(ShipmentScheduleChanged {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    schedule,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::AssignResources(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                if self.resources == cmd.resources {
                    return Ok(vec![]);
                }
                Ok(vec![ShipmentEvent::ResourcesAssigned(ShipmentResourcesAssigned {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    resources: cmd.resources,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::ChangeStage(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                if self.stage_id == Some(cmd.stage_id) {
                    return Ok(vec![]);
                }
                Ok(vec![ShipmentEvent::StageChanged(ShipmentStageChanged {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    stage_id: cmd.stage_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::SetKanbanState(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                if self.kanban_state == cmd.kanban_state {
                    return Ok(vec![]);
                }
                Ok(vec![ShipmentEvent::KanbanStateChanged(KanbanStateChanged {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    kanban_state: cmd.kanban_state,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::SetPriority(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                Ok(vec![ShipmentEvent::PriorityChanged(PriorityChanged {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    priority: cmd.priority,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::StartShipment(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                if self.trip.start_trip {
                    return Err(DomainError::conflict("shipment trip already started"));
                }
                let mut trip = self.trip;
                let stage = trip.start(cmd.occurred_at);
                Ok(vec![ShipmentEvent::TripStarted(
                    self.trip_changed(cmd, trip, Some(cmd.stages.resolve(stage))),
                )])
            }
            ShipmentCommand::EndShipment(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                if self.trip.end_trip {
                    return Err(DomainError::conflict("shipment trip already ended"));
                }
                let mut trip = self.trip;
                let stage = trip.end(cmd.occurred_at, self.schedule.duration_hours);
                Ok(vec![ShipmentEvent::TripEnded(
                    self.trip_changed(cmd, trip, Some(cmd.stages.resolve(stage))),
                )])
            }
            ShipmentCommand::RefreshDuration(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                let mut trip = self.trip;
                trip.refresh(cmd.occurred_at);
                Ok(vec![ShipmentEvent::DurationRefreshed(self.trip_changed(cmd, trip, None))])
            }
            ShipmentCommand::EditActual(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                self.handle_edit_actual(cmd)
            }
            ShipmentCommand::AddOrders(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                let new: Vec<OrderId> = cmd
                    .order_ids
                    .iter()
                    .filter(|id| !self.order_ids.contains(id))
                    .copied()
                    .collect();
                if new.is_empty() {
                    return Ok(vec![]);
                }
                Ok(vec![ShipmentEvent::OrdersAdded(OrdersAdded {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    order_ids: new,
                    occurred_at: cmd.occurred_at,
                })])
            }
            ShipmentCommand::RemoveOrder(cmd) => {
                self.ensure(cmd.tenant_id, cmd.shipment_id)?;
                if !self.order_ids.contains(&cmd.order_id) {
                    return Ok(vec![]);
                }
                Ok(vec![ShipmentEvent::OrderRemoved(OrderRemoved {
                    tenant_id: cmd.tenant_id,
                    shipment_id: cmd.shipment_id,
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Shipment {
    fn ensure(&self, tenant_id: TenantId, shipment_id: ShipmentId) -> Result<(), DomainError> {
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != shipment_id {
            return Err(DomainError::invariant("shipment_id mismatch"));
        }
        Ok(())
    }

    fn trip_changed(&self, cmd: &ShipmentTripCommand, trip: Trip, stage_id: Option<StageId>) -> ShipmentTripChanged {
        ShipmentTripChanged {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            trip,
            stage_id,
            occurred_at: cmd.occurred_at,
        }
    }

    fn handle_create(&self, cmd: &CreateShipment) -> Result<Vec<ShipmentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("shipment already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        cmd.schedule.validate()?;

        Ok(vec![ShipmentEvent::ShipmentCreated(ShipmentCreated {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            itinerary: cmd.itinerary,
            resources: cmd.resources,
            schedule: cmd.schedule,
            stage_id: cmd.stage_id,
            order_ids: cmd.order_ids.clone(),
            tag_ids: cmd.tag_ids.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_actual(&self, cmd: &EditShipmentActual) -> Result<Vec<ShipmentEvent>, DomainError> {
        let scheduled = self.schedule.duration_hours;
        let mut trip = self.trip;
        let stage = match cmd.edit {
            ActualEdit::Start(start) => trip.edit_start(start, scheduled)?,
            ActualEdit::End(end) => trip.edit_end(end, scheduled)?,
            ActualEdit::Duration(hours) => {
                trip.edit_duration(hours, scheduled)?;
                None
            }
        };
        if trip == self.trip && stage.is_none() {
            return Ok(vec![]);
        }

        Ok(vec![ShipmentEvent::ActualTimesEdited(ShipmentTripChanged {
            tenant_id: cmd.tenant_id,
            shipment_id: cmd.shipment_id,
            trip,
            stage_id: stage.map(|s| cmd.stages.resolve(s)),
            occurred_at: cmd.occurred_at,
        })])
    }
}
