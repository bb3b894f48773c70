use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use tms_events::Event;
use tms_fleet::{PartnerId, TagId};
use tms_stages::StageId;

use crate::itinerary::{Itinerary, Resources};
use crate::schedule::{Schedule, ScheduleEdit};
use crate::trip::{Trip, TripStages};

tms_core::record_id!(
    /// Transport order identifier.
    OrderId
);

/// Position of an order inside its shipment when none is given.
pub const DEFAULT_SHIPMENT_SEQUENCE: i32 = 10;

/// Sale order (and optionally the sale line) an order was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLink {
    pub sale_id: AggregateId,
    pub sale_line: Option<u32>,
}

/// Aggregate root: TmsOrder, a single transport task.
#[derive(Debug, Clone, PartialEq)]
pub struct TmsOrder {
    id: OrderId,
    tenant_id: Option<TenantId>,
    name: String,
    description: Option<String>,
    customer_id: Option<PartnerId>,
    itinerary: Itinerary,
    resources: Resources,
    stage_id: Option<StageId>,
    schedule: Schedule,
    trip: Trip,
    shipment_id: Option<AggregateId>,
    shipment_sequence: i32,
    sale: Option<SaleLink>,
    is_pickup_order: bool,
    tag_ids: Vec<TagId>,
    version: u64,
    created: bool,
}

impl TmsOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            description: None,
            customer_id: None,
            itinerary: Itinerary::default(),
            resources: Resources::default(),
            stage_id: None,
            schedule: Schedule::default(),
            trip: Trip::default(),
            shipment_id: None,
            shipment_sequence: DEFAULT_SHIPMENT_SEQUENCE,
            sale: None,
            is_pickup_order: false,
            tag_ids: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
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

    pub fn customer_id(&self) -> Option<PartnerId> {
        self.customer_id
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

    pub fn shipment_id(&self) -> Option<AggregateId> {
        self.shipment_id
    }

    pub fn shipment_sequence(&self) -> i32 {
        self.shipment_sequence
    }

    pub fn sale(&self) -> Option<SaleLink> {
        self.sale
    }

    pub fn is_pickup_order(&self) -> bool {
        self.is_pickup_order
    }

    pub fn tag_ids(&self) -> &[TagId] {
        &self.tag_ids
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for TmsOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
///
/// `stage_id` is the default order stage, resolved by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub name: String,
    pub description: Option<String>,
    pub customer_id: Option<PartnerId>,
    pub itinerary: Itinerary,
    pub resources: Resources,
    pub schedule: Schedule,
    pub stage_id: StageId,
    pub sale: Option<SaleLink>,
    pub is_pickup_order: bool,
    pub tag_ids: Vec<TagId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItinerary.
///
/// `route_hours` is the estimate of the selected route. With the route flag
/// it becomes the scheduled duration; dropping the flag zeroes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateItinerary {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub itinerary: Itinerary,
    pub route_hours: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSchedule {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub edit: ScheduleEdit,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignResources {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub resources: Resources,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeStage {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub stage_id: StageId,
    pub occurred_at: DateTime<Utc>,
}

/// Trip commands use `occurred_at` as the trip timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub stages: TripStages,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOrder {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub stages: TripStages,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshDuration {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditActualStart {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub date_start: Option<DateTime<Utc>>,
    pub stages: TripStages,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditActualEnd {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub date_end: Option<DateTime<Utc>>,
    pub stages: TripStages,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditActualDuration {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub duration: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachToShipment {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub shipment_id: AggregateId,
    pub shipment_sequence: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachFromShipment {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderCommand {
    CreateOrder(CreateOrder),
    UpdateItinerary(UpdateItinerary),
    EditSchedule(EditSchedule),
    AssignResources(AssignResources),
    ChangeStage(ChangeStage),
    StartOrder(StartOrder),
    EndOrder(EndOrder),
    RefreshDuration(RefreshDuration),
    EditActualStart(EditActualStart),
    EditActualEnd(EditActualEnd),
    EditActualDuration(EditActualDuration),
    AttachToShipment(AttachToShipment),
    DetachFromShipment(DetachFromShipment),
}

impl OrderCommand {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderCommand::CreateOrder(c) => c.order_id,
            OrderCommand::UpdateItinerary(c) => c.order_id,
            OrderCommand::EditSchedule(c) => c.order_id,
            OrderCommand::AssignResources(c) => c.order_id,
            OrderCommand::ChangeStage(c) => c.order_id,
            OrderCommand::StartOrder(c) => c.order_id,
            OrderCommand::EndOrder(c) => c.order_id,
            OrderCommand::RefreshDuration(c) => c.order_id,
            OrderCommand::EditActualStart(c) => c.order_id,
            OrderCommand::EditActualEnd(c) => c.order_id,
            OrderCommand::EditActualDuration(c) => c.order_id,
            OrderCommand::AttachToShipment(c) => c.order_id,
            OrderCommand::DetachFromShipment(c) => c.order_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub name: String,
    pub description: Option<String>,
    pub customer_id: Option<PartnerId>,
    pub itinerary: Itinerary,
    pub resources: Resources,
    pub schedule: Schedule,
    pub stage_id: StageId,
    pub sale: Option<SaleLink>,
    pub is_pickup_order: bool,
    pub tag_ids: Vec<TagId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryUpdated {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub itinerary: Itinerary,
    pub schedule: Schedule,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleChanged {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub schedule: Schedule,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesAssigned {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub resources: Resources,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChanged {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub stage_id: StageId,
    pub occurred_at: DateTime<Utc>,
}

/// Trip events carry the resulting trip and, when it moved, the new stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripChanged {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub trip: Trip,
    pub stage_id: Option<StageId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedToShipment {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub shipment_id: AggregateId,
    pub shipment_sequence: i32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetachedFromShipment {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub shipment_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    ItineraryUpdated(ItineraryUpdated),
    ScheduleChanged(ScheduleChanged),
    ResourcesAssigned(ResourcesAssigned),
    StageChanged(StageChanged),
    TripStarted(TripChanged),
    TripEnded(TripChanged),
    DurationRefreshed(TripChanged),
    ActualTimesEdited(TripChanged),
    AttachedToShipment(AttachedToShipment),
    DetachedFromShipment(DetachedFromShipment),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "tms.order.created",
            OrderEvent::ItineraryUpdated(_) => "tms.order.itinerary_updated",
            OrderEvent::ScheduleChanged(_) => "tms.order.schedule_changed",
            OrderEvent::ResourcesAssigned(_) => "tms.order.resources_assigned",
            OrderEvent::StageChanged(_) => "tms.order.stage_changed",
            OrderEvent::TripStarted(_) => "tms.order.trip_started",
            OrderEvent::TripEnded(_) => "tms.order.trip_ended",
            OrderEvent::DurationRefreshed(_) => "tms.order.duration_refreshed",
            OrderEvent::ActualTimesEdited(_) => "tms.order.actual_times_edited",
            OrderEvent::AttachedToShipment(_) => "tms.order.attached_to_shipment",
            OrderEvent::DetachedFromShipment(_) => "tms.order.detached_from_shipment",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::ItineraryUpdated(e) => e.occurred_at,
            OrderEvent::ScheduleChanged(e) => e.occurred_at,
            OrderEvent::ResourcesAssigned(e) => e.occurred_at,
            OrderEvent::StageChanged(e) => e.occurred_at,
            OrderEvent::TripStarted(e)
            | OrderEvent::TripEnded(e)
            | OrderEvent::DurationRefreshed(e)
            | OrderEvent::ActualTimesEdited(e) => e.occurred_at,
            OrderEvent::AttachedToShipment(e) => e.occurred_at,
            OrderEvent::DetachedFromShipment(e) => e.occurred_at,
        }
    }
}

impl Aggregate for TmsOrder {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.customer_id = e.customer_id;
                self.itinerary = e.itinerary;
                self.resources = e.resources;
                self.schedule = e.schedule;
                self.stage_id = Some(e.stage_id);
                self.sale = e.sale;
                self.is_pickup_order = e.is_pickup_order;
                self.tag_ids = e.tag_ids.clone();
                self.created = true;
            }
            OrderEvent::ItineraryUpdated(e) => {
                self.itinerary = e.itinerary;
                self.schedule = e.schedule;
            }
            OrderEvent::ScheduleChanged(e) => {
                self.schedule = e.schedule;
            }
            OrderEvent::ResourcesAssigned(e) => {
                self.resources = e.resources;
            }
            OrderEvent::StageChanged(e) => {
                self.stage_id = Some(e.stage_id);
            }
            OrderEvent::TripStarted(e)
            | OrderEvent::TripEnded(e)
            | OrderEvent::DurationRefreshed(e)
            | OrderEvent::ActualTimesEdited(e) => {
                self.trip = e.trip;
                if let Some(stage_id) = e.stage_id {
                    self.stage_id = Some(stage_id);
                }
            }
            OrderEvent::AttachedToShipment(e) => {
                self.shipment_id = Some(e.shipment_id);
                self.shipment_sequence = e.shipment_sequence;
            }
            OrderEvent::DetachedFromShipment(_) => {
                self.shipment_id = None;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if let OrderCommand::CreateOrder(cmd) = command {
            return self.handle_create(cmd);
        }
        if !self.created {
            return Err(DomainError::not_found());
        }

        match command {
            OrderCommand::CreateOrder(_) => Err(DomainError::conflict("order already exists")),
            OrderCommand::UpdateItinerary(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                self.handle_update_itinerary(cmd)
            }
            OrderCommand::EditSchedule(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                let schedule = self.schedule.apply(cmd.edit)?;
                Ok(vec![OrderEvent::ScheduleChanged(ScheduleChanged {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    schedule,
                    occurred_at: cmd.occurred_at,
                })])
            }
            OrderCommand::AssignResources(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                if self.resources == cmd.resources {
                    return Ok(vec![]);
                }
                Ok(vec![OrderEvent::ResourcesAssigned(ResourcesAssigned {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    resources: cmd.resources,
                    occurred_at: cmd.occurred_at,
                })])
            }
            OrderCommand::ChangeStage(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                if self.stage_id == Some(cmd.stage_id) {
                    return Ok(vec![]);
                }
                Ok(vec![OrderEvent::StageChanged(StageChanged {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    stage_id: cmd.stage_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            OrderCommand::StartOrder(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                if self.trip.start_trip {
                    return Err(DomainError::conflict("trip already started"));
                }
                let mut trip = self.trip;
                let stage = trip.start(cmd.occurred_at);
                Ok(vec![OrderEvent::TripStarted(self.trip_changed(
                    cmd.tenant_id,
                    trip,
                    Some(cmd.stages.resolve(stage)),
                    cmd.occurred_at,
                ))])
            }
            OrderCommand::EndOrder(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                if self.trip.end_trip {
                    return Err(DomainError::conflict("trip already ended"));
                }
                let mut trip = self.trip;
                let stage = trip.end(cmd.occurred_at, self.schedule.duration_hours);
                Ok(vec![OrderEvent::TripEnded(self.trip_changed(
                    cmd.tenant_id,
                    trip,
                    Some(cmd.stages.resolve(stage)),
                    cmd.occurred_at,
                ))])
            }
            OrderCommand::RefreshDuration(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                let mut trip = self.trip;
                trip.refresh(cmd.occurred_at);
                Ok(vec![OrderEvent::DurationRefreshed(self.trip_changed(
                    cmd.tenant_id,
                    trip,
                    None,
                    cmd.occurred_at,
                ))])
            }
            OrderCommand::EditActualStart(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                let mut trip = self.trip;
                let stage = trip.edit_start(cmd.date_start, self.schedule.duration_hours)?;
                self.edited(cmd.tenant_id, trip, stage.map(|s| cmd.stages.resolve(s)), cmd.occurred_at)
            }
            OrderCommand::EditActualEnd(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                let mut trip = self.trip;
                let stage = trip.edit_end(cmd.date_end, self.schedule.duration_hours)?;
                self.edited(cmd.tenant_id, trip, stage.map(|s| cmd.stages.resolve(s)), cmd.occurred_at)
            }
            OrderCommand::EditActualDuration(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                let mut trip = self.trip;
                trip.edit_duration(cmd.duration, self.schedule.duration_hours)?;
                self.edited(cmd.tenant_id, trip, None, cmd.occurred_at)
            }
            OrderCommand::AttachToShipment(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                match self.shipment_id {
                    Some(current) if current == cmd.shipment_id => Ok(vec![]),
                    Some(_) => Err(DomainError::rejected(format!(
                        "order {} already belongs to a shipment",
                        self.name
                    ))),
                    None => Ok(vec![OrderEvent::AttachedToShipment(AttachedToShipment {
                        tenant_id: cmd.tenant_id,
                        order_id: cmd.order_id,
                        shipment_id: cmd.shipment_id,
                        shipment_sequence: cmd.shipment_sequence.unwrap_or(self.shipment_sequence),
                        occurred_at: cmd.occurred_at,
                    })]),
                }
            }
            OrderCommand::DetachFromShipment(cmd) => {
                self.ensure(cmd.tenant_id, cmd.order_id)?;
                let Some(shipment_id) = self.shipment_id else {
                    return Ok(vec![]);
                };
                Ok(vec![OrderEvent::DetachedFromShipment(DetachedFromShipment {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    shipment_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl TmsOrder {
    fn ensure(&self, tenant_id: TenantId, order_id: OrderId) -> Result<(), DomainError> {
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn trip_changed(
        &self,
        tenant_id: TenantId,
        trip: Trip,
        stage_id: Option<StageId>,
        occurred_at: DateTime<Utc>,
    ) -> TripChanged {
        TripChanged {
            tenant_id,
            order_id: self.id,
            trip,
            stage_id,
            occurred_at,
        }
    }

    fn edited(
        &self,
        tenant_id: TenantId,
        trip: Trip,
        stage_id: Option<StageId>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        if trip == self.trip && stage_id.is_none() {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::ActualTimesEdited(self.trip_changed(
            tenant_id,
            trip,
            stage_id,
            occurred_at,
        ))])
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        cmd.schedule.validate()?;

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            customer_id: cmd.customer_id,
            itinerary: cmd.itinerary,
            resources: cmd.resources,
            schedule: cmd.schedule,
            stage_id: cmd.stage_id,
            sale: cmd.sale,
            is_pickup_order: cmd.is_pickup_order,
            tag_ids: cmd.tag_ids.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_itinerary(&self, cmd: &UpdateItinerary) -> Result<Vec<OrderEvent>, DomainError> {
        let schedule = self
            .schedule
            .follow_itinerary(&self.itinerary, &cmd.itinerary, cmd.route_hours)?;

        Ok(vec![OrderEvent::ItineraryUpdated(ItineraryUpdated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            itinerary: cmd.itinerary,
            schedule,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tms_events::execute;
    use tms_fleet::{Route, TimeUom};

    struct Ctx {
        tenant_id: TenantId,
        draft: StageId,
        stages: TripStages,
    }

    fn ctx() -> Ctx {
        Ctx {
            tenant_id: TenantId::new(),
            draft: StageId::generate(),
            stages: TripStages {
                transit: StageId::generate(),
                closed: StageId::generate(),
            },
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn created(ctx: &Ctx, schedule: Schedule) -> TmsOrder {
        let order_id = OrderId::generate();
        let mut order = TmsOrder::empty(order_id);
        execute(
            &mut order,
            &OrderCommand::CreateOrder(CreateOrder {
                tenant_id: ctx.tenant_id,
                order_id,
                name: "TMS/00001".to_string(),
                description: None,
                customer_id: None,
                itinerary: Itinerary::default(),
                resources: Resources::default(),
                schedule,
                stage_id: ctx.draft,
                sale: None,
                is_pickup_order: false,
                tag_ids: vec![],
                occurred_at: t0(),
            }),
        )
        .unwrap();
        order
    }

    fn start(ctx: &Ctx, order: &TmsOrder, at: DateTime<Utc>) -> OrderCommand {
        OrderCommand::StartOrder(StartOrder {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            stages: ctx.stages,
            occurred_at: at,
        })
    }

    fn end(ctx: &Ctx, order: &TmsOrder, at: DateTime<Utc>) -> OrderCommand {
        OrderCommand::EndOrder(EndOrder {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            stages: ctx.stages,
            occurred_at: at,
        })
    }

    fn edit_end(ctx: &Ctx, order: &TmsOrder, date_end: Option<DateTime<Utc>>) -> OrderCommand {
        OrderCommand::EditActualEnd(EditActualEnd {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            date_end,
            stages: ctx.stages,
            occurred_at: t0(),
        })
    }

    #[test]
    fn create_puts_order_in_given_stage() {
        let ctx = ctx();
        let order = created(&ctx, Schedule::default());
        assert_eq!(order.stage_id(), Some(ctx.draft));
        assert_eq!(order.shipment_sequence(), DEFAULT_SHIPMENT_SEQUENCE);
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn create_rejects_negative_duration() {
        let order_id = OrderId::generate();
        let order = TmsOrder::empty(order_id);
        let err = order
            .handle(&OrderCommand::CreateOrder(CreateOrder {
                tenant_id: TenantId::new(),
                order_id,
                name: "Bad".to_string(),
                description: None,
                customer_id: None,
                itinerary: Itinerary::default(),
                resources: Resources::default(),
                schedule: Schedule { duration_hours: -2.0, ..Schedule::default() },
                stage_id: StageId::generate(),
                sale: None,
                is_pickup_order: false,
                tag_ids: vec![],
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn commands_on_missing_order_are_not_found() {
        let ctx = ctx();
        let order = TmsOrder::empty(OrderId::generate());
        let err = order.handle(&start(&ctx, &order, t0())).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn start_then_end_four_hours_against_five_scheduled() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule::starting_at(t0(), 5.0));

        let cmd = start(&ctx, &order, t0());
        execute(&mut order, &cmd).unwrap();
        assert!(order.trip().start_trip);
        assert_eq!(order.stage_id(), Some(ctx.stages.transit));

        let cmd = end(&ctx, &order, t0() + Duration::hours(4));
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.trip().duration, 4.0);
        assert_eq!(order.trip().diff_duration, 1.0);
        assert!(!order.trip().start_trip);
        assert!(order.trip().end_trip);
        assert_eq!(order.stage_id(), Some(ctx.stages.closed));
    }

    #[test]
    fn starting_twice_conflicts() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule::default());
        let cmd = start(&ctx, &order, t0());
        execute(&mut order, &cmd).unwrap();
        let err = order.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn removing_end_resumes_trip_in_transit() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule::starting_at(t0(), 5.0));
        let cmd = start(&ctx, &order, t0());
        execute(&mut order, &cmd).unwrap();
        let cmd = end(&ctx, &order, t0() + Duration::hours(4));
        execute(&mut order, &cmd).unwrap();

        let cmd = edit_end(&ctx, &order, None);
        execute(&mut order, &cmd).unwrap();
        assert!(order.trip().start_trip);
        assert!(!order.trip().end_trip);
        assert_eq!(order.trip().duration, 0.0);
        assert_eq!(order.trip().diff_duration, 0.0);
        assert_eq!(order.stage_id(), Some(ctx.stages.transit));
    }

    #[test]
    fn refresh_keeps_stage() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule::default());
        let cmd = start(&ctx, &order, t0());
        execute(&mut order, &cmd).unwrap();

        let cmd = OrderCommand::RefreshDuration(RefreshDuration {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            occurred_at: t0() + Duration::hours(2),
        });
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.trip().duration, 2.0);
        assert_eq!(order.stage_id(), Some(ctx.stages.transit));
        assert!(order.trip().start_trip);
    }

    #[test]
    fn route_selection_sets_scheduled_duration() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule { start: Some(t0()), ..Schedule::default() });
        let route = Route::new("Inland", None, None).with_estimate(1.0, TimeUom::Days);

        let cmd = OrderCommand::UpdateItinerary(UpdateItinerary {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            itinerary: Itinerary::via_route(&route),
            route_hours: Some(route.estimated_hours()),
            occurred_at: t0(),
        });
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.schedule().duration_hours, 24.0);
        assert_eq!(order.schedule().end, Some(t0() + Duration::hours(24)));

        let cmd = OrderCommand::UpdateItinerary(UpdateItinerary {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            itinerary: order.itinerary().with_route_flag(false),
            route_hours: None,
            occurred_at: t0(),
        });
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.schedule().duration_hours, 0.0);
    }

    #[test]
    fn schedule_edits_keep_window_consistent() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule::starting_at(t0(), 2.0));
        let cmd = OrderCommand::EditSchedule(EditSchedule {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            edit: ScheduleEdit::Duration(6.0),
            occurred_at: t0(),
        });
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.schedule().end, Some(t0() + Duration::hours(6)));
    }

    #[test]
    fn attach_rejects_order_of_another_shipment() {
        let ctx = ctx();
        let mut order = created(&ctx, Schedule::default());
        let first = AggregateId::new();
        let cmd = OrderCommand::AttachToShipment(AttachToShipment {
            tenant_id: ctx.tenant_id,
            order_id: order.id_typed(),
            shipment_id: first,
            shipment_sequence: Some(20),
            occurred_at: t0(),
        });
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.shipment_id(), Some(first));
        assert_eq!(order.shipment_sequence(), 20);

        let err = order
            .handle(&OrderCommand::AttachToShipment(AttachToShipment {
                tenant_id: ctx.tenant_id,
                order_id: order.id_typed(),
                shipment_id: AggregateId::new(),
                shipment_sequence: None,
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Rejected(_)));
    }

    #[test]
    fn stage_change_to_same_stage_is_noop() {
        let ctx = ctx();
        let order = created(&ctx, Schedule::default());
        let events = order
            .handle(&OrderCommand::ChangeStage(ChangeStage {
                tenant_id: ctx.tenant_id,
                order_id: order.id_typed(),
                stage_id: ctx.draft,
                occurred_at: t0(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }
}
