use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};

use tms_core::{DomainError, TenantId};
use tms_events::{EventBus, EventEnvelope};
use tms_fleet::{Coordinates, PartnerCommand, PartnerId, SetCoordinates, TagId};
use tms_orders::{
    AssignResources, ChangeStage, CreateOrder, EditActualDuration, EditActualEnd, EditActualStart, EditSchedule,
    EndOrder, Itinerary, OrderCommand, OrderId, RefreshDuration, Resources, SaleLink, Schedule, ScheduleEdit,
    StartOrder, TmsOrder, UpdateItinerary,
};
use tms_shipments::ActualEdit;
use tms_stages::{StageId, StageType};

use super::{ServiceError, ServiceResult, TmsService};
use crate::config::ORDER_SEQUENCE;
use crate::event_store::EventStore;
use crate::read_model::TenantStore;
use crate::recompute::Touched;

/// Input of a new transport order. The name comes from the `tms.order`
/// sequence and the stage is the default order stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewOrder {
    pub description: Option<String>,
    pub customer_id: Option<PartnerId>,
    pub itinerary: Itinerary,
    pub resources: Resources,
    pub schedule: Schedule,
    pub sale: Option<SaleLink>,
    pub is_pickup_order: bool,
    pub tag_ids: Vec<TagId>,
}

/// A checked `CreateOrder` and the destination coordinates to store with it.
#[derive(Debug, Clone)]
pub(super) struct PreparedOrder {
    command: CreateOrder,
    destination: Option<(PartnerId, Coordinates)>,
}

impl<S, B> TmsService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    #[instrument(skip(self, order))]
    pub fn create_order(&mut self, tenant_id: TenantId, order: NewOrder, at: DateTime<Utc>) -> ServiceResult<TmsOrder> {
        let prepared = self.prepare_order(tenant_id, order, at)?;
        let (order, touched) = self.commit_order(tenant_id, prepared)?;
        self.recompute(tenant_id, touched, at)?;
        Ok(order)
    }

    /// Resolve everything a new order needs without writing anything: stage,
    /// itinerary, schedule, name and destination coordinates.
    pub(super) fn prepare_order(
        &self,
        tenant_id: TenantId,
        order: NewOrder,
        at: DateTime<Utc>,
    ) -> ServiceResult<PreparedOrder> {
        let stage_id = self.stages.default_stage(StageType::Order)?.id;
        let (itinerary, route_hours) = self.resolve_itinerary(tenant_id, order.itinerary)?;
        let schedule = order
            .schedule
            .follow_itinerary(&Itinerary::default(), &itinerary, route_hours)?;
        let destination = self.locate_destination(tenant_id, &itinerary);
        let name = self.sequences.next_by_code(tenant_id, ORDER_SEQUENCE)?;

        Ok(PreparedOrder {
            command: CreateOrder {
                tenant_id,
                order_id: OrderId::generate(),
                name,
                description: order.description,
                customer_id: order.customer_id,
                itinerary,
                resources: self.with_crew_defaults(tenant_id, order.resources),
                schedule,
                stage_id,
                sale: order.sale,
                is_pickup_order: order.is_pickup_order,
                tag_ids: order.tag_ids,
                occurred_at: at,
            },
            destination,
        })
    }

    /// Write a prepared order, then the coordinates found for its destination.
    /// No recompute.
    pub(super) fn commit_order(&self, tenant_id: TenantId, prepared: PreparedOrder) -> ServiceResult<(TmsOrder, Touched)> {
        let PreparedOrder { command, destination } = prepared;
        let at = command.occurred_at;
        let order_id = command.order_id;
        let (created, touched) = self.write_order(tenant_id, OrderCommand::CreateOrder(command))?;
        info!(%tenant_id, %order_id, name = created.name(), "order created");

        if let Some((location_id, coordinates)) = destination {
            let command = PartnerCommand::SetCoordinates(SetCoordinates {
                tenant_id,
                partner_id: location_id,
                coordinates,
                occurred_at: at,
            });
            self.write_partner(tenant_id, location_id, command)?;
            debug!(%tenant_id, %location_id, "destination geocoded");
        }
        Ok((created, touched))
    }

    /// Coordinates for a destination location that has none, when the
    /// geoengine module is installed. Geocoder failures only warn.
    fn locate_destination(&self, tenant_id: TenantId, itinerary: &Itinerary) -> Option<(PartnerId, Coordinates)> {
        if !self.settings.modules.geoengine {
            return None;
        }
        let location_id = itinerary.destination_location_id?;
        let location = self.models.partners.get(tenant_id, &location_id)?;
        if !location.is_location() || location.coordinates().is_some() {
            return None;
        }

        match self.geocoder.geo_localize(&location) {
            Ok(Some(coordinates)) => Some((location_id, coordinates)),
            Ok(None) => {
                warn!(%tenant_id, %location_id, "destination address could not be geocoded");
                None
            }
            Err(error) => {
                warn!(%tenant_id, %location_id, %error, "geocoding failed, order kept without coordinates");
                None
            }
        }
    }

    /// Route changes take the route estimate as scheduled duration.
    #[instrument(skip(self, itinerary))]
    pub fn update_order_itinerary(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        itinerary: Itinerary,
        at: DateTime<Utc>,
    ) -> ServiceResult<TmsOrder> {
        let (itinerary, route_hours) = self.resolve_itinerary(tenant_id, itinerary)?;
        let command = OrderCommand::UpdateItinerary(UpdateItinerary {
            tenant_id,
            order_id,
            itinerary,
            route_hours,
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    pub fn edit_order_schedule(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        edit: ScheduleEdit,
        at: DateTime<Utc>,
    ) -> ServiceResult<TmsOrder> {
        let command = OrderCommand::EditSchedule(EditSchedule {
            tenant_id,
            order_id,
            edit,
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    /// Assigning a crew fills an empty vehicle with the crew default.
    #[instrument(skip(self))]
    pub fn assign_order_resources(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        resources: Resources,
        at: DateTime<Utc>,
    ) -> ServiceResult<TmsOrder> {
        let command = OrderCommand::AssignResources(AssignResources {
            tenant_id,
            order_id,
            resources: self.with_crew_defaults(tenant_id, resources),
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    #[instrument(skip(self))]
    pub fn change_order_stage(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        stage_id: StageId,
        at: DateTime<Utc>,
    ) -> ServiceResult<TmsOrder> {
        self.ensure_order_stage(stage_id)?;
        let command = OrderCommand::ChangeStage(ChangeStage {
            tenant_id,
            order_id,
            stage_id,
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    #[instrument(skip(self))]
    pub fn start_order(&mut self, tenant_id: TenantId, order_id: OrderId, at: DateTime<Utc>) -> ServiceResult<TmsOrder> {
        let command = OrderCommand::StartOrder(StartOrder {
            tenant_id,
            order_id,
            stages: self.trip_stages()?,
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    #[instrument(skip(self))]
    pub fn end_order(&mut self, tenant_id: TenantId, order_id: OrderId, at: DateTime<Utc>) -> ServiceResult<TmsOrder> {
        let command = OrderCommand::EndOrder(EndOrder {
            tenant_id,
            order_id,
            stages: self.trip_stages()?,
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    pub fn refresh_order_duration(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> ServiceResult<TmsOrder> {
        let command = OrderCommand::RefreshDuration(RefreshDuration {
            tenant_id,
            order_id,
            occurred_at: at,
        });
        self.apply_order(tenant_id, command, at)
    }

    /// Correct the actual trip window. Clearing the end does not move the
    /// driver back to the transit stage.
    #[instrument(skip(self))]
    pub fn edit_order_actual(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        edit: ActualEdit,
        at: DateTime<Utc>,
    ) -> ServiceResult<TmsOrder> {
        let command = match edit {
            ActualEdit::Start(date_start) => OrderCommand::EditActualStart(EditActualStart {
                tenant_id,
                order_id,
                date_start,
                stages: self.trip_stages()?,
                occurred_at: at,
            }),
            ActualEdit::End(date_end) => OrderCommand::EditActualEnd(EditActualEnd {
                tenant_id,
                order_id,
                date_end,
                stages: self.trip_stages()?,
                occurred_at: at,
            }),
            ActualEdit::Duration(duration) => OrderCommand::EditActualDuration(EditActualDuration {
                tenant_id,
                order_id,
                duration,
                occurred_at: at,
            }),
        };

        let (order, mut touched) = self.write_order(tenant_id, command)?;
        if matches!(edit, ActualEdit::End(None)) {
            touched.drivers.clear();
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(order)
    }

    fn apply_order(&self, tenant_id: TenantId, command: OrderCommand, at: DateTime<Utc>) -> ServiceResult<TmsOrder> {
        let (order, touched) = self.write_order(tenant_id, command)?;
        self.recompute(tenant_id, touched, at)?;
        Ok(order)
    }

    pub(super) fn ensure_order_stage(&self, stage_id: StageId) -> ServiceResult<()> {
        let stage = self
            .stages
            .get(stage_id)
            .ok_or_else(|| ServiceError::missing("stage", stage_id))?;
        if stage.stage_type != StageType::Order {
            return Err(DomainError::validation(format!("stage {} is not an order stage", stage.name)).into());
        }
        Ok(())
    }
}

impl<S, B> TmsService<S, B> {
    pub fn order(&self, tenant_id: TenantId, order_id: OrderId) -> ServiceResult<TmsOrder> {
        self.models
            .orders
            .get(tenant_id, &order_id)
            .ok_or_else(|| ServiceError::missing("order", order_id))
    }

    pub fn orders(&self, tenant_id: TenantId) -> Vec<TmsOrder> {
        self.models.orders.list(tenant_id)
    }
}
