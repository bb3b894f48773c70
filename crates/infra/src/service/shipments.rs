use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use tms_core::{DomainError, TenantId};
use tms_events::{EventBus, EventEnvelope};
use tms_fleet::TagId;
use tms_orders::{
    AssignResources, AttachToShipment, ChangeStage, DetachFromShipment, EditSchedule, EndOrder, Itinerary,
    OrderCommand, OrderId, Resources, Schedule, ScheduleEdit, StartOrder, TmsOrder, UpdateItinerary,
};
use tms_shipments::{
    ActualEdit, AddOrders, AssignShipmentResources, ChangeShipmentStage, CostId, CostRecord, CreateShipment,
    EditShipmentActual, EditShipmentSchedule, KanbanState, Priority, RemoveOrder, SetKanbanState, SetPriority,
    Shipment, ShipmentCommand, ShipmentId, ShipmentPlan, ShipmentTotals, ShipmentTripCommand,
    UpdateShipmentItinerary, end_targets, stage_targets, start_targets,
};
use tms_stages::{StageId, StageType};

use super::{ServiceError, ServiceResult, TmsService};
use crate::config::SHIPMENT_SEQUENCE;
use crate::event_store::EventStore;
use crate::read_model::TenantStore;
use crate::recompute::Touched;

impl<S, B> TmsService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Group `order_ids` into a new shipment.
    ///
    /// The selection is checked before anything is written. Member orders get
    /// the shipment resources, and its route and schedule when the plan asks
    /// to overwrite them.
    #[instrument(skip(self, order_ids, plan), fields(orders = order_ids.len()))]
    pub fn create_shipment(
        &mut self,
        tenant_id: TenantId,
        order_ids: &[OrderId],
        plan: ShipmentPlan,
        tag_ids: Vec<TagId>,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let orders = self.load_orders(tenant_id, &distinct(order_ids))?;
        plan.validate(&orders, self.stages())?;

        let stage_id = self.stages.default_stage(StageType::Order)?.id;
        let (itinerary, route_hours) = self.resolve_itinerary(tenant_id, plan.itinerary)?;
        let plan = ShipmentPlan {
            itinerary,
            resources: self.with_crew_defaults(tenant_id, plan.resources),
            schedule: plan
                .schedule
                .follow_itinerary(&Itinerary::default(), &itinerary, route_hours)?,
            ..plan
        };
        let name = self.sequences.next_by_code(tenant_id, SHIPMENT_SEQUENCE)?;
        let shipment_id = ShipmentId::generate();

        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::CreateShipment(CreateShipment {
                tenant_id,
                shipment_id,
                name,
                description: None,
                itinerary: plan.itinerary,
                resources: plan.resources,
                schedule: plan.schedule,
                stage_id,
                order_ids: orders.iter().map(TmsOrder::id_typed).collect(),
                tag_ids,
                occurred_at: at,
            }),
        )?;

        for order in &orders {
            touched.merge(self.join_shipment(tenant_id, &shipment, order, &plan, route_hours, at)?);
        }
        info!(%tenant_id, %shipment_id, name = shipment.name(), "shipment created");

        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// Add orders to an existing shipment. Orders already in it are ignored;
    /// the others must be free and open.
    #[instrument(skip(self, order_ids))]
    pub fn add_orders_to_shipment(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        order_ids: &[OrderId],
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let current = self.shipment(tenant_id, shipment_id)?;
        let new_ids: Vec<OrderId> = distinct(order_ids)
            .into_iter()
            .filter(|id| !current.order_ids().contains(id))
            .collect();
        if new_ids.is_empty() {
            return Ok(current);
        }
        let orders = self.load_orders(tenant_id, &new_ids)?;
        let plan = ShipmentPlan {
            resources: *current.resources(),
            itinerary: *current.itinerary(),
            schedule: *current.schedule(),
            ..ShipmentPlan::default()
        };
        plan.validate(&orders, self.stages())?;

        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::AddOrders(AddOrders {
                tenant_id,
                shipment_id,
                order_ids: new_ids,
                occurred_at: at,
            }),
        )?;
        for order in &orders {
            touched.merge(self.join_shipment(tenant_id, &shipment, order, &plan, None, at)?);
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// Take a member order out of the shipment. Orders that are not members
    /// are rejected and keep their own shipment link.
    pub fn remove_order_from_shipment(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        order_id: OrderId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let current = self.shipment(tenant_id, shipment_id)?;
        if !current.order_ids().contains(&order_id) {
            return Err(DomainError::rejected(format!(
                "order {order_id} is not part of shipment {}",
                current.name()
            ))
            .into());
        }

        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::RemoveOrder(RemoveOrder {
                tenant_id,
                shipment_id,
                order_id,
                occurred_at: at,
            }),
        )?;
        let (_, detached) = self.write_order(
            tenant_id,
            OrderCommand::DetachFromShipment(DetachFromShipment {
                tenant_id,
                order_id,
                occurred_at: at,
            }),
        )?;
        touched.merge(detached);
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    fn join_shipment(
        &self,
        tenant_id: TenantId,
        shipment: &Shipment,
        order: &TmsOrder,
        plan: &ShipmentPlan,
        route_hours: Option<f64>,
        at: DateTime<Utc>,
    ) -> ServiceResult<Touched> {
        let order_id = order.id_typed();
        let mut touched = Touched::new();
        let (_, t) = self.write_order(
            tenant_id,
            OrderCommand::AttachToShipment(AttachToShipment {
                tenant_id,
                order_id,
                shipment_id: shipment.id_typed().aggregate_id(),
                shipment_sequence: None,
                occurred_at: at,
            }),
        )?;
        touched.merge(t);
        touched.merge(self.push_resources(tenant_id, order_id, plan.resources, at)?);

        if let Some(itinerary) = plan.member_itinerary(order) {
            let (_, t) = self.write_order(
                tenant_id,
                OrderCommand::UpdateItinerary(UpdateItinerary {
                    tenant_id,
                    order_id,
                    itinerary,
                    route_hours,
                    occurred_at: at,
                }),
            )?;
            touched.merge(t);
        }
        if let Some(schedule) = plan.member_schedule() {
            touched.merge(self.push_schedule(tenant_id, order_id, schedule, at)?);
        }
        Ok(touched)
    }

    fn push_resources(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        resources: Resources,
        at: DateTime<Utc>,
    ) -> ServiceResult<Touched> {
        let command = OrderCommand::AssignResources(AssignResources {
            tenant_id,
            order_id,
            resources,
            occurred_at: at,
        });
        Ok(self.write_order(tenant_id, command)?.1)
    }

    /// Start first, then duration, so the order ends where the shipment does.
    fn push_schedule(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        schedule: Schedule,
        at: DateTime<Utc>,
    ) -> ServiceResult<Touched> {
        let mut touched = Touched::new();
        for edit in [ScheduleEdit::Start(schedule.start), ScheduleEdit::Duration(schedule.duration_hours)] {
            let command = OrderCommand::EditSchedule(EditSchedule {
                tenant_id,
                order_id,
                edit,
                occurred_at: at,
            });
            touched.merge(self.write_order(tenant_id, command)?.1);
        }
        Ok(touched)
    }

    /// Members travelling on a route switch to the shipment route and take
    /// its estimate.
    #[instrument(skip(self, itinerary))]
    pub fn update_shipment_itinerary(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        itinerary: Itinerary,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let (itinerary, route_hours) = self.resolve_itinerary(tenant_id, itinerary)?;
        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::UpdateItinerary(UpdateShipmentItinerary {
                tenant_id,
                shipment_id,
                itinerary,
                route_hours,
                occurred_at: at,
            }),
        )?;

        let cascade = ShipmentPlan {
            itinerary,
            overwrite_route_data: true,
            ..ShipmentPlan::default()
        };
        for order in self.member_orders(tenant_id, &shipment) {
            let Some(member_itinerary) = cascade.member_itinerary(&order) else {
                continue;
            };
            let command = OrderCommand::UpdateItinerary(UpdateItinerary {
                tenant_id,
                order_id: order.id_typed(),
                itinerary: member_itinerary,
                route_hours,
                occurred_at: at,
            });
            touched.merge(self.write_order(tenant_id, command)?.1);
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// A new scheduled start is written to every member order.
    pub fn edit_shipment_schedule(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        edit: ScheduleEdit,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::EditSchedule(EditShipmentSchedule {
                tenant_id,
                shipment_id,
                edit,
                occurred_at: at,
            }),
        )?;

        if let ScheduleEdit::Start(start) = edit {
            for order in self.member_orders(tenant_id, &shipment) {
                let command = OrderCommand::EditSchedule(EditSchedule {
                    tenant_id,
                    order_id: order.id_typed(),
                    edit: ScheduleEdit::Start(start),
                    occurred_at: at,
                });
                touched.merge(self.write_order(tenant_id, command)?.1);
            }
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// Resources are written to every member order.
    #[instrument(skip(self))]
    pub fn assign_shipment_resources(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        resources: Resources,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let resources = self.with_crew_defaults(tenant_id, resources);
        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::AssignResources(AssignShipmentResources {
                tenant_id,
                shipment_id,
                resources,
                occurred_at: at,
            }),
        )?;
        for order in self.member_orders(tenant_id, &shipment) {
            touched.merge(self.push_resources(tenant_id, order.id_typed(), resources, at)?);
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// Members at or before the new stage follow it.
    #[instrument(skip(self))]
    pub fn change_shipment_stage(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        stage_id: StageId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        self.ensure_order_stage(stage_id)?;
        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::ChangeStage(ChangeShipmentStage {
                tenant_id,
                shipment_id,
                stage_id,
                occurred_at: at,
            }),
        )?;

        let members = self.member_orders(tenant_id, &shipment);
        for order_id in stage_targets(&members, stage_id, self.stages()) {
            let command = OrderCommand::ChangeStage(ChangeStage {
                tenant_id,
                order_id,
                stage_id,
                occurred_at: at,
            });
            touched.merge(self.write_order(tenant_id, command)?.1);
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// Starts the shipment trip and every open member not started yet.
    #[instrument(skip(self))]
    pub fn start_shipment(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let stages = self.trip_stages()?;
        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::StartShipment(ShipmentTripCommand {
                tenant_id,
                shipment_id,
                stages,
                occurred_at: at,
            }),
        )?;

        let members = self.member_orders(tenant_id, &shipment);
        for order_id in start_targets(&members, self.stages()) {
            let command = OrderCommand::StartOrder(StartOrder {
                tenant_id,
                order_id,
                stages,
                occurred_at: at,
            });
            touched.merge(self.write_order(tenant_id, command)?.1);
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    /// Ends the shipment trip and every open member not ended yet.
    #[instrument(skip(self))]
    pub fn end_shipment(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let stages = self.trip_stages()?;
        let (shipment, mut touched) = self.write_shipment(
            tenant_id,
            shipment_id,
            ShipmentCommand::EndShipment(ShipmentTripCommand {
                tenant_id,
                shipment_id,
                stages,
                occurred_at: at,
            }),
        )?;

        let members = self.member_orders(tenant_id, &shipment);
        for order_id in end_targets(&members, self.stages()) {
            let command = OrderCommand::EndOrder(EndOrder {
                tenant_id,
                order_id,
                stages,
                occurred_at: at,
            });
            touched.merge(self.write_order(tenant_id, command)?.1);
        }
        self.recompute(tenant_id, touched, at)?;
        Ok(shipment)
    }

    pub fn refresh_shipment_duration(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let command = ShipmentCommand::RefreshDuration(ShipmentTripCommand {
            tenant_id,
            shipment_id,
            stages: self.trip_stages()?,
            occurred_at: at,
        });
        Ok(self.write_shipment(tenant_id, shipment_id, command)?.0)
    }

    pub fn edit_shipment_actual(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        edit: ActualEdit,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let command = ShipmentCommand::EditActual(EditShipmentActual {
            tenant_id,
            shipment_id,
            edit,
            stages: self.trip_stages()?,
            occurred_at: at,
        });
        Ok(self.write_shipment(tenant_id, shipment_id, command)?.0)
    }

    pub fn set_shipment_kanban_state(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        kanban_state: KanbanState,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let command = ShipmentCommand::SetKanbanState(SetKanbanState {
            tenant_id,
            shipment_id,
            kanban_state,
            occurred_at: at,
        });
        Ok(self.write_shipment(tenant_id, shipment_id, command)?.0)
    }

    pub fn set_shipment_priority(
        &mut self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        priority: Priority,
        at: DateTime<Utc>,
    ) -> ServiceResult<Shipment> {
        let command = ShipmentCommand::SetPriority(SetPriority {
            tenant_id,
            shipment_id,
            priority,
            occurred_at: at,
        });
        Ok(self.write_shipment(tenant_id, shipment_id, command)?.0)
    }

    /// Insert or replace an expense, purchase order or advance sheet of a
    /// shipment and refresh its totals.
    #[instrument(skip(self, record), fields(cost_id = %record.id(), source = ?record.source()))]
    pub fn register_cost(&mut self, tenant_id: TenantId, record: CostRecord, at: DateTime<Utc>) -> ServiceResult<()> {
        let shipment_id = record.shipment_id();
        self.shipment(tenant_id, shipment_id)?;
        if let Some(previous) = self.models.costs.get(tenant_id, &record.id()) {
            if previous.shipment_id() != shipment_id {
                return Err(DomainError::invariant("cost record cannot move to another shipment").into());
            }
        }

        let mut touched = Touched::new();
        touched.cost(shipment_id, record.source());
        self.models.costs.upsert(tenant_id, record.id(), record);
        self.recompute(tenant_id, touched, at)
    }

    /// Detach a cost record from its shipment and refresh the totals.
    #[instrument(skip(self))]
    pub fn remove_cost(&mut self, tenant_id: TenantId, cost_id: CostId, at: DateTime<Utc>) -> ServiceResult<CostRecord> {
        let record = self
            .models
            .costs
            .remove(tenant_id, &cost_id)
            .ok_or_else(|| ServiceError::missing("cost", cost_id))?;

        let mut touched = Touched::new();
        touched.cost(record.shipment_id(), record.source());
        self.recompute(tenant_id, touched, at)?;
        Ok(record)
    }
}

/// Selection without repeats, first occurrence wins.
fn distinct(order_ids: &[OrderId]) -> Vec<OrderId> {
    let mut selection = Vec::with_capacity(order_ids.len());
    for id in order_ids {
        if !selection.contains(id) {
            selection.push(*id);
        }
    }
    selection
}

impl<S, B> TmsService<S, B> {
    pub fn shipment(&self, tenant_id: TenantId, shipment_id: ShipmentId) -> ServiceResult<Shipment> {
        self.models
            .shipments
            .get(tenant_id, &shipment_id)
            .ok_or_else(|| ServiceError::missing("shipment", shipment_id))
    }

    pub fn shipments(&self, tenant_id: TenantId) -> Vec<Shipment> {
        self.models.shipments.list(tenant_id)
    }

    /// Member orders in shipment order. Members missing from the snapshots
    /// are skipped.
    pub fn member_orders(&self, tenant_id: TenantId, shipment: &Shipment) -> Vec<TmsOrder> {
        shipment
            .order_ids()
            .iter()
            .filter_map(|id| self.models.orders.get(tenant_id, id))
            .collect()
    }

    pub fn shipment_totals(&self, tenant_id: TenantId, shipment_id: ShipmentId) -> ServiceResult<ShipmentTotals> {
        self.shipment(tenant_id, shipment_id)?;
        Ok(self.models.totals.get(tenant_id, &shipment_id).unwrap_or_default())
    }

    pub fn shipment_costs(&self, tenant_id: TenantId, shipment_id: ShipmentId) -> Vec<CostRecord> {
        self.models
            .costs
            .filter(tenant_id, &|c: &CostRecord| c.shipment_id() == shipment_id)
    }

    /// Kanban label of the shipment from its stage legends.
    pub fn shipment_kanban_label(&self, tenant_id: TenantId, shipment_id: ShipmentId) -> ServiceResult<String> {
        let shipment = self.shipment(tenant_id, shipment_id)?;
        let stage_id = shipment
            .stage_id()
            .ok_or_else(|| ServiceError::missing("stage", shipment_id))?;
        let stage = self
            .stages
            .get(stage_id)
            .ok_or_else(|| ServiceError::missing("stage", stage_id))?;
        Ok(shipment.kanban_state_label(&stage).to_string())
    }

    fn load_orders(&self, tenant_id: TenantId, order_ids: &[OrderId]) -> ServiceResult<Vec<TmsOrder>> {
        order_ids.iter().map(|id| self.order(tenant_id, *id)).collect()
    }
}
