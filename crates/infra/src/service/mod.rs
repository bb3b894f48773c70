//! TMS application service.
//!
//! Every write is one unit of work: the aggregate commands it needs are
//! dispatched in order, snapshots are refreshed from the returned aggregates,
//! and the fields they touched are pushed through the [`DependencyGraph`]
//! before the call returns. Writes take `&mut self`, so a service instance has
//! a single writer.

mod master_data;
mod orders;
mod sales;
mod shipments;

pub use master_data::NewPartner;
pub use orders::NewOrder;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use tms_core::{DomainError, TenantId};
use tms_events::{EventBus, EventEnvelope, InMemoryEventBus};
use tms_fleet::{
    Crew, CrewId, Partner, PartnerCommand, PartnerId, Route, RouteId, SyncDriverStage, Tag, TagId, Team, TeamId,
    TeamStats, Vehicle, VehicleId,
};
use tms_orders::{Itinerary, OrderCommand, OrderId, Resources, TmsOrder, TripStages};
use tms_sales::{SaleProduct, SaleProductId, SalesOrder, SalesOrderCommand, SalesOrderId};
use tms_shipments::{
    CostId, CostRecord, CostSource, Shipment, ShipmentCommand, ShipmentCosts, ShipmentId, ShipmentTotals,
    TotalAmountChain,
};
use tms_stages::{StageProvider, StageType};

use crate::aggregation::{driver_in_progress, team_stats};
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::TmsSettings;
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::external::{
    ActivityLog, Geocoder, InMemoryActivityLog, InMemorySequence, Message, RecordRef, SequenceError,
    SequenceGenerator, StaticGeocoder,
};
use crate::read_model::{InMemoryTenantStore, TenantStore};
use crate::recompute::{DependencyGraph, Recompute, Touched};

pub const ORDER_TYPE: &str = "tms.order";
pub const SHIPMENT_TYPE: &str = "tms.shipment";
pub const PARTNER_TYPE: &str = "tms.partner";
pub const SALE_TYPE: &str = "sale.order";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Dispatch(DispatchError),
    #[error("sequence failed: {0}")]
    Sequence(#[from] SequenceError),
    #[error("{kind} not found: {id}")]
    Missing { kind: &'static str, id: String },
}

impl ServiceError {
    pub fn missing(kind: &'static str, id: impl ToString) -> Self {
        ServiceError::Missing {
            kind,
            id: id.to_string(),
        }
    }

    /// The business error behind this failure, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Dispatch(err) => err.domain(),
            _ => None,
        }
    }
}

impl From<DispatchError> for ServiceError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(err) => ServiceError::Domain(err),
            other => ServiceError::Dispatch(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type InMemoryBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// Snapshots and master data, per tenant.
#[derive(Default)]
struct ReadModels {
    orders: InMemoryTenantStore<OrderId, TmsOrder>,
    shipments: InMemoryTenantStore<ShipmentId, Shipment>,
    partners: InMemoryTenantStore<PartnerId, Partner>,
    sales: InMemoryTenantStore<SalesOrderId, SalesOrder>,
    vehicles: InMemoryTenantStore<VehicleId, Vehicle>,
    teams: InMemoryTenantStore<TeamId, Team>,
    crews: InMemoryTenantStore<CrewId, Crew>,
    routes: InMemoryTenantStore<RouteId, Route>,
    tags: InMemoryTenantStore<TagId, Tag>,
    products: InMemoryTenantStore<SaleProductId, SaleProduct>,
    costs: InMemoryTenantStore<CostId, CostRecord>,
    team_stats: InMemoryTenantStore<TeamId, TeamStats>,
    totals: InMemoryTenantStore<ShipmentId, ShipmentTotals>,
}

pub struct TmsService<S = Arc<InMemoryEventStore>, B = Arc<InMemoryBus>> {
    dispatcher: CommandDispatcher<S, B>,
    settings: TmsSettings,
    stages: Arc<dyn StageProvider + Send + Sync>,
    geocoder: Arc<dyn Geocoder>,
    sequences: Arc<dyn SequenceGenerator>,
    activity: Arc<dyn ActivityLog>,
    chain: TotalAmountChain,
    graph: DependencyGraph,
    models: ReadModels,
}

impl TmsService {
    /// Service over a fresh in-memory event store and bus.
    pub fn in_memory(settings: TmsSettings, stages: Arc<dyn StageProvider + Send + Sync>) -> Self {
        let dispatcher = CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryEventBus::new()));
        Self::new(dispatcher, settings, stages)
    }
}

impl<S, B> TmsService<S, B> {
    /// The total-amount chain and the recompute graph follow the installed
    /// modules. Collaborators default to the in-memory ones.
    pub fn new(
        dispatcher: CommandDispatcher<S, B>,
        settings: TmsSettings,
        stages: Arc<dyn StageProvider + Send + Sync>,
    ) -> Self {
        let chain = TotalAmountChain::standard(settings.modules.cost_modules());
        let graph = DependencyGraph::standard(&chain);
        Self {
            dispatcher,
            sequences: Arc::new(InMemorySequence::new(settings.sequences.clone())),
            geocoder: Arc::new(StaticGeocoder::new()),
            activity: Arc::new(InMemoryActivityLog::new()),
            settings,
            stages,
            chain,
            graph,
            models: ReadModels::default(),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    pub fn with_sequences(mut self, sequences: Arc<dyn SequenceGenerator>) -> Self {
        self.sequences = sequences;
        self
    }

    pub fn with_activity_log(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    pub fn settings(&self) -> &TmsSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }

    pub fn stages(&self) -> &dyn StageProvider {
        self.stages.as_ref()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Names of the installed total-amount contributors, in order.
    pub fn total_contributors(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    pub fn messages(&self, tenant_id: TenantId, record: &RecordRef) -> Vec<Message> {
        self.activity.messages(tenant_id, record)
    }

    fn trip_stages(&self) -> ServiceResult<TripStages> {
        Ok(TripStages {
            transit: self.stages.transit_stage(StageType::Order)?.id,
            closed: self.stages.closed_stage(StageType::Order)?.id,
        })
    }

    /// Itinerary with resolved locations, plus the route estimate when it
    /// travels on a route.
    fn resolve_itinerary(&self, tenant_id: TenantId, itinerary: Itinerary) -> ServiceResult<(Itinerary, Option<f64>)> {
        match itinerary.route_id.filter(|_| itinerary.use_route) {
            Some(route_id) => {
                let route = self
                    .models
                    .routes
                    .get(tenant_id, &route_id)
                    .ok_or_else(|| ServiceError::missing("route", route_id))?;
                Ok((itinerary.resolve(Some(&route)), Some(route.estimated_hours())))
            }
            None => Ok((itinerary.resolve(None), None)),
        }
    }

    fn with_crew_defaults(&self, tenant_id: TenantId, resources: Resources) -> Resources {
        let crew = resources.crew_id.and_then(|id| self.models.crews.get(tenant_id, &id));
        resources.with_crew_defaults(crew.as_ref())
    }
}

impl<S, B> TmsService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn write_order(&self, tenant_id: TenantId, command: OrderCommand) -> ServiceResult<(TmsOrder, Touched)> {
        let order_id = command.order_id();
        let before = self.models.orders.get(tenant_id, &order_id);
        let dispatched = self.dispatcher.dispatch(
            tenant_id,
            order_id.aggregate_id(),
            ORDER_TYPE,
            &command,
            |id| TmsOrder::empty(OrderId::new(id)),
        )?;

        let mut touched = Touched::new();
        if dispatched.changed() {
            touched.order(before.as_ref(), &dispatched.aggregate);
            self.models.orders.upsert(tenant_id, order_id, dispatched.aggregate.clone());
        }
        Ok((dispatched.aggregate, touched))
    }

    fn write_shipment(
        &self,
        tenant_id: TenantId,
        shipment_id: ShipmentId,
        command: ShipmentCommand,
    ) -> ServiceResult<(Shipment, Touched)> {
        let before = self.models.shipments.get(tenant_id, &shipment_id);
        let dispatched = self.dispatcher.dispatch(
            tenant_id,
            shipment_id.aggregate_id(),
            SHIPMENT_TYPE,
            &command,
            |id| Shipment::empty(ShipmentId::new(id)),
        )?;

        let mut touched = Touched::new();
        if dispatched.changed() {
            let members_changed = before
                .as_ref()
                .is_none_or(|b| b.order_ids() != dispatched.aggregate.order_ids());
            if members_changed {
                touched.cost(shipment_id, CostSource::Orders);
            }
            self.models.shipments.upsert(tenant_id, shipment_id, dispatched.aggregate.clone());
        }
        Ok((dispatched.aggregate, touched))
    }

    fn write_partner(
        &self,
        tenant_id: TenantId,
        partner_id: PartnerId,
        command: PartnerCommand,
    ) -> ServiceResult<(Partner, Touched)> {
        let before = self.models.partners.get(tenant_id, &partner_id);
        let dispatched = self.dispatcher.dispatch(
            tenant_id,
            partner_id.aggregate_id(),
            PARTNER_TYPE,
            &command,
            |id| Partner::empty(PartnerId::new(id)),
        )?;

        let mut touched = Touched::new();
        if dispatched.changed() {
            let partner = &dispatched.aggregate;
            if partner.is_driver() {
                touched.driver_team(before.as_ref().and_then(Partner::team_id), partner.team_id());
            }
            self.models.partners.upsert(tenant_id, partner_id, partner.clone());
        }
        Ok((dispatched.aggregate, touched))
    }

    fn write_sale(&self, tenant_id: TenantId, command: SalesOrderCommand) -> ServiceResult<SalesOrder> {
        let sale_id = command.sale_id();
        let dispatched = self.dispatcher.dispatch(
            tenant_id,
            sale_id.aggregate_id(),
            SALE_TYPE,
            &command,
            |id| SalesOrder::empty(SalesOrderId::new(id)),
        )?;
        if dispatched.changed() {
            self.models.sales.upsert(tenant_id, sale_id, dispatched.aggregate.clone());
        }
        Ok(dispatched.aggregate)
    }

    /// Evaluate the recomputations the touched fields feed, for the touched
    /// keys only.
    fn recompute(&self, tenant_id: TenantId, touched: Touched, at: DateTime<Utc>) -> ServiceResult<()> {
        if touched.is_empty() {
            return Ok(());
        }
        let affected = self.graph.affected(&touched.fields);
        debug!(%tenant_id, ?affected, teams = touched.teams.len(), drivers = touched.drivers.len(), "recompute");

        if affected.contains(&Recompute::DriverStage) && !touched.drivers.is_empty() {
            self.sync_driver_stages(tenant_id, &touched, at)?;
        }

        if affected.contains(&Recompute::TeamStats) && !touched.teams.is_empty() {
            let orders = self.models.orders.list(tenant_id);
            let partners = self.models.partners.list(tenant_id);
            let vehicles = self.models.vehicles.list(tenant_id);
            for team_id in &touched.teams {
                let stats = team_stats(*team_id, &orders, &partners, &vehicles, self.stages());
                self.models.team_stats.upsert(tenant_id, *team_id, stats);
            }
        }

        if affected.contains(&Recompute::ShipmentTotals) {
            for shipment_id in &touched.shipments {
                self.refresh_totals(tenant_id, *shipment_id);
            }
        }
        Ok(())
    }

    fn sync_driver_stages(&self, tenant_id: TenantId, touched: &Touched, at: DateTime<Utc>) -> ServiceResult<()> {
        let orders = self.models.orders.list(tenant_id);
        let transit_stage_id = self.stages.transit_stage(StageType::Driver)?.id;
        let default_stage_id = self.stages.default_stage(StageType::Driver)?.id;

        for driver_id in &touched.drivers {
            let Some(driver) = self.models.partners.get(tenant_id, driver_id) else {
                debug!(%tenant_id, %driver_id, "driver stage sync skipped, unknown driver");
                continue;
            };
            if !driver.is_driver() {
                continue;
            }
            let command = PartnerCommand::SyncDriverStage(SyncDriverStage {
                tenant_id,
                partner_id: *driver_id,
                in_progress: driver_in_progress(*driver_id, &orders, self.stages()),
                transit_stage_id,
                default_stage_id,
                occurred_at: at,
            });
            self.write_partner(tenant_id, *driver_id, command)?;
        }
        Ok(())
    }

    fn refresh_totals(&self, tenant_id: TenantId, shipment_id: ShipmentId) {
        let records = self
            .models
            .costs
            .filter(tenant_id, &|c: &CostRecord| c.shipment_id() == shipment_id);
        let costs = ShipmentCosts::collect(shipment_id, records.iter());
        let totals = self.chain.compute(&costs);
        debug!(%tenant_id, %shipment_id, total_amount = totals.total_amount, "shipment totals");
        self.models.totals.upsert(tenant_id, shipment_id, totals);
    }
}
