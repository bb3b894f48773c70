use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use tms_core::{DomainError, TenantId};
use tms_events::{EventBus, EventEnvelope};
use tms_fleet::PartnerId;
use tms_orders::{Itinerary, OrderId, ScheduleEdit, TmsOrder};
use tms_sales::{
    AddLine, ConfirmOrder, CreateSalesOrder, DisplayType, EditPickupSchedule, EditTmsSchedule, GenerationPlan,
    LinkTmsOrder, SaleProductId, SalesOrder, SalesOrderCommand, SalesOrderId, SalesOrderStatus, SetPickupPlan,
    SetTmsPlan, SharedOrder, created_message, orders_for_sale, origin_note, plan_generation,
};

use super::orders::PreparedOrder;
use super::{NewOrder, ORDER_TYPE, SALE_TYPE, ServiceError, ServiceResult, TmsService};
use crate::config::SALE_SEQUENCE;
use crate::event_store::EventStore;
use crate::external::RecordRef;
use crate::read_model::TenantStore;
use crate::recompute::Touched;

impl<S, B> TmsService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn create_sale(
        &mut self,
        tenant_id: TenantId,
        customer_id: Option<PartnerId>,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        let name = self.sequences.next_by_code(tenant_id, SALE_SEQUENCE)?;
        let sale_id = SalesOrderId::generate();
        self.write_sale(
            tenant_id,
            SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
                tenant_id,
                sale_id,
                name,
                customer_id,
                occurred_at: at,
            }),
        )
    }

    /// Product line. Its tracking mode is copied from the product now.
    pub fn add_sale_line(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        product_id: SaleProductId,
        quantity: i64,
        unit_price: i64,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        let product = self
            .models
            .products
            .get(tenant_id, &product_id)
            .ok_or_else(|| ServiceError::missing("product", product_id))?;
        let line = AddLine::product(tenant_id, sale_id, &product, quantity, unit_price, at);
        self.write_sale(tenant_id, SalesOrderCommand::AddLine(line))
    }

    pub fn add_sale_note(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        display_type: DisplayType,
        description: &str,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        let line = AddLine::layout(tenant_id, sale_id, display_type, description, at);
        self.write_sale(tenant_id, SalesOrderCommand::AddLine(line))
    }

    pub fn set_sale_tms_plan(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        itinerary: Itinerary,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        let (itinerary, route_hours) = self.resolve_itinerary(tenant_id, itinerary)?;
        self.write_sale(
            tenant_id,
            SalesOrderCommand::SetTmsPlan(SetTmsPlan {
                tenant_id,
                sale_id,
                itinerary,
                route_hours,
                occurred_at: at,
            }),
        )
    }

    pub fn edit_sale_tms_schedule(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        edit: ScheduleEdit,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        self.write_sale(
            tenant_id,
            SalesOrderCommand::EditTmsSchedule(EditTmsSchedule {
                tenant_id,
                sale_id,
                edit,
                occurred_at: at,
            }),
        )
    }

    /// Requires the order pickup module when a pickup is requested.
    pub fn set_sale_pickup_plan(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        need_pickup: bool,
        itinerary: Itinerary,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        if need_pickup && !self.settings.modules.order_pickup {
            return Err(DomainError::configuration("order pickup module is not installed").into());
        }
        let (itinerary, route_hours) = self.resolve_itinerary(tenant_id, itinerary)?;
        self.write_sale(
            tenant_id,
            SalesOrderCommand::SetPickupPlan(SetPickupPlan {
                tenant_id,
                sale_id,
                need_pickup,
                itinerary,
                route_hours,
                occurred_at: at,
            }),
        )
    }

    pub fn edit_sale_pickup_schedule(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        edit: ScheduleEdit,
        at: DateTime<Utc>,
    ) -> ServiceResult<SalesOrder> {
        self.write_sale(
            tenant_id,
            SalesOrderCommand::EditPickupSchedule(EditPickupSchedule {
                tenant_id,
                sale_id,
                edit,
                occurred_at: at,
            }),
        )
    }

    /// Confirm the sale and generate the TMS orders its tracked lines need.
    ///
    /// Confirming again only creates what is still missing. Every order is
    /// prepared before the first write, so a missing stage or route leaves
    /// the sale untouched. Returns the orders created by this call.
    #[instrument(skip(self))]
    pub fn confirm_sale(
        &mut self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Vec<TmsOrder>> {
        let sale = self.sale(tenant_id, sale_id)?;
        let mut plan = plan_generation(&sale, &self.models.orders.list(tenant_id));
        if !self.settings.modules.order_pickup {
            plan.pickup = None;
        }
        let nothing_to_generate = plan.is_empty();

        let GenerationPlan {
            shared,
            per_line,
            pickup,
        } = plan;
        let (reuse, shared) = match shared {
            Some(SharedOrder::Reuse { order_id, line_nos }) => (Some((order_id, line_nos)), None),
            Some(SharedOrder::Create(order)) => (None, Some(order)),
            None => (None, None),
        };
        let prepared = shared
            .into_iter()
            .chain(per_line)
            .chain(pickup)
            .map(|new| -> ServiceResult<(PreparedOrder, Vec<u32>)> {
                let request = NewOrder {
                    customer_id: new.customer_id,
                    itinerary: new.itinerary,
                    schedule: new.schedule,
                    sale: Some(new.sale_link),
                    is_pickup_order: new.is_pickup_order,
                    ..NewOrder::default()
                };
                Ok((self.prepare_order(tenant_id, request, at)?, new.line_nos))
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        if sale.status() == SalesOrderStatus::Draft {
            self.write_sale(
                tenant_id,
                SalesOrderCommand::ConfirmOrder(ConfirmOrder {
                    tenant_id,
                    sale_id,
                    occurred_at: at,
                }),
            )?;
        }
        if nothing_to_generate {
            debug!(%tenant_id, %sale_id, "nothing to generate");
            return Ok(Vec::new());
        }

        if let Some((order_id, line_nos)) = reuse {
            self.link_lines(tenant_id, sale_id, &line_nos, order_id, at)?;
        }

        let mut touched = Touched::new();
        let mut created = Vec::new();
        for (order, line_nos) in prepared {
            let (order, t) = self.commit_order(tenant_id, order)?;
            touched.merge(t);
            self.link_lines(tenant_id, sale_id, &line_nos, order.id_typed(), at)?;
            self.activity.post(
                tenant_id,
                RecordRef::new(ORDER_TYPE, order.id_typed().aggregate_id()),
                origin_note(sale.name()),
                at,
            );
            created.push(order);
        }

        if !created.is_empty() {
            let names: Vec<&str> = created.iter().map(TmsOrder::name).collect();
            self.activity.post(
                tenant_id,
                RecordRef::new(SALE_TYPE, sale_id.aggregate_id()),
                created_message(&names),
                at,
            );
        }
        info!(%tenant_id, %sale_id, created = created.len(), "sale orders generated");

        self.recompute(tenant_id, touched, at)?;
        Ok(created)
    }

    fn link_lines(
        &self,
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        line_nos: &[u32],
        tms_order_id: OrderId,
        at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        for &line_no in line_nos {
            self.write_sale(
                tenant_id,
                SalesOrderCommand::LinkTmsOrder(LinkTmsOrder {
                    tenant_id,
                    sale_id,
                    line_no,
                    tms_order_id,
                    occurred_at: at,
                }),
            )?;
        }
        Ok(())
    }
}

impl<S, B> TmsService<S, B> {
    pub fn sale(&self, tenant_id: TenantId, sale_id: SalesOrderId) -> ServiceResult<SalesOrder> {
        self.models
            .sales
            .get(tenant_id, &sale_id)
            .ok_or_else(|| ServiceError::missing("sale", sale_id))
    }

    /// TMS orders generated from the sale.
    pub fn tms_orders_for_sale(&self, tenant_id: TenantId, sale_id: SalesOrderId) -> ServiceResult<Vec<TmsOrder>> {
        let sale = self.sale(tenant_id, sale_id)?;
        let orders = self.models.orders.list(tenant_id);
        Ok(orders_for_sale(&sale, &orders).into_iter().cloned().collect())
    }

    pub fn tms_order_count_for_sale(&self, tenant_id: TenantId, sale_id: SalesOrderId) -> ServiceResult<usize> {
        Ok(self.tms_orders_for_sale(tenant_id, sale_id)?.len())
    }
}
