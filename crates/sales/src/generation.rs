//! Which TMS orders a confirmed sale order needs.
//!
//! [`plan_generation`] is pure: it reads the sale and the orders already
//! generated for it and returns what to create and which lines to link. The
//! application layer executes the plan.

use serde::{Deserialize, Serialize};

use tms_fleet::PartnerId;
use tms_orders::{Itinerary, OrderId, SaleLink, Schedule, TmsOrder};

use crate::order::{SalesOrder, TmsPlan};
use crate::product::TmsTracking;

/// An order to create, with the sale lines that should point at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTmsOrder {
    pub sale_link: SaleLink,
    pub customer_id: Option<PartnerId>,
    pub itinerary: Itinerary,
    pub schedule: Schedule,
    pub is_pickup_order: bool,
    pub line_nos: Vec<u32>,
}

/// The order shared by every `Sale`-tracked line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SharedOrder {
    Reuse { order_id: OrderId, line_nos: Vec<u32> },
    Create(NewTmsOrder),
}

impl SharedOrder {
    pub fn line_nos(&self) -> &[u32] {
        match self {
            SharedOrder::Reuse { line_nos, .. } => line_nos,
            SharedOrder::Create(order) => &order.line_nos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub shared: Option<SharedOrder>,
    pub per_line: Vec<NewTmsOrder>,
    pub pickup: Option<NewTmsOrder>,
}

impl GenerationPlan {
    pub fn is_empty(&self) -> bool {
        self.shared.is_none() && self.per_line.is_empty() && self.pickup.is_none()
    }

    /// Orders to create, in creation order: shared, per line, pickup.
    pub fn new_orders(&self) -> impl Iterator<Item = &NewTmsOrder> {
        let shared = match &self.shared {
            Some(SharedOrder::Create(order)) => Some(order),
            _ => None,
        };
        shared.into_iter().chain(self.per_line.iter()).chain(self.pickup.iter())
    }
}

/// Plan the TMS orders of `sale` given the orders already generated for it.
///
/// Lines already linked are skipped, so running the plan twice creates
/// nothing the second time.
pub fn plan_generation(sale: &SalesOrder, existing: &[TmsOrder]) -> GenerationPlan {
    let mut plan = GenerationPlan::default();
    if !sale.has_tms_product() {
        return plan;
    }

    let sale_id = sale.id_typed().aggregate_id();
    let of_sale: Vec<&TmsOrder> = existing
        .iter()
        .filter(|o| o.sale().is_some_and(|link| link.sale_id == sale_id))
        .collect();

    let pending = |tracking: TmsTracking| -> Vec<u32> {
        sale.tracked_lines()
            .filter(|l| l.tms_tracking == tracking && l.tms_order_id.is_none())
            .map(|l| l.line_no)
            .collect()
    };

    let sale_lines = pending(TmsTracking::Sale);
    if !sale_lines.is_empty() {
        let reusable = of_sale
            .iter()
            .find(|o| !o.is_pickup_order() && o.sale().is_some_and(|link| link.sale_line.is_none()));
        plan.shared = Some(match reusable {
            Some(order) => SharedOrder::Reuse {
                order_id: order.id_typed(),
                line_nos: sale_lines,
            },
            None => SharedOrder::Create(new_order(sale, sale.tms_plan(), None, false, sale_lines)),
        });
    }

    plan.per_line = pending(TmsTracking::Line)
        .into_iter()
        .map(|line_no| new_order(sale, sale.tms_plan(), Some(line_no), false, vec![line_no]))
        .collect();

    let generated = plan.new_orders().next().is_some();
    let has_pickup = of_sale.iter().any(|o| o.is_pickup_order());
    if sale.pickup().need_pickup && generated && !has_pickup {
        plan.pickup = Some(new_order(sale, &sale.pickup().plan, None, true, Vec::new()));
    }

    plan
}

fn new_order(
    sale: &SalesOrder,
    tms_plan: &TmsPlan,
    sale_line: Option<u32>,
    is_pickup_order: bool,
    line_nos: Vec<u32>,
) -> NewTmsOrder {
    NewTmsOrder {
        sale_link: SaleLink {
            sale_id: sale.id_typed().aggregate_id(),
            sale_line,
        },
        customer_id: if is_pickup_order { None } else { sale.customer_id() },
        itinerary: tms_plan.itinerary,
        schedule: tms_plan.schedule.normalize(),
        is_pickup_order,
        line_nos,
    }
}

/// Orders generated from `sale`, found by sale link or by a line pointing at them.
pub fn orders_for_sale<'a>(sale: &SalesOrder, orders: &'a [TmsOrder]) -> Vec<&'a TmsOrder> {
    let sale_id = sale.id_typed().aggregate_id();
    orders
        .iter()
        .filter(|o| {
            o.sale().is_some_and(|link| link.sale_id == sale_id)
                || sale.lines().iter().any(|l| l.tms_order_id == Some(o.id_typed()))
        })
        .collect()
}

/// Message posted on the sale once its orders exist.
pub fn created_message<S: AsRef<str>>(order_names: &[S]) -> String {
    let names: Vec<&str> = order_names.iter().map(AsRef::as_ref).collect();
    format!("TMS Order(s) Created: {}", names.join(", "))
}

/// Note posted on each generated order.
pub fn origin_note(sale_name: &str) -> String {
    format!("This TMS order has been created from: {sale_name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use tms_core::TenantId;
    use tms_events::execute;
    use tms_orders::{CreateOrder, OrderCommand, Resources, ScheduleEdit};
    use tms_stages::StageId;

    use crate::order::{
        AddLine, ConfirmOrder, CreateSalesOrder, DisplayType, EditTmsSchedule, LinkTmsOrder, SalesOrderCommand,
        SalesOrderId, SetPickupPlan,
    };
    use crate::product::SaleProduct;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 6, 0, 0).unwrap()
    }

    struct Fixture {
        tenant_id: TenantId,
        sale: SalesOrder,
    }

    impl Fixture {
        fn new() -> Self {
            let tenant_id = TenantId::new();
            let sale_id = SalesOrderId::generate();
            let mut sale = SalesOrder::empty(sale_id);
            execute(
                &mut sale,
                &SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
                    tenant_id,
                    sale_id,
                    name: "S00042".to_string(),
                    customer_id: Some(PartnerId::generate()),
                    occurred_at: t0(),
                }),
            )
            .unwrap();
            Self { tenant_id, sale }
        }

        fn sale_id(&self) -> SalesOrderId {
            self.sale.id_typed()
        }

        fn line(&mut self, tracking: TmsTracking) -> &mut Self {
            let product = SaleProduct::new("Freight").tracked(tracking);
            let cmd = AddLine::product(self.tenant_id, self.sale_id(), &product, 1, 900, t0());
            execute(&mut self.sale, &SalesOrderCommand::AddLine(cmd)).unwrap();
            self
        }

        fn command(&mut self, cmd: SalesOrderCommand) -> &mut Self {
            execute(&mut self.sale, &cmd).unwrap();
            self
        }

        fn confirm(&mut self) -> &mut Self {
            let cmd = SalesOrderCommand::ConfirmOrder(ConfirmOrder {
                tenant_id: self.tenant_id,
                sale_id: self.sale_id(),
                occurred_at: t0(),
            });
            self.command(cmd)
        }

        fn link(&mut self, line_no: u32, tms_order_id: OrderId) {
            let cmd = SalesOrderCommand::LinkTmsOrder(LinkTmsOrder {
                tenant_id: self.tenant_id,
                sale_id: self.sale_id(),
                line_no,
                tms_order_id,
                occurred_at: t0(),
            });
            self.command(cmd);
        }

        /// Execute `order` the way the application layer would.
        fn materialize(&mut self, order: &NewTmsOrder) -> TmsOrder {
            let order_id = OrderId::generate();
            let mut tms = TmsOrder::empty(order_id);
            execute(
                &mut tms,
                &OrderCommand::CreateOrder(CreateOrder {
                    tenant_id: self.tenant_id,
                    order_id,
                    name: format!("TMS/{order_id}"),
                    description: None,
                    customer_id: order.customer_id,
                    itinerary: order.itinerary,
                    resources: Resources::default(),
                    schedule: order.schedule,
                    stage_id: StageId::generate(),
                    sale: Some(order.sale_link),
                    is_pickup_order: order.is_pickup_order,
                    tag_ids: Vec::new(),
                    occurred_at: t0(),
                }),
            )
            .unwrap();
            for line_no in &order.line_nos {
                self.link(*line_no, order_id);
            }
            tms
        }
    }

    #[test]
    fn no_tracked_line_is_a_silent_no_op() {
        let mut f = Fixture::new();
        f.line(TmsTracking::No);
        let note = AddLine::layout(f.tenant_id, f.sale_id(), DisplayType::Note, "handle with care", t0());
        f.command(SalesOrderCommand::AddLine(note)).confirm();

        assert!(plan_generation(&f.sale, &[]).is_empty());
    }

    #[test]
    fn sale_and_line_tracking_give_one_shared_order_and_one_per_line() {
        let mut f = Fixture::new();
        f.line(TmsTracking::Sale)
            .line(TmsTracking::Line)
            .line(TmsTracking::Sale)
            .line(TmsTracking::Line)
            .confirm();

        let plan = plan_generation(&f.sale, &[]);
        let Some(SharedOrder::Create(shared)) = &plan.shared else {
            panic!("expected a new shared order, got {:?}", plan.shared);
        };
        assert_eq!(shared.line_nos, vec![1, 3]);
        assert_eq!(shared.sale_link.sale_line, None);
        assert_eq!(shared.customer_id, f.sale.customer_id());

        let per_line: Vec<Option<u32>> = plan.per_line.iter().map(|o| o.sale_link.sale_line).collect();
        assert_eq!(per_line, vec![Some(2), Some(4)]);
        assert_eq!(plan.new_orders().count(), 3);
        assert!(plan.pickup.is_none());
    }

    #[test]
    fn second_run_after_linking_creates_nothing() {
        let mut f = Fixture::new();
        f.line(TmsTracking::Sale).line(TmsTracking::Line).confirm();

        let plan = plan_generation(&f.sale, &[]);
        let orders: Vec<TmsOrder> = plan
            .new_orders()
            .cloned()
            .collect::<Vec<_>>()
            .iter()
            .map(|o| f.materialize(o))
            .collect();
        assert_eq!(orders.len(), 2);

        let again = plan_generation(&f.sale, &orders);
        assert!(again.is_empty(), "{again:?}");
        assert_eq!(orders_for_sale(&f.sale, &orders).len(), 2);
    }

    #[test]
    fn unlinked_sale_lines_reuse_the_existing_shared_order() {
        let mut f = Fixture::new();
        f.line(TmsTracking::Sale).confirm();
        let first = plan_generation(&f.sale, &[]);
        let Some(SharedOrder::Create(shared)) = first.shared.clone() else {
            panic!("expected a new shared order");
        };
        let mut unlinked = shared.clone();
        unlinked.line_nos.clear();
        let existing = f.materialize(&unlinked);

        let plan = plan_generation(&f.sale, std::slice::from_ref(&existing));
        assert_eq!(
            plan.shared,
            Some(SharedOrder::Reuse {
                order_id: existing.id_typed(),
                line_nos: vec![1],
            })
        );
        assert_eq!(plan.new_orders().count(), 0);
    }

    #[test]
    fn pickup_order_is_appended_once() {
        let mut f = Fixture::new();
        let sale_id = f.sale_id();
        let tenant_id = f.tenant_id;
        let depot = PartnerId::generate();
        f.line(TmsTracking::Line)
            .command(SalesOrderCommand::SetPickupPlan(SetPickupPlan {
                tenant_id,
                sale_id,
                need_pickup: true,
                itinerary: Itinerary::ad_hoc(None, Some(depot)),
                route_hours: None,
                occurred_at: t0(),
            }))
            .confirm();

        let plan = plan_generation(&f.sale, &[]);
        let pickup = plan.pickup.clone().expect("pickup order");
        assert!(pickup.is_pickup_order);
        assert_eq!(pickup.itinerary.destination_location_id, Some(depot));
        assert!(pickup.line_nos.is_empty());
        assert_eq!(pickup.customer_id, None);

        let orders: Vec<TmsOrder> = plan
            .new_orders()
            .cloned()
            .collect::<Vec<_>>()
            .iter()
            .map(|o| f.materialize(o))
            .collect();
        assert_eq!(orders.iter().filter(|o| o.is_pickup_order()).count(), 1);
        assert!(plan_generation(&f.sale, &orders).is_empty());
    }

    #[test]
    fn pickup_needs_something_generated() {
        let mut f = Fixture::new();
        let sale_id = f.sale_id();
        let tenant_id = f.tenant_id;
        f.line(TmsTracking::No)
            .command(SalesOrderCommand::SetPickupPlan(SetPickupPlan {
                tenant_id,
                sale_id,
                need_pickup: true,
                itinerary: Itinerary::default(),
                route_hours: None,
                occurred_at: t0(),
            }))
            .confirm();

        assert!(plan_generation(&f.sale, &[]).is_empty());
    }

    #[test]
    fn planned_schedule_is_normalized() {
        let mut f = Fixture::new();
        let sale_id = f.sale_id();
        let tenant_id = f.tenant_id;
        let edit = |edit| {
            SalesOrderCommand::EditTmsSchedule(EditTmsSchedule {
                tenant_id,
                sale_id,
                edit,
                occurred_at: t0(),
            })
        };
        f.line(TmsTracking::Line)
            .command(edit(ScheduleEdit::Start(Some(t0()))))
            .command(edit(ScheduleEdit::End(Some(t0() + chrono::Duration::minutes(150)))))
            .confirm();

        let plan = plan_generation(&f.sale, &[]);
        let order = &plan.per_line[0];
        assert_eq!(order.schedule.start, Some(t0()));
        assert_eq!(order.schedule.duration_hours, 2.5);
        assert_eq!(order.schedule, order.schedule.normalize());
    }

    #[test]
    fn orders_of_other_sales_are_ignored() {
        let mut f = Fixture::new();
        f.line(TmsTracking::Sale).confirm();
        let mut other = Fixture::new();
        other.line(TmsTracking::Sale).confirm();
        let Some(SharedOrder::Create(foreign)) = plan_generation(&other.sale, &[]).shared else {
            panic!("expected a new shared order");
        };
        let mut foreign = foreign;
        foreign.line_nos.clear();
        let foreign_order = other.materialize(&foreign);

        let plan = plan_generation(&f.sale, std::slice::from_ref(&foreign_order));
        assert!(matches!(plan.shared, Some(SharedOrder::Create(_))));
        assert!(orders_for_sale(&f.sale, std::slice::from_ref(&foreign_order)).is_empty());
    }

    #[test]
    fn messages() {
        assert_eq!(
            created_message(&["TMS/00001", "TMS/00002"]),
            "TMS Order(s) Created: TMS/00001, TMS/00002"
        );
        assert_eq!(origin_note("S00042"), "This TMS order has been created from: S00042");
    }
}
