use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{Aggregate, AggregateRoot, DomainError, DomainResult, TenantId};
use tms_events::Event;
use tms_fleet::PartnerId;
use tms_orders::{Itinerary, OrderId, Schedule, ScheduleEdit};

use crate::product::{SaleProduct, SaleProductId, TmsTracking};

tms_core::record_id!(
    /// Sale order identifier (tenant-scoped via `tenant_id` fields in events/commands).
    SalesOrderId
);

/// Sale order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
}

/// Layout-only line kinds. They carry text, never a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    Section,
    Note,
}

/// Sale line. `tms_tracking` is the product setting at the time the line was
/// added; `tms_order_id` is the TMS order generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub line_no: u32,
    pub product_id: Option<SaleProductId>,
    pub description: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: i64,
    pub display_type: Option<DisplayType>,
    pub tms_tracking: TmsTracking,
    pub tms_order_id: Option<OrderId>,
}

impl SaleLine {
    pub fn is_layout(&self) -> bool {
        self.display_type.is_some()
    }

    pub fn is_tracked(&self) -> bool {
        !self.is_layout() && self.tms_tracking != TmsTracking::No
    }
}

/// Transport data a generated order inherits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TmsPlan {
    pub itinerary: Itinerary,
    pub schedule: Schedule,
}

impl TmsPlan {
    /// Switch itinerary, keeping the schedule in step with the route.
    pub fn route_through(&self, itinerary: Itinerary, route_hours: Option<f64>) -> DomainResult<TmsPlan> {
        Ok(TmsPlan {
            schedule: self
                .schedule
                .follow_itinerary(&self.itinerary, &itinerary, route_hours)?,
            itinerary,
        })
    }

    pub fn edit_schedule(&self, edit: ScheduleEdit) -> DomainResult<TmsPlan> {
        Ok(TmsPlan {
            itinerary: self.itinerary,
            schedule: self.schedule.apply(edit)?,
        })
    }
}

/// Extra order collecting the goods before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PickupPlan {
    pub need_pickup: bool,
    pub plan: TmsPlan,
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesOrder {
    id: SalesOrderId,
    tenant_id: Option<TenantId>,
    name: String,
    customer_id: Option<PartnerId>,
    status: SalesOrderStatus,
    lines: Vec<SaleLine>,
    tms_plan: TmsPlan,
    pickup: PickupPlan,
    version: u64,
    created: bool,
}

impl SalesOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            customer_id: None,
            status: SalesOrderStatus::Draft,
            lines: Vec::new(),
            tms_plan: TmsPlan::default(),
            pickup: PickupPlan::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn customer_id(&self) -> Option<PartnerId> {
        self.customer_id
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&SaleLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn tms_plan(&self) -> &TmsPlan {
        &self.tms_plan
    }

    pub fn pickup(&self) -> &PickupPlan {
        &self.pickup
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Draft)
    }

    /// True when any product line sells a transport service.
    pub fn has_tms_product(&self) -> bool {
        self.lines.iter().any(SaleLine::is_tracked)
    }

    /// Product lines whose tracking asks for a TMS order.
    pub fn tracked_lines(&self) -> impl Iterator<Item = &SaleLine> {
        self.lines.iter().filter(|l| l.is_tracked())
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub name: String,
    pub customer_id: Option<PartnerId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
///
/// Product lines snapshot the product tracking; section and note lines carry
/// only a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub product_id: Option<SaleProductId>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub display_type: Option<DisplayType>,
    pub tms_tracking: TmsTracking,
    pub occurred_at: DateTime<Utc>,
}

impl AddLine {
    pub fn product(
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        product: &SaleProduct,
        quantity: i64,
        unit_price: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            sale_id,
            product_id: Some(product.id),
            description: product.name.clone(),
            quantity,
            unit_price,
            display_type: None,
            tms_tracking: product.tms_tracking,
            occurred_at,
        }
    }

    pub fn layout(
        tenant_id: TenantId,
        sale_id: SalesOrderId,
        display_type: DisplayType,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            sale_id,
            product_id: None,
            description: description.into(),
            quantity: 0,
            unit_price: 0,
            display_type: Some(display_type),
            tms_tracking: TmsTracking::No,
            occurred_at,
        }
    }
}

/// Command: SetTmsPlan. `route_hours` follows the same rule as on orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTmsPlan {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub itinerary: Itinerary,
    pub route_hours: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditTmsSchedule {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub edit: ScheduleEdit,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPickupPlan {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub need_pickup: bool,
    pub itinerary: Itinerary,
    pub route_hours: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPickupSchedule {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub edit: ScheduleEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LinkTmsOrder. Records the order generated for a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTmsOrder {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub line_no: u32,
    pub tms_order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    CreateSalesOrder(CreateSalesOrder),
    AddLine(AddLine),
    SetTmsPlan(SetTmsPlan),
    EditTmsSchedule(EditTmsSchedule),
    SetPickupPlan(SetPickupPlan),
    EditPickupSchedule(EditPickupSchedule),
    ConfirmOrder(ConfirmOrder),
    LinkTmsOrder(LinkTmsOrder),
}

impl SalesOrderCommand {
    pub fn sale_id(&self) -> SalesOrderId {
        match self {
            SalesOrderCommand::CreateSalesOrder(c) => c.sale_id,
            SalesOrderCommand::AddLine(c) => c.sale_id,
            SalesOrderCommand::SetTmsPlan(c) => c.sale_id,
            SalesOrderCommand::EditTmsSchedule(c) => c.sale_id,
            SalesOrderCommand::SetPickupPlan(c) => c.sale_id,
            SalesOrderCommand::EditPickupSchedule(c) => c.sale_id,
            SalesOrderCommand::ConfirmOrder(c) => c.sale_id,
            SalesOrderCommand::LinkTmsOrder(c) => c.sale_id,
        }
    }
}

/// Event: SalesOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderCreated {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub name: String,
    pub customer_id: Option<PartnerId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub line: SaleLine,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmsPlanChanged {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub plan: TmsPlan,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupPlanChanged {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub pickup: PickupPlan,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmsOrderLinked {
    pub tenant_id: TenantId,
    pub sale_id: SalesOrderId,
    pub line_no: u32,
    pub tms_order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SalesOrderCreated(SalesOrderCreated),
    LineAdded(LineAdded),
    TmsPlanChanged(TmsPlanChanged),
    PickupPlanChanged(PickupPlanChanged),
    OrderConfirmed(OrderConfirmed),
    TmsOrderLinked(TmsOrderLinked),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SalesOrderCreated(_) => "sales.order.created",
            SalesOrderEvent::LineAdded(_) => "sales.order.line_added",
            SalesOrderEvent::TmsPlanChanged(_) => "sales.order.tms_plan_changed",
            SalesOrderEvent::PickupPlanChanged(_) => "sales.order.pickup_plan_changed",
            SalesOrderEvent::OrderConfirmed(_) => "sales.order.confirmed",
            SalesOrderEvent::TmsOrderLinked(_) => "sales.order.tms_order_linked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SalesOrderCreated(e) => e.occurred_at,
            SalesOrderEvent::LineAdded(e) => e.occurred_at,
            SalesOrderEvent::TmsPlanChanged(e) => e.occurred_at,
            SalesOrderEvent::PickupPlanChanged(e) => e.occurred_at,
            SalesOrderEvent::OrderConfirmed(e) => e.occurred_at,
            SalesOrderEvent::TmsOrderLinked(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SalesOrderCreated(e) => {
                self.id = e.sale_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.customer_id = e.customer_id;
                self.status = SalesOrderStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            SalesOrderEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            SalesOrderEvent::TmsPlanChanged(e) => {
                self.tms_plan = e.plan;
            }
            SalesOrderEvent::PickupPlanChanged(e) => {
                self.pickup = e.pickup;
            }
            SalesOrderEvent::OrderConfirmed(_) => {
                self.status = SalesOrderStatus::Confirmed;
            }
            SalesOrderEvent::TmsOrderLinked(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.tms_order_id = Some(e.tms_order_id);
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesOrderCommand::CreateSalesOrder(cmd) => self.handle_create(cmd),
            SalesOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SalesOrderCommand::SetTmsPlan(cmd) => {
                self.ensure_draft(cmd.tenant_id, cmd.sale_id)?;
                let plan = self.tms_plan.route_through(cmd.itinerary, cmd.route_hours)?;
                Ok(self.plan_changed(cmd.tenant_id, plan, cmd.occurred_at))
            }
            SalesOrderCommand::EditTmsSchedule(cmd) => {
                self.ensure_draft(cmd.tenant_id, cmd.sale_id)?;
                let plan = self.tms_plan.edit_schedule(cmd.edit)?;
                Ok(self.plan_changed(cmd.tenant_id, plan, cmd.occurred_at))
            }
            SalesOrderCommand::SetPickupPlan(cmd) => {
                self.ensure_draft(cmd.tenant_id, cmd.sale_id)?;
                let pickup = PickupPlan {
                    need_pickup: cmd.need_pickup,
                    plan: self.pickup.plan.route_through(cmd.itinerary, cmd.route_hours)?,
                };
                Ok(self.pickup_changed(cmd.tenant_id, pickup, cmd.occurred_at))
            }
            SalesOrderCommand::EditPickupSchedule(cmd) => {
                self.ensure_draft(cmd.tenant_id, cmd.sale_id)?;
                let pickup = PickupPlan {
                    need_pickup: self.pickup.need_pickup,
                    plan: self.pickup.plan.edit_schedule(cmd.edit)?,
                };
                Ok(self.pickup_changed(cmd.tenant_id, pickup, cmd.occurred_at))
            }
            SalesOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            SalesOrderCommand::LinkTmsOrder(cmd) => self.handle_link(cmd),
        }
    }
}

impl SalesOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_sale_id(&self, sale_id: SalesOrderId) -> Result<(), DomainError> {
        if self.id != sale_id {
            return Err(DomainError::invariant("sale_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, sale_id: SalesOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_sale_id(sale_id)
    }

    fn ensure_draft(&self, tenant_id: TenantId, sale_id: SalesOrderId) -> Result<(), DomainError> {
        self.ensure_existing(tenant_id, sale_id)?;
        if !self.is_modifiable() {
            return Err(DomainError::invariant("cannot modify sale order once it is confirmed"));
        }
        Ok(())
    }

    fn plan_changed(&self, tenant_id: TenantId, plan: TmsPlan, occurred_at: DateTime<Utc>) -> Vec<SalesOrderEvent> {
        if plan == self.tms_plan {
            return vec![];
        }
        vec![SalesOrderEvent::TmsPlanChanged(TmsPlanChanged {
            tenant_id,
            sale_id: self.id,
            plan,
            occurred_at,
        })]
    }

    fn pickup_changed(
        &self,
        tenant_id: TenantId,
        pickup: PickupPlan,
        occurred_at: DateTime<Utc>,
    ) -> Vec<SalesOrderEvent> {
        if pickup == self.pickup {
            return vec![];
        }
        vec![SalesOrderEvent::PickupPlanChanged(PickupPlanChanged {
            tenant_id,
            sale_id: self.id,
            pickup,
            occurred_at,
        })]
    }

    fn handle_create(&self, cmd: &CreateSalesOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sales order already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![SalesOrderEvent::SalesOrderCreated(SalesOrderCreated {
            tenant_id: cmd.tenant_id,
            sale_id: cmd.sale_id,
            name: cmd.name.clone(),
            customer_id: cmd.customer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_draft(cmd.tenant_id, cmd.sale_id)?;

        match cmd.display_type {
            Some(_) => {
                if cmd.product_id.is_some() {
                    return Err(DomainError::validation("section and note lines cannot carry a product"));
                }
                if cmd.description.trim().is_empty() {
                    return Err(DomainError::validation("description cannot be empty"));
                }
            }
            None => {
                if cmd.product_id.is_none() {
                    return Err(DomainError::validation("product lines need a product"));
                }
                if cmd.quantity <= 0 {
                    return Err(DomainError::validation("quantity must be positive"));
                }
                if cmd.unit_price < 0 {
                    return Err(DomainError::validation("unit_price cannot be negative"));
                }
            }
        }

        let next_line_no = self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;
        let line = SaleLine {
            line_no: next_line_no,
            product_id: cmd.product_id,
            description: cmd.description.clone(),
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            display_type: cmd.display_type,
            tms_tracking: if cmd.display_type.is_some() {
                TmsTracking::No
            } else {
                cmd.tms_tracking
            },
            tms_order_id: None,
        };

        Ok(vec![SalesOrderEvent::LineAdded(LineAdded {
            tenant_id: cmd.tenant_id,
            sale_id: cmd.sale_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.sale_id)?;

        if self.status != SalesOrderStatus::Draft {
            return Err(DomainError::invariant("only draft orders can be confirmed"));
        }

        if self.lines.iter().all(SaleLine::is_layout) {
            return Err(DomainError::validation("cannot confirm order without lines"));
        }

        Ok(vec![SalesOrderEvent::OrderConfirmed(OrderConfirmed {
            tenant_id: cmd.tenant_id,
            sale_id: cmd.sale_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_link(&self, cmd: &LinkTmsOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.sale_id)?;

        if self.status != SalesOrderStatus::Confirmed {
            return Err(DomainError::invariant("only confirmed orders generate TMS orders"));
        }
        let Some(line) = self.line(cmd.line_no) else {
            return Err(DomainError::validation(format!("unknown sale line {}", cmd.line_no)));
        };
        if line.is_layout() {
            return Err(DomainError::validation("section and note lines cannot be linked"));
        }
        match line.tms_order_id {
            Some(current) if current == cmd.tms_order_id => Ok(vec![]),
            Some(_) => Err(DomainError::conflict(format!(
                "sale line {} is already linked to a TMS order",
                cmd.line_no
            ))),
            None => Ok(vec![SalesOrderEvent::TmsOrderLinked(TmsOrderLinked {
                tenant_id: cmd.tenant_id,
                sale_id: cmd.sale_id,
                line_no: cmd.line_no,
                tms_order_id: cmd.tms_order_id,
                occurred_at: cmd.occurred_at,
            })]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tms_events::execute;
    use tms_fleet::{Route, TimeUom};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn draft(tenant_id: TenantId) -> SalesOrder {
        let sale_id = SalesOrderId::generate();
        let mut sale = SalesOrder::empty(sale_id);
        execute(
            &mut sale,
            &SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
                tenant_id,
                sale_id,
                name: "S00001".to_string(),
                customer_id: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        sale
    }

    fn add(sale: &mut SalesOrder, tenant_id: TenantId, product: &SaleProduct) {
        let cmd = SalesOrderCommand::AddLine(AddLine::product(
            tenant_id,
            sale.id_typed(),
            product,
            1,
            1500,
            test_time(),
        ));
        execute(sale, &cmd).unwrap();
    }

    fn confirm(sale: &mut SalesOrder, tenant_id: TenantId) -> Result<Vec<SalesOrderEvent>, DomainError> {
        let cmd = SalesOrderCommand::ConfirmOrder(ConfirmOrder {
            tenant_id,
            sale_id: sale.id_typed(),
            occurred_at: test_time(),
        });
        execute(sale, &cmd)
    }

    #[test]
    fn create_requires_a_name() {
        let sale_id = SalesOrderId::generate();
        let sale = SalesOrder::empty(sale_id);
        let err = sale
            .handle(&SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
                tenant_id: TenantId::new(),
                sale_id,
                name: " ".to_string(),
                customer_id: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn lines_are_numbered_and_snapshot_tracking() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        let freight = SaleProduct::new("Freight").tracked(TmsTracking::Line);
        add(&mut sale, tenant_id, &freight);
        let cmd = SalesOrderCommand::AddLine(AddLine::layout(
            tenant_id,
            sale.id_typed(),
            DisplayType::Section,
            "Outbound",
            test_time(),
        ));
        execute(&mut sale, &cmd).unwrap();

        assert_eq!(sale.lines().len(), 2);
        assert_eq!(sale.lines()[0].line_no, 1);
        assert_eq!(sale.lines()[0].tms_tracking, TmsTracking::Line);
        assert_eq!(sale.lines()[1].line_no, 2);
        assert_eq!(sale.lines()[1].tms_tracking, TmsTracking::No);
        assert_eq!(sale.tracked_lines().count(), 1);
        assert!(sale.has_tms_product());
    }

    #[test]
    fn layout_lines_never_count_as_tracked() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        let mut cmd = AddLine::layout(tenant_id, sale.id_typed(), DisplayType::Note, "fragile", test_time());
        cmd.tms_tracking = TmsTracking::Sale;
        execute(&mut sale, &SalesOrderCommand::AddLine(cmd)).unwrap();

        assert!(!sale.has_tms_product());
        assert_eq!(sale.tracked_lines().count(), 0);
    }

    #[test]
    fn product_line_validation() {
        let tenant_id = TenantId::new();
        let sale = draft(tenant_id);
        let product = SaleProduct::new("Pallet");

        let zero_qty = AddLine::product(tenant_id, sale.id_typed(), &product, 0, 100, test_time());
        assert!(matches!(
            sale.handle(&SalesOrderCommand::AddLine(zero_qty)).unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut no_product = AddLine::product(tenant_id, sale.id_typed(), &product, 1, 100, test_time());
        no_product.product_id = None;
        assert!(matches!(
            sale.handle(&SalesOrderCommand::AddLine(no_product)).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn cannot_modify_confirmed_order() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        let product = SaleProduct::new("Pallet");
        add(&mut sale, tenant_id, &product);
        confirm(&mut sale, tenant_id).unwrap();
        assert_eq!(sale.status(), SalesOrderStatus::Confirmed);

        let cmd = AddLine::product(tenant_id, sale.id_typed(), &product, 1, 100, test_time());
        match sale.handle(&SalesOrderCommand::AddLine(cmd)).unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("once it is confirmed") => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn confirm_needs_a_product_line_and_happens_once() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        assert!(matches!(confirm(&mut sale, tenant_id).unwrap_err(), DomainError::Validation(_)));

        add(&mut sale, tenant_id, &SaleProduct::new("Pallet"));
        confirm(&mut sale, tenant_id).unwrap();
        assert!(matches!(
            confirm(&mut sale, tenant_id).unwrap_err(),
            DomainError::InvariantViolation(_)
        ));
    }

    #[test]
    fn tenant_mismatch_is_rejected() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        add(&mut sale, tenant_id, &SaleProduct::new("Pallet"));
        assert!(matches!(
            confirm(&mut sale, TenantId::new()).unwrap_err(),
            DomainError::InvariantViolation(_)
        ));
    }

    #[test]
    fn routed_plan_takes_route_estimate() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        let sale_id = sale.id_typed();
        let route = Route::new("North", None, None).with_estimate(2.0, TimeUom::Days);

        execute(
            &mut sale,
            &SalesOrderCommand::EditTmsSchedule(EditTmsSchedule {
                tenant_id,
                sale_id,
                edit: ScheduleEdit::Start(Some(test_time())),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        execute(
            &mut sale,
            &SalesOrderCommand::SetTmsPlan(SetTmsPlan {
                tenant_id,
                sale_id,
                itinerary: Itinerary::via_route(&route),
                route_hours: Some(route.estimated_hours()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let plan = sale.tms_plan();
        assert_eq!(plan.itinerary.route_id, Some(route.id));
        assert_eq!(plan.schedule.duration_hours, 48.0);
        assert_eq!(plan.schedule.end, Some(test_time() + Duration::hours(48)));
    }

    #[test]
    fn pickup_plan_is_independent_of_delivery_plan() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        let sale_id = sale.id_typed();
        let depot = PartnerId::generate();
        let customer_site = PartnerId::generate();

        execute(
            &mut sale,
            &SalesOrderCommand::SetPickupPlan(SetPickupPlan {
                tenant_id,
                sale_id,
                need_pickup: true,
                itinerary: Itinerary::ad_hoc(Some(customer_site), Some(depot)),
                route_hours: None,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        execute(
            &mut sale,
            &SalesOrderCommand::EditPickupSchedule(EditPickupSchedule {
                tenant_id,
                sale_id,
                edit: ScheduleEdit::Duration(3.0),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert!(sale.pickup().need_pickup);
        assert_eq!(sale.pickup().plan.itinerary.destination_location_id, Some(depot));
        assert_eq!(sale.pickup().plan.schedule.duration_hours, 3.0);
        assert_eq!(*sale.tms_plan(), TmsPlan::default());
    }

    #[test]
    fn unchanged_plan_emits_nothing() {
        let tenant_id = TenantId::new();
        let sale = draft(tenant_id);
        let events = sale
            .handle(&SalesOrderCommand::SetTmsPlan(SetTmsPlan {
                tenant_id,
                sale_id: sale.id_typed(),
                itinerary: Itinerary::default(),
                route_hours: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn link_tms_order_once_per_line() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        let sale_id = sale.id_typed();
        add(&mut sale, tenant_id, &SaleProduct::new("Freight").tracked(TmsTracking::Line));

        let order_id = OrderId::generate();
        let link = |tms_order_id| {
            SalesOrderCommand::LinkTmsOrder(LinkTmsOrder {
                tenant_id,
                sale_id,
                line_no: 1,
                tms_order_id,
                occurred_at: test_time(),
            })
        };

        assert!(matches!(
            sale.handle(&link(order_id)).unwrap_err(),
            DomainError::InvariantViolation(_)
        ));

        confirm(&mut sale, tenant_id).unwrap();
        execute(&mut sale, &link(order_id)).unwrap();
        assert_eq!(sale.line(1).and_then(|l| l.tms_order_id), Some(order_id));

        assert!(sale.handle(&link(order_id)).unwrap().is_empty());
        assert!(matches!(
            sale.handle(&link(OrderId::generate())).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }

    #[test]
    fn version_counts_applied_events() {
        let tenant_id = TenantId::new();
        let mut sale = draft(tenant_id);
        add(&mut sale, tenant_id, &SaleProduct::new("Pallet"));
        confirm(&mut sale, tenant_id).unwrap();
        assert_eq!(sale.version(), 3);
    }
}
