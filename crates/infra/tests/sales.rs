use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use tms_core::{DomainError, TenantId};
use tms_infra::config::{Modules, TmsSettings};
use tms_infra::external::RecordRef;
use tms_infra::service::{ORDER_TYPE, SALE_TYPE};
use tms_infra::{NewPartner, TmsService};
use tms_orders::{Itinerary, Schedule, ScheduleEdit};
use tms_sales::{DisplayType, SaleProduct, SalesOrder, SalesOrderStatus, TmsTracking};
use tms_stages::StageRegistry;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
}

fn service_with(settings: TmsSettings) -> TmsService {
    TmsService::in_memory(settings, Arc::new(StageRegistry::standard()))
}

/// Sale with two `Sale`-tracked lines, one `Line`-tracked line, an untracked
/// product and a note.
fn sale(service: &mut TmsService, tenant_id: TenantId) -> SalesOrder {
    let customer = service
        .register_partner(tenant_id, NewPartner::location("Acme Foods", None), t0())
        .unwrap();
    let freight = service
        .save_product(tenant_id, SaleProduct::new("Freight").tracked(TmsTracking::Sale))
        .unwrap();
    let express = service
        .save_product(tenant_id, SaleProduct::new("Express").tracked(TmsTracking::Line))
        .unwrap();
    let pallet = service.save_product(tenant_id, SaleProduct::new("Pallet")).unwrap();

    let sale = service
        .create_sale(tenant_id, Some(customer.id_typed()), t0())
        .unwrap();
    let sale_id = sale.id_typed();
    service.add_sale_line(tenant_id, sale_id, freight.id, 1, 50_000, t0()).unwrap();
    service.add_sale_line(tenant_id, sale_id, freight.id, 2, 20_000, t0()).unwrap();
    service.add_sale_line(tenant_id, sale_id, express.id, 1, 90_000, t0()).unwrap();
    service.add_sale_line(tenant_id, sale_id, pallet.id, 10, 1_500, t0()).unwrap();
    service
        .add_sale_note(tenant_id, sale_id, DisplayType::Note, "Fragile", t0())
        .unwrap()
}

#[test]
fn confirming_generates_shared_and_per_line_orders() {
    let mut service = service_with(TmsSettings::default());
    let tenant_id = TenantId::new();
    let sale = sale(&mut service, tenant_id);
    assert_eq!(sale.name(), "S00001");

    let created = service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|o| o.customer_id() == sale.customer_id()));
    let shared = created.iter().find(|o| o.sale().is_some_and(|l| l.sale_line.is_none()));
    assert!(shared.is_some());

    let confirmed = service.sale(tenant_id, sale.id_typed()).unwrap();
    assert_eq!(confirmed.status(), SalesOrderStatus::Confirmed);
    let linked: Vec<_> = confirmed.tracked_lines().map(|l| l.tms_order_id).collect();
    assert_eq!(linked.len(), 3);
    assert!(linked.iter().all(Option::is_some));
    assert_eq!(linked[0], linked[1]);
    assert_ne!(linked[0], linked[2]);

    let messages = service.messages(tenant_id, &RecordRef::new(SALE_TYPE, sale.id_typed().aggregate_id()));
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "TMS Order(s) Created: TMS/00001, TMS/00002");

    let note = service.messages(tenant_id, &RecordRef::new(ORDER_TYPE, created[0].id_typed().aggregate_id()));
    assert_eq!(note[0].body, "This TMS order has been created from: S00001");
}

#[test]
fn confirming_again_creates_nothing() {
    let mut service = service_with(TmsSettings::default());
    let tenant_id = TenantId::new();
    let sale = sale(&mut service, tenant_id);
    service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap();

    let again = service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap();
    assert!(again.is_empty());
    assert_eq!(service.tms_order_count_for_sale(tenant_id, sale.id_typed()).unwrap(), 2);
    assert_eq!(service.orders(tenant_id).len(), 2);
}

#[test]
fn pickup_plan_adds_a_pickup_order() {
    let mut service = service_with(TmsSettings::default());
    let tenant_id = TenantId::new();
    let warehouse = service
        .register_partner(tenant_id, NewPartner::location("Warehouse", None), t0())
        .unwrap();
    let sale = sale(&mut service, tenant_id);
    service
        .set_sale_pickup_plan(
            tenant_id,
            sale.id_typed(),
            true,
            Itinerary::ad_hoc(Some(warehouse.id_typed()), None),
            t0(),
        )
        .unwrap();
    service
        .edit_sale_pickup_schedule(tenant_id, sale.id_typed(), ScheduleEdit::Start(Some(t0())), t0())
        .unwrap();

    let created = service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap();
    assert_eq!(created.len(), 3);
    let pickup = created.last().unwrap();
    assert!(pickup.is_pickup_order());
    assert_eq!(pickup.customer_id(), None);
    assert_eq!(pickup.itinerary().origin_location_id, Some(warehouse.id_typed()));
    assert_eq!(pickup.schedule().start, Some(t0()));
}

#[test]
fn pickup_needs_the_pickup_module() {
    let settings = TmsSettings {
        modules: Modules::none(),
        ..TmsSettings::default()
    };
    let mut service = service_with(settings);
    let tenant_id = TenantId::new();
    let sale = sale(&mut service, tenant_id);

    let err = service
        .set_sale_pickup_plan(tenant_id, sale.id_typed(), true, Itinerary::default(), t0())
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Configuration(_))));
}

#[test]
fn tms_plan_is_copied_to_generated_orders() {
    let mut service = service_with(TmsSettings::default());
    let tenant_id = TenantId::new();
    let sale = sale(&mut service, tenant_id);
    let start = t0() + chrono::Duration::days(2);
    service
        .set_sale_tms_plan(tenant_id, sale.id_typed(), Itinerary::default(), t0())
        .unwrap();
    service
        .edit_sale_tms_schedule(tenant_id, sale.id_typed(), ScheduleEdit::Start(Some(start)), t0())
        .unwrap();
    service
        .edit_sale_tms_schedule(tenant_id, sale.id_typed(), ScheduleEdit::Duration(3.0), t0())
        .unwrap();

    let created = service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap();
    let expected = Schedule::starting_at(start, 3.0);
    assert!(created.iter().all(|o| *o.schedule() == expected));
}

#[test]
fn sales_without_transport_lines_generate_nothing() {
    let mut service = service_with(TmsSettings::default());
    let tenant_id = TenantId::new();
    let pallet = service.save_product(tenant_id, SaleProduct::new("Pallet")).unwrap();
    let sale = service.create_sale(tenant_id, None, t0()).unwrap();
    service
        .add_sale_line(tenant_id, sale.id_typed(), pallet.id, 4, 1_500, t0())
        .unwrap();

    let created = service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap();
    assert!(created.is_empty());
    assert!(service
        .messages(tenant_id, &RecordRef::new(SALE_TYPE, sale.id_typed().aggregate_id()))
        .is_empty());
}

#[test]
fn failed_confirmation_leaves_the_sale_untouched() {
    let mut service = TmsService::in_memory(TmsSettings::default(), Arc::new(StageRegistry::new()));
    let tenant_id = TenantId::new();
    let sale = sale(&mut service, tenant_id);

    let err = service.confirm_sale(tenant_id, sale.id_typed(), t0()).unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Configuration(_))));

    let unchanged = service.sale(tenant_id, sale.id_typed()).unwrap();
    assert_eq!(unchanged.status(), SalesOrderStatus::Draft);
    assert!(unchanged.tracked_lines().all(|l| l.tms_order_id.is_none()));
    assert!(service.orders(tenant_id).is_empty());
    assert!(service
        .messages(tenant_id, &RecordRef::new(SALE_TYPE, sale.id_typed().aggregate_id()))
        .is_empty());
}
