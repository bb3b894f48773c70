//! End-to-end walk through the TMS service over in-memory stores.
//!
//! Settings come from the `TMS_*` environment variables. The run prints a JSON
//! summary of the records it produced.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use serde_json::json;

use tms_core::TenantId;
use tms_fleet::{Route, TimeUom, Vehicle, VehicleType};
use tms_infra::config::TmsSettings;
use tms_infra::{NewOrder, NewPartner, TmsService};
use tms_orders::{Itinerary, Resources, Schedule};
use tms_sales::{SaleProduct, TmsTracking};
use tms_shipments::{CostId, CostRecord, Expense, ShipmentPlan};
use tms_stages::StageRegistry;

fn main() -> anyhow::Result<()> {
    tms_observability::init();

    let settings = TmsSettings::from_env().context("loading TMS settings")?;
    let mut service = TmsService::in_memory(settings, Arc::new(StageRegistry::standard()));
    let tenant_id = TenantId::new();
    let now = Utc::now();

    let team = service.register_team(tenant_id, "Lisbon")?;
    let driver = service.register_partner(tenant_id, NewPartner::driver("Marta Reis"), now)?;
    service.assign_driver_team(tenant_id, driver.id_typed(), Some(team.id), now)?;
    let mut truck = Vehicle::new("Truck 12", VehicleType::Tractor);
    truck.team_id = Some(team.id);
    let truck = service.save_vehicle(tenant_id, truck, now)?;

    let depot = service.register_partner(tenant_id, NewPartner::location("North Depot", None), now)?;
    let market = service.register_partner(
        tenant_id,
        NewPartner::location("Central Market", Some("Rua do Mercado 1".to_string())),
        now,
    )?;
    let route = service.save_route(
        tenant_id,
        Route::new("Depot to market", Some(depot.id_typed()), Some(market.id_typed()))
            .with_estimate(5.0, TimeUom::Hours),
    )?;

    let resources = Resources {
        driver_id: Some(driver.id_typed()),
        vehicle_id: Some(truck.id),
        team_id: Some(team.id),
        ..Resources::default()
    };
    let mut order_ids = Vec::new();
    for _ in 0..2 {
        let order = service.create_order(
            tenant_id,
            NewOrder {
                itinerary: Itinerary::via_route(&route),
                resources,
                schedule: Schedule::starting_at(now, 0.0),
                ..NewOrder::default()
            },
            now,
        )?;
        order_ids.push(order.id_typed());
    }

    let shipment = service.create_shipment(
        tenant_id,
        &order_ids,
        ShipmentPlan {
            resources,
            itinerary: Itinerary::via_route(&route),
            ..ShipmentPlan::default()
        },
        Vec::new(),
        now,
    )?;
    service.start_shipment(tenant_id, shipment.id_typed(), now)?;
    let ended = service.end_shipment(tenant_id, shipment.id_typed(), now + Duration::hours(4))?;
    service.register_cost(
        tenant_id,
        CostRecord::Expense(Expense {
            id: CostId::generate(),
            shipment_id: shipment.id_typed(),
            description: "Tolls".to_string(),
            total_amount: 1_850,
            is_advance: false,
        }),
        now,
    )?;

    let freight = service.save_product(tenant_id, SaleProduct::new("Freight").tracked(TmsTracking::Line))?;
    let sale = service.create_sale(tenant_id, Some(market.id_typed()), now)?;
    service.add_sale_line(tenant_id, sale.id_typed(), freight.id, 1, 45_000, now)?;
    let generated = service.confirm_sale(tenant_id, sale.id_typed(), now)?;

    let orders: Vec<_> = service
        .orders(tenant_id)
        .iter()
        .map(|o| {
            json!({
                "name": o.name(),
                "scheduled_hours": o.schedule().duration_hours,
                "duration": o.trip().duration,
                "diff_duration": o.trip().diff_duration,
                "ended": o.trip().end_trip,
            })
        })
        .collect();
    let summary = json!({
        "tenant_id": tenant_id.to_string(),
        "shipment": {
            "name": ended.name(),
            "members": ended.order_ids().len(),
            "duration": ended.trip().duration,
            "totals": service.shipment_totals(tenant_id, shipment.id_typed())?,
        },
        "orders": orders,
        "team_stats": service.team_stats(tenant_id, team.id)?,
        "sale": {
            "name": sale.name(),
            "generated": generated.iter().map(|o| o.name()).collect::<Vec<_>>(),
        },
        "contributors": service.total_contributors(),
    });

    tracing::info!(%tenant_id, "demo finished");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
