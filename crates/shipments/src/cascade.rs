//! Member orders affected when a shipment changes.
//!
//! Only the selection lives here; the application service issues the
//! resulting order commands in the same unit of work.

use tms_orders::{OrderId, TmsOrder};
use tms_stages::{StageId, StageProvider};

fn open(order: &TmsOrder, stages: &dyn StageProvider) -> bool {
    !order.stage_id().is_some_and(|s| stages.is_closed(s))
}

/// Unclosed members whose trip has not started yet.
pub fn start_targets(orders: &[TmsOrder], stages: &dyn StageProvider) -> Vec<OrderId> {
    orders
        .iter()
        .filter(|o| open(o, stages) && !o.trip().start_trip)
        .map(TmsOrder::id_typed)
        .collect()
}

/// Unclosed members whose trip has not ended yet.
pub fn end_targets(orders: &[TmsOrder], stages: &dyn StageProvider) -> Vec<OrderId> {
    orders
        .iter()
        .filter(|o| open(o, stages) && !o.trip().end_trip)
        .map(TmsOrder::id_typed)
        .collect()
}

/// Members whose stage is at or before `new_stage` in sequence. Orders
/// without a known stage follow too.
pub fn stage_targets(orders: &[TmsOrder], new_stage: StageId, stages: &dyn StageProvider) -> Vec<OrderId> {
    let Some(target) = stages.get(new_stage) else {
        return Vec::new();
    };
    orders
        .iter()
        .filter(|o| o.stage_id() != Some(new_stage))
        .filter(|o| {
            o.stage_id()
                .and_then(|s| stages.get(s))
                .is_none_or(|current| current.sequence <= target.sequence)
        })
        .map(TmsOrder::id_typed)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tms_core::TenantId;
    use tms_events::execute;
    use tms_orders::{ChangeStage, CreateOrder, Itinerary, OrderCommand, Resources, Schedule, StartOrder, TripStages};
    use tms_stages::{StageRegistry, StageType};

    fn order_in(registry: &StageRegistry, tenant_id: TenantId, stage: &str) -> TmsOrder {
        let order_id = OrderId::generate();
        let mut order = TmsOrder::empty(order_id);
        execute(
            &mut order,
            &OrderCommand::CreateOrder(CreateOrder {
                tenant_id,
                order_id,
                name: format!("TMS/{stage}"),
                description: None,
                customer_id: None,
                itinerary: Itinerary::default(),
                resources: Resources::default(),
                schedule: Schedule::default(),
                stage_id: registry.default_stage(StageType::Order).unwrap().id,
                sale: None,
                is_pickup_order: false,
                tag_ids: vec![],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        let stage_id = registry.by_name(StageType::Order, stage).unwrap().id;
        execute(
            &mut order,
            &OrderCommand::ChangeStage(ChangeStage {
                tenant_id,
                order_id,
                stage_id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        order
    }

    #[test]
    fn start_skips_closed_and_running_orders() {
        let registry = StageRegistry::standard();
        let tenant_id = TenantId::new();
        let draft = order_in(&registry, tenant_id, "Draft");
        let done = order_in(&registry, tenant_id, "Completed");
        let mut running = order_in(&registry, tenant_id, "Confirmed");
        let order_id = running.id_typed();
        execute(
            &mut running,
            &OrderCommand::StartOrder(StartOrder {
                tenant_id,
                order_id,
                stages: TripStages {
                    transit: registry.transit_stage(StageType::Order).unwrap().id,
                    closed: registry.closed_stage(StageType::Order).unwrap().id,
                },
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let orders = vec![draft.clone(), done, running.clone()];
        assert_eq!(start_targets(&orders, &registry), vec![draft.id_typed()]);
        assert_eq!(end_targets(&orders, &registry), vec![draft.id_typed(), running.id_typed()]);
    }

    #[test]
    fn stage_cascade_never_moves_orders_backwards() {
        let registry = StageRegistry::standard();
        let tenant_id = TenantId::new();
        let draft = order_in(&registry, tenant_id, "Draft");
        let transit = order_in(&registry, tenant_id, "In Transit");
        let confirmed = registry.by_name(StageType::Order, "Confirmed").unwrap().id;

        let orders = vec![draft.clone(), transit];
        assert_eq!(stage_targets(&orders, confirmed, &registry), vec![draft.id_typed()]);
    }
}
