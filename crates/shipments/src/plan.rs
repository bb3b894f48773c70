//! Shipment creation from a selection of orders.

use serde::{Deserialize, Serialize};

use tms_core::{DomainError, DomainResult};
use tms_orders::{Itinerary, Resources, Schedule, TmsOrder};
use tms_stages::StageProvider;

/// What the user picked when grouping orders into a new shipment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipmentPlan {
    pub resources: Resources,
    pub itinerary: Itinerary,
    pub schedule: Schedule,
    /// Orders already on a route switch to the shipment route.
    pub overwrite_route_data: bool,
    /// Orders take the shipment schedule.
    pub overwrite_scheduled_date: bool,
}

impl ShipmentPlan {
    /// Reject the selection before anything is written.
    pub fn validate(&self, orders: &[TmsOrder], stages: &dyn StageProvider) -> DomainResult<()> {
        if orders.is_empty() {
            return Err(DomainError::rejected("Select at least one order to create a shipment"));
        }
        if orders.iter().any(|o| o.shipment_id().is_some()) {
            return Err(DomainError::rejected("One or more orders already have a shipment"));
        }
        if orders
            .iter()
            .any(|o| o.stage_id().is_some_and(|s| stages.is_closed(s)))
        {
            return Err(DomainError::rejected("One or more orders are in a closed stage"));
        }
        self.schedule.validate()
    }

    /// New itinerary for a member order, when the route is overwritten and
    /// the order travels on a route.
    pub fn member_itinerary(&self, order: &TmsOrder) -> Option<Itinerary> {
        let current = order.itinerary();
        if self.overwrite_route_data && self.itinerary.use_route && current.route_id.is_some() {
            Some(Itinerary {
                use_route: true,
                route_id: self.itinerary.route_id,
                origin_location_id: self.itinerary.origin_location_id,
                destination_location_id: self.itinerary.destination_location_id,
                ..*current
            })
        } else {
            None
        }
    }

    pub fn member_schedule(&self) -> Option<Schedule> {
        self.overwrite_scheduled_date.then_some(self.schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tms_core::{AggregateId, TenantId};
    use tms_events::execute;
    use tms_fleet::Route;
    use tms_orders::{AttachToShipment, ChangeStage, CreateOrder, OrderCommand, OrderId};
    use tms_stages::{StageRegistry, StageType};

    fn order(registry: &StageRegistry, tenant_id: TenantId, itinerary: Itinerary) -> TmsOrder {
        let order_id = OrderId::generate();
        let mut order = TmsOrder::empty(order_id);
        execute(
            &mut order,
            &OrderCommand::CreateOrder(CreateOrder {
                tenant_id,
                order_id,
                name: "TMS/1".to_string(),
                description: None,
                customer_id: None,
                itinerary,
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
        order
    }

    #[test]
    fn empty_selection_is_rejected() {
        let registry = StageRegistry::standard();
        let err = ShipmentPlan::default().validate(&[], &registry).unwrap_err();
        assert!(matches!(err, DomainError::Rejected(_)));
    }

    #[test]
    fn orders_in_a_shipment_are_rejected() {
        let registry = StageRegistry::standard();
        let tenant_id = TenantId::new();
        let mut linked = order(&registry, tenant_id, Itinerary::default());
        let order_id = linked.id_typed();
        execute(
            &mut linked,
            &OrderCommand::AttachToShipment(AttachToShipment {
                tenant_id,
                order_id,
                shipment_id: AggregateId::new(),
                shipment_sequence: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let orders = vec![order(&registry, tenant_id, Itinerary::default()), linked];
        let err = ShipmentPlan::default().validate(&orders, &registry).unwrap_err();
        assert_eq!(err, DomainError::rejected("One or more orders already have a shipment"));
    }

    #[test]
    fn closed_orders_are_rejected() {
        let registry = StageRegistry::standard();
        let tenant_id = TenantId::new();
        let mut closed = order(&registry, tenant_id, Itinerary::default());
        let order_id = closed.id_typed();
        execute(
            &mut closed,
            &OrderCommand::ChangeStage(ChangeStage {
                tenant_id,
                order_id,
                stage_id: registry.closed_stage(StageType::Order).unwrap().id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let err = ShipmentPlan::default().validate(&[closed], &registry).unwrap_err();
        assert_eq!(err, DomainError::rejected("One or more orders are in a closed stage"));
    }

    #[test]
    fn route_overwrite_only_touches_routed_orders() {
        let registry = StageRegistry::standard();
        let tenant_id = TenantId::new();
        let old_route = Route::new("Old", None, None);
        let new_route = Route::new("New", None, None);
        let plan = ShipmentPlan {
            itinerary: Itinerary::via_route(&new_route),
            overwrite_route_data: true,
            ..ShipmentPlan::default()
        };

        let routed = order(&registry, tenant_id, Itinerary::via_route(&old_route));
        let ad_hoc = order(&registry, tenant_id, Itinerary::default());

        assert_eq!(plan.member_itinerary(&routed).unwrap().route_id, Some(new_route.id));
        assert!(plan.member_itinerary(&ad_hoc).is_none());
        assert!(plan.member_schedule().is_none());
        assert!(plan.validate(&[routed, ad_hoc], &registry).is_ok());
    }
}
