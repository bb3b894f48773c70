use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use tms_core::{DomainError, TenantId};
use tms_fleet::{Coordinates, Partner, Route, TimeUom};
use tms_infra::config::TmsSettings;
use tms_infra::external::{GeocodeError, Geocoder, StaticGeocoder};
use tms_infra::{NewOrder, NewPartner, TmsService};
use tms_orders::{Itinerary, Resources, Schedule};
use tms_shipments::ActualEdit;
use tms_stages::{StageProvider, StageRegistry, StageType};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

fn service() -> TmsService {
    TmsService::in_memory(TmsSettings::default(), Arc::new(StageRegistry::standard()))
}

fn stage_id(service: &TmsService, stage_type: StageType, name: &str) -> tms_stages::StageId {
    service
        .stages()
        .search(tms_stages::StageQuery::of_type(stage_type), None)
        .into_iter()
        .find(|s| s.name == name)
        .unwrap()
        .id
}

#[test]
fn driven_order_trip_measures_duration_and_frees_the_driver() {
    let mut service = service();
    let tenant_id = TenantId::new();
    let driver = service
        .register_partner(tenant_id, NewPartner::driver("Dana"), t0())
        .unwrap();
    let available = stage_id(&service, StageType::Driver, "Available");
    let on_trip = stage_id(&service, StageType::Driver, "On Trip");
    assert_eq!(driver.stage_id(), Some(available));

    let order = service
        .create_order(
            tenant_id,
            NewOrder {
                resources: Resources {
                    driver_id: Some(driver.id_typed()),
                    ..Resources::default()
                },
                schedule: Schedule::starting_at(t0(), 5.0),
                ..NewOrder::default()
            },
            t0(),
        )
        .unwrap();
    assert_eq!(order.name(), "TMS/00001");
    assert_eq!(order.stage_id(), Some(stage_id(&service, StageType::Order, "Draft")));

    let started = service.start_order(tenant_id, order.id_typed(), t0()).unwrap();
    assert_eq!(started.stage_id(), Some(stage_id(&service, StageType::Order, "In Transit")));
    assert!(started.trip().in_progress());
    assert_eq!(service.partner(tenant_id, driver.id_typed()).unwrap().stage_id(), Some(on_trip));

    let ended = service
        .end_order(tenant_id, order.id_typed(), t0() + Duration::hours(4))
        .unwrap();
    assert_eq!(ended.trip().duration, 4.0);
    assert_eq!(ended.trip().diff_duration, 1.0);
    assert!(ended.trip().end_trip);
    assert_eq!(ended.stage_id(), Some(stage_id(&service, StageType::Order, "Completed")));
    assert_eq!(service.partner(tenant_id, driver.id_typed()).unwrap().stage_id(), Some(available));
}

#[test]
fn starting_twice_is_a_conflict() {
    let mut service = service();
    let tenant_id = TenantId::new();
    let order = service.create_order(tenant_id, NewOrder::default(), t0()).unwrap();
    service.start_order(tenant_id, order.id_typed(), t0()).unwrap();

    let err = service.start_order(tenant_id, order.id_typed(), t0()).unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Conflict(_))));
}

#[test]
fn order_names_follow_the_sequence_per_tenant() {
    let mut service = service();
    let north = TenantId::new();
    let south = TenantId::new();
    let first = service.create_order(north, NewOrder::default(), t0()).unwrap();
    let second = service.create_order(north, NewOrder::default(), t0()).unwrap();
    let other = service.create_order(south, NewOrder::default(), t0()).unwrap();

    assert_eq!(first.name(), "TMS/00001");
    assert_eq!(second.name(), "TMS/00002");
    assert_eq!(other.name(), "TMS/00001");
    assert_eq!(service.orders(north).len(), 2);
    assert!(service.order(south, first.id_typed()).is_err());
}

#[test]
fn route_estimate_becomes_the_scheduled_duration() {
    let mut service = service();
    let tenant_id = TenantId::new();
    let route = service
        .save_route(tenant_id, Route::new("Coast", None, None).with_estimate(1.5, TimeUom::Days))
        .unwrap();

    let order = service
        .create_order(
            tenant_id,
            NewOrder {
                itinerary: Itinerary::via_route(&route),
                schedule: Schedule::starting_at(t0(), 2.0),
                ..NewOrder::default()
            },
            t0(),
        )
        .unwrap();
    assert_eq!(order.schedule().duration_hours, 36.0);
    assert_eq!(order.schedule().end, Some(t0() + Duration::hours(36)));
}

#[test]
fn unknown_route_is_reported_as_missing() {
    let mut service = service();
    let tenant_id = TenantId::new();
    let route = Route::new("Nowhere", None, None);
    let err = service
        .create_order(
            tenant_id,
            NewOrder {
                itinerary: Itinerary::via_route(&route),
                ..NewOrder::default()
            },
            t0(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("route not found"));
}

#[test]
fn clearing_the_actual_end_keeps_the_driver_available() {
    let mut service = service();
    let tenant_id = TenantId::new();
    let driver = service
        .register_partner(tenant_id, NewPartner::driver("Dana"), t0())
        .unwrap();
    let order = service
        .create_order(
            tenant_id,
            NewOrder {
                resources: Resources {
                    driver_id: Some(driver.id_typed()),
                    ..Resources::default()
                },
                schedule: Schedule::starting_at(t0(), 5.0),
                ..NewOrder::default()
            },
            t0(),
        )
        .unwrap();
    service.start_order(tenant_id, order.id_typed(), t0()).unwrap();
    service
        .end_order(tenant_id, order.id_typed(), t0() + Duration::hours(4))
        .unwrap();

    let edited = service
        .edit_order_actual(tenant_id, order.id_typed(), ActualEdit::End(None), t0() + Duration::hours(5))
        .unwrap();
    assert_eq!(edited.trip().date_end, None);
    assert_eq!(
        service.partner(tenant_id, driver.id_typed()).unwrap().stage_id(),
        Some(stage_id(&service, StageType::Driver, "Available"))
    );
}

#[test]
fn destination_without_coordinates_is_geocoded() {
    let spot = Coordinates::new(38.72, -9.14).unwrap();
    let geocoder = StaticGeocoder::new().with("1 Harbour Road", spot);
    let mut service = service().with_geocoder(Arc::new(geocoder));
    let tenant_id = TenantId::new();
    let depot = service
        .register_partner(
            tenant_id,
            NewPartner::location("Depot", Some("1 Harbour Road".to_string())),
            t0(),
        )
        .unwrap();
    assert_eq!(depot.coordinates(), None);

    service
        .create_order(
            tenant_id,
            NewOrder {
                itinerary: Itinerary::ad_hoc(None, Some(depot.id_typed())),
                ..NewOrder::default()
            },
            t0(),
        )
        .unwrap();
    assert_eq!(service.partner(tenant_id, depot.id_typed()).unwrap().coordinates(), Some(spot));
}

struct OfflineGeocoder;

impl Geocoder for OfflineGeocoder {
    fn geo_localize(&self, _location: &Partner) -> Result<Option<Coordinates>, GeocodeError> {
        Err(GeocodeError::Unavailable("connection refused".to_string()))
    }
}

#[test]
fn geocoder_outage_still_creates_the_order() {
    let mut service = service().with_geocoder(Arc::new(OfflineGeocoder));
    let tenant_id = TenantId::new();
    let depot = service
        .register_partner(
            tenant_id,
            NewPartner::location("Depot", Some("1 Harbour Road".to_string())),
            t0(),
        )
        .unwrap();

    let order = service
        .create_order(
            tenant_id,
            NewOrder {
                itinerary: Itinerary::ad_hoc(None, Some(depot.id_typed())),
                ..NewOrder::default()
            },
            t0(),
        )
        .unwrap();
    assert_eq!(service.orders(tenant_id).len(), 1);
    assert_eq!(service.order(tenant_id, order.id_typed()).unwrap().name(), "TMS/00001");
    assert_eq!(service.partner(tenant_id, depot.id_typed()).unwrap().coordinates(), None);
}

#[test]
fn failed_create_stores_nothing() {
    let mut service = TmsService::in_memory(TmsSettings::default(), Arc::new(StageRegistry::new()));
    let tenant_id = TenantId::new();
    let err = service.create_order(tenant_id, NewOrder::default(), t0()).unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Configuration(_))));
    assert!(service.orders(tenant_id).is_empty());
}

#[test]
fn stage_changes_reject_driver_stages() {
    let mut service = service();
    let tenant_id = TenantId::new();
    let order = service.create_order(tenant_id, NewOrder::default(), t0()).unwrap();
    let on_trip = stage_id(&service, StageType::Driver, "On Trip");

    let err = service
        .change_order_stage(tenant_id, order.id_typed(), on_trip, t0())
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Validation(_))));

    let confirmed = stage_id(&service, StageType::Order, "Confirmed");
    let moved = service
        .change_order_stage(tenant_id, order.id_typed(), confirmed, t0())
        .unwrap();
    assert_eq!(moved.stage_id(), Some(confirmed));
}
