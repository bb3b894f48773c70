//! Derived figures computed from snapshots. Every function is total over its
//! inputs: unknown stages count as open, missing relations count as zero.

use tms_fleet::{Partner, PartnerId, TeamId, TeamStats, Vehicle};
use tms_orders::TmsOrder;
use tms_stages::StageProvider;

pub fn team_stats(
    team_id: TeamId,
    orders: &[TmsOrder],
    drivers: &[Partner],
    vehicles: &[Vehicle],
    stages: &dyn StageProvider,
) -> TeamStats {
    let mut stats = TeamStats::default();

    for order in orders.iter().filter(|o| o.resources().team_id == Some(team_id)) {
        if order.stage_id().is_some_and(|s| stages.is_closed(s)) {
            continue;
        }
        stats.order_count += 1;
        if let Some(stage_id) = order.stage_id() {
            *stats.open_orders_by_stage.entry(stage_id).or_default() += 1;
        }
    }

    stats.driver_count = drivers
        .iter()
        .filter(|p| p.is_driver() && p.team_id() == Some(team_id))
        .count();
    stats.vehicle_count = vehicles.iter().filter(|v| v.team_id == Some(team_id)).count();

    stats
}

/// Whether the driver has an order in an unclosed stage with a started trip.
pub fn driver_in_progress(driver_id: PartnerId, orders: &[TmsOrder], stages: &dyn StageProvider) -> bool {
    orders.iter().any(|o| {
        o.resources().driver_id == Some(driver_id)
            && o.trip().start_trip
            && !o.stage_id().is_some_and(|s| stages.is_closed(s))
    })
}
