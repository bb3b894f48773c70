//! Derived-field invalidation.
//!
//! Writes report what they touched as a [`Touched`] set; the
//! [`DependencyGraph`] maps each changed field to the recomputations that
//! read it. The service evaluates the affected recomputations for the touched
//! keys before the write returns.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use tms_fleet::{PartnerId, TeamId};
use tms_orders::TmsOrder;
use tms_shipments::{CostSource, ShipmentId, TotalAmountChain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    OrderStage,
    OrderTeam,
    OrderDriver,
    OrderTrip,
    DriverTeam,
    VehicleTeam,
    /// A record feeding shipment totals.
    Cost(CostSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recompute {
    TeamStats,
    DriverStage,
    ShipmentTotals,
}

/// Edges `ChangedField → Recompute`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<ChangedField, BTreeSet<Recompute>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Team figures, driver stages, and one totals edge per cost source some
    /// contributor of `chain` depends on.
    pub fn standard(chain: &TotalAmountChain) -> Self {
        let mut graph = Self::new();
        graph
            .on(ChangedField::OrderStage, Recompute::TeamStats)
            .on(ChangedField::OrderTeam, Recompute::TeamStats)
            .on(ChangedField::DriverTeam, Recompute::TeamStats)
            .on(ChangedField::VehicleTeam, Recompute::TeamStats)
            .on(ChangedField::OrderStage, Recompute::DriverStage)
            .on(ChangedField::OrderDriver, Recompute::DriverStage)
            .on(ChangedField::OrderTrip, Recompute::DriverStage);
        for source in chain.dependencies() {
            graph.on(ChangedField::Cost(source), Recompute::ShipmentTotals);
        }
        graph
    }

    pub fn on(&mut self, field: ChangedField, recompute: Recompute) -> &mut Self {
        self.edges.entry(field).or_default().insert(recompute);
        self
    }

    pub fn affected<'a>(&self, fields: impl IntoIterator<Item = &'a ChangedField>) -> BTreeSet<Recompute> {
        fields
            .into_iter()
            .filter_map(|f| self.edges.get(f))
            .flatten()
            .copied()
            .collect()
    }

    pub fn triggers(&self, field: ChangedField, recompute: Recompute) -> bool {
        self.edges.get(&field).is_some_and(|r| r.contains(&recompute))
    }
}

/// Fields and keys touched by one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched {
    pub fields: BTreeSet<ChangedField>,
    pub teams: BTreeSet<TeamId>,
    pub drivers: BTreeSet<PartnerId>,
    pub shipments: BTreeSet<ShipmentId>,
}

impl Touched {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compare an order before and after a write. `before` is `None` for a
    /// new order.
    pub fn order(&mut self, before: Option<&TmsOrder>, after: &TmsOrder) {
        let team_before = before.and_then(|o| o.resources().team_id);
        let driver_before = before.and_then(|o| o.resources().driver_id);
        let team_after = after.resources().team_id;
        let driver_after = after.resources().driver_id;

        let stage_changed = before.is_none_or(|o| o.stage_id() != after.stage_id());
        let trip_changed = before.is_some_and(|o| o.trip().start_trip != after.trip().start_trip);

        if stage_changed {
            self.fields.insert(ChangedField::OrderStage);
            self.teams.extend(team_after);
            self.drivers.extend(driver_after);
        }
        if team_before != team_after {
            self.fields.insert(ChangedField::OrderTeam);
            self.teams.extend(team_before.into_iter().chain(team_after));
        }
        if driver_before != driver_after {
            self.fields.insert(ChangedField::OrderDriver);
            self.drivers.extend(driver_before.into_iter().chain(driver_after));
        }
        if trip_changed {
            self.fields.insert(ChangedField::OrderTrip);
            self.drivers.extend(driver_after);
        }
    }

    pub fn driver_team(&mut self, before: Option<TeamId>, after: Option<TeamId>) {
        if before != after {
            self.fields.insert(ChangedField::DriverTeam);
            self.teams.extend(before.into_iter().chain(after));
        }
    }

    pub fn vehicle_team(&mut self, before: Option<TeamId>, after: Option<TeamId>) {
        if before != after {
            self.fields.insert(ChangedField::VehicleTeam);
            self.teams.extend(before.into_iter().chain(after));
        }
    }

    pub fn cost(&mut self, shipment_id: ShipmentId, source: CostSource) {
        self.fields.insert(ChangedField::Cost(source));
        self.shipments.insert(shipment_id);
    }

    pub fn merge(&mut self, other: Touched) {
        self.fields.extend(other.fields);
        self.teams.extend(other.teams);
        self.drivers.extend(other.drivers);
        self.shipments.extend(other.shipments);
    }
}
