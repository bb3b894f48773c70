//! Shipments group orders that travel together with the same resources.
//!
//! Besides the aggregate this crate holds the creation plan, the cost records
//! linked to a shipment and the contributor chain that composes its total
//! amount.

pub mod cascade;
pub mod costs;
pub mod plan;
pub mod rollup;
pub mod shipment;

pub use cascade::{end_targets, stage_targets, start_targets};
pub use costs::{AdvanceSheet, CostId, CostRecord, CostSource, Expense, PurchaseOrder, ShipmentCosts};
pub use plan::ShipmentPlan;
pub use rollup::{
    AdvanceClearingTotal, BaseTotal, CostModules, ExpenseTotal, PurchaseTotal, ShipmentTotals,
    TotalAmountChain, TotalContributor,
};
pub use shipment::*;
