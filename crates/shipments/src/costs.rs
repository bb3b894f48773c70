//! Cost documents linked to a shipment. Amounts are in minor currency units.

use serde::{Deserialize, Serialize};

use crate::shipment::ShipmentId;

tms_core::record_id!(
    /// Identifier of an expense, purchase order or advance sheet.
    CostId
);

/// Kind of record a total depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    /// Membership of orders in the shipment.
    Orders,
    Expense,
    PurchaseOrder,
    AdvanceSheet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: CostId,
    pub shipment_id: ShipmentId,
    pub description: String,
    pub total_amount: i64,
    /// Paid from an employee advance; cleared through an advance sheet.
    pub is_advance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: CostId,
    pub shipment_id: ShipmentId,
    pub reference: String,
    pub amount_total: i64,
}

/// Advance expense sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceSheet {
    pub id: CostId,
    pub shipment_id: ShipmentId,
    pub total_amount: i64,
    pub clearing_residual: i64,
    pub advance_sheet_residual: i64,
    pub amount_payable: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostRecord {
    Expense(Expense),
    PurchaseOrder(PurchaseOrder),
    AdvanceSheet(AdvanceSheet),
}

impl CostRecord {
    pub fn id(&self) -> CostId {
        match self {
            CostRecord::Expense(e) => e.id,
            CostRecord::PurchaseOrder(p) => p.id,
            CostRecord::AdvanceSheet(a) => a.id,
        }
    }

    pub fn shipment_id(&self) -> ShipmentId {
        match self {
            CostRecord::Expense(e) => e.shipment_id,
            CostRecord::PurchaseOrder(p) => p.shipment_id,
            CostRecord::AdvanceSheet(a) => a.shipment_id,
        }
    }

    pub fn source(&self) -> CostSource {
        match self {
            CostRecord::Expense(_) => CostSource::Expense,
            CostRecord::PurchaseOrder(_) => CostSource::PurchaseOrder,
            CostRecord::AdvanceSheet(_) => CostSource::AdvanceSheet,
        }
    }
}

/// All cost records of one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipmentCosts {
    pub expenses: Vec<Expense>,
    pub purchases: Vec<PurchaseOrder>,
    pub advances: Vec<AdvanceSheet>,
}

impl ShipmentCosts {
    /// Group records by kind, keeping only those of `shipment_id`.
    pub fn collect<'a>(shipment_id: ShipmentId, records: impl IntoIterator<Item = &'a CostRecord>) -> Self {
        let mut costs = Self::default();
        for record in records.into_iter().filter(|r| r.shipment_id() == shipment_id) {
            costs.push(record.clone());
        }
        costs
    }

    pub fn push(&mut self, record: CostRecord) {
        match record {
            CostRecord::Expense(e) => self.expenses.push(e),
            CostRecord::PurchaseOrder(p) => self.purchases.push(p),
            CostRecord::AdvanceSheet(a) => self.advances.push(a),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty() && self.purchases.is_empty() && self.advances.is_empty()
    }
}
