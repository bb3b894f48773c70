//! Shipment total amount.
//!
//! The total is the sum of what each registered [`TotalContributor`] adds.
//! Contributors are installed according to the cost modules in use, and the
//! union of their [`TotalContributor::depends_on`] sets decides which record
//! changes trigger a recompute.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::costs::{CostSource, ShipmentCosts};

/// Cost modules installed for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostModules {
    pub expense: bool,
    pub purchase: bool,
    /// Requires `expense`.
    pub advance_clearing: bool,
}

/// Subtotals and total amount of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShipmentTotals {
    pub expense_total: i64,
    pub purchase_total: i64,
    pub advance_total: i64,
    pub clearing_total: i64,
    pub advance_sheet_residual_total: i64,
    pub amount_payable_total: i64,
    pub total_amount: i64,
}

impl ShipmentTotals {
    /// Subtotals only; `total_amount` is left at zero.
    ///
    /// Once advance clearing is installed, advance expenses are accounted
    /// through their sheets and drop out of `expense_total`.
    pub fn subtotals(costs: &ShipmentCosts, modules: CostModules) -> Self {
        let exclude_advances = modules.advance_clearing;
        Self {
            expense_total: costs
                .expenses
                .iter()
                .filter(|e| !(exclude_advances && e.is_advance))
                .map(|e| e.total_amount)
                .sum(),
            purchase_total: costs.purchases.iter().map(|p| p.amount_total).sum(),
            advance_total: costs.advances.iter().map(|a| a.total_amount).sum(),
            clearing_total: costs.advances.iter().map(|a| a.clearing_residual).sum(),
            advance_sheet_residual_total: costs.advances.iter().map(|a| a.advance_sheet_residual).sum(),
            amount_payable_total: costs.advances.iter().map(|a| a.amount_payable).sum(),
            total_amount: 0,
        }
    }
}

/// One additive part of the shipment total.
pub trait TotalContributor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record kinds whose changes alter this contribution.
    fn depends_on(&self) -> &'static [CostSource];

    fn contribute(&self, costs: &ShipmentCosts, totals: &ShipmentTotals) -> i64;
}

/// Shipment-level base amount. Always zero; present so the chain has a root.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseTotal;

impl TotalContributor for BaseTotal {
    fn name(&self) -> &'static str {
        "base"
    }

    fn depends_on(&self) -> &'static [CostSource] {
        &[CostSource::Orders]
    }

    fn contribute(&self, _costs: &ShipmentCosts, _totals: &ShipmentTotals) -> i64 {
        0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseTotal;

impl TotalContributor for ExpenseTotal {
    fn name(&self) -> &'static str {
        "expense"
    }

    fn depends_on(&self) -> &'static [CostSource] {
        &[CostSource::Orders, CostSource::Expense]
    }

    fn contribute(&self, _costs: &ShipmentCosts, totals: &ShipmentTotals) -> i64 {
        totals.expense_total
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseTotal;

impl TotalContributor for PurchaseTotal {
    fn name(&self) -> &'static str {
        "purchase"
    }

    fn depends_on(&self) -> &'static [CostSource] {
        &[CostSource::Orders, CostSource::PurchaseOrder]
    }

    fn contribute(&self, _costs: &ShipmentCosts, totals: &ShipmentTotals) -> i64 {
        totals.purchase_total
    }
}

/// Adds what is still to be cleared and removes what is payable to the
/// employee.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvanceClearingTotal;

impl TotalContributor for AdvanceClearingTotal {
    fn name(&self) -> &'static str {
        "advance_clearing"
    }

    fn depends_on(&self) -> &'static [CostSource] {
        &[CostSource::Orders, CostSource::AdvanceSheet]
    }

    fn contribute(&self, _costs: &ShipmentCosts, totals: &ShipmentTotals) -> i64 {
        totals.clearing_total - totals.amount_payable_total
    }
}

/// Ordered list of contributors.
pub struct TotalAmountChain {
    modules: CostModules,
    contributors: Vec<Box<dyn TotalContributor>>,
}

impl core::fmt::Debug for TotalAmountChain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TotalAmountChain")
            .field("modules", &self.modules)
            .field("contributors", &self.names())
            .finish()
    }
}

impl TotalAmountChain {
    /// Chain holding only the base contributor.
    pub fn new(modules: CostModules) -> Self {
        Self {
            modules,
            contributors: vec![Box::new(BaseTotal)],
        }
    }

    /// Base plus one contributor per installed module.
    pub fn standard(modules: CostModules) -> Self {
        let mut chain = Self::new(modules);
        if modules.expense {
            chain.register(Box::new(ExpenseTotal));
        }
        if modules.purchase {
            chain.register(Box::new(PurchaseTotal));
        }
        if modules.advance_clearing {
            chain.register(Box::new(AdvanceClearingTotal));
        }
        chain
    }

    pub fn register(&mut self, contributor: Box<dyn TotalContributor>) {
        self.contributors.push(contributor);
    }

    pub fn modules(&self) -> CostModules {
        self.modules
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.contributors.iter().map(|c| c.name()).collect()
    }

    pub fn dependencies(&self) -> BTreeSet<CostSource> {
        self.contributors
            .iter()
            .flat_map(|c| c.depends_on().iter().copied())
            .collect()
    }

    pub fn compute(&self, costs: &ShipmentCosts) -> ShipmentTotals {
        let mut totals = ShipmentTotals::subtotals(costs, self.modules);
        totals.total_amount = self
            .contributors
            .iter()
            .map(|c| c.contribute(costs, &totals))
            .sum();
        totals
    }
}
