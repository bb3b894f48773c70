use serde::{Deserialize, Serialize};

tms_core::record_id!(
    /// Sellable product identifier.
    SaleProductId
);

/// How confirmed sale lines of a product turn into TMS orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TmsTracking {
    /// No TMS order.
    #[default]
    No,
    /// One TMS order shared by every such line of the sale.
    Sale,
    /// One TMS order per line.
    Line,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleProduct {
    pub id: SaleProductId,
    pub name: String,
    pub tms_product: bool,
    pub tms_tracking: TmsTracking,
}

impl SaleProduct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SaleProductId::generate(),
            name: name.into(),
            tms_product: false,
            tms_tracking: TmsTracking::No,
        }
    }

    /// Mark as a transport service tracked with `tracking`.
    pub fn tracked(mut self, tracking: TmsTracking) -> Self {
        self.tms_product = true;
        self.tms_tracking = tracking;
        self
    }

    pub fn is_tracked(&self) -> bool {
        self.tms_tracking != TmsTracking::No
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_products_are_not_tracked() {
        let product = SaleProduct::new("Pallet");
        assert!(!product.tms_product);
        assert!(!product.is_tracked());
    }

    #[test]
    fn tracked_products_are_transport_services() {
        let product = SaleProduct::new("Freight").tracked(TmsTracking::Line);
        assert!(product.tms_product);
        assert!(product.is_tracked());
        assert_eq!(product.tms_tracking, TmsTracking::Line);
    }
}
