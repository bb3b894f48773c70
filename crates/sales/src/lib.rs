//! Sale orders carrying transport data, and the policy that turns their
//! confirmed lines into TMS orders.
//!
//! Pure domain logic: the application layer executes the generated plan.

pub mod generation;
pub mod order;
pub mod product;

pub use generation::{
    GenerationPlan, NewTmsOrder, SharedOrder, created_message, orders_for_sale, origin_note,
    plan_generation,
};
pub use order::*;
pub use product::{SaleProduct, SaleProductId, TmsTracking};
