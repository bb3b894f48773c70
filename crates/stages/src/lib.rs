//! Configurable workflow stages.
//!
//! Orders and shipments move through `Order` stages; drivers carry a `Driver`
//! stage reflecting whether they are on a trip. Stage semantics come from the
//! `is_default`, `is_transit` and `is_closed` flags, never from names.

pub mod registry;
pub mod stage;

pub use registry::{StageProvider, StageRegistry};
pub use stage::{Stage, StageId, StageQuery, StageType};
