//! `tms-core`: shared building blocks for the transport management domain.
//!
//! Pure domain primitives only: identifiers, the error model, aggregate and
//! entity contracts, and the hour arithmetic every schedule relies on.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod hours;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use hours::{add_hours, hours_between, round_hours};
pub use id::{AggregateId, TenantId, UserId};
pub use value_object::ValueObject;
