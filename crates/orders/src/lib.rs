//! Transport orders: the scheduled window, the actual trip, and the
//! event-sourced `TmsOrder` aggregate.
//!
//! [`Schedule`] and [`Trip`] are shared with shipments, which follow the same
//! rules.

pub mod itinerary;
pub mod order;
pub mod schedule;
pub mod trip;

pub use itinerary::{Itinerary, Resources};
pub use order::*;
pub use schedule::{Schedule, ScheduleEdit};
pub use trip::{Trip, TripStage, TripStages};
