//! Value object marker.
//!
//! Schedules, trips, itineraries and coordinates are compared by value and
//! replaced wholesale when they change; they never carry an identity.

pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
