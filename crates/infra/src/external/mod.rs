//! Collaborators the TMS core calls out to: geocoding, document numbering
//! and the record activity log. Each has an in-memory implementation.

pub mod activity;
pub mod geocoder;
pub mod sequence;

pub use activity::{ActivityLog, InMemoryActivityLog, Message, RecordRef};
pub use geocoder::{GeocodeError, Geocoder, StaticGeocoder};
pub use sequence::{InMemorySequence, SequenceError, SequenceGenerator};
