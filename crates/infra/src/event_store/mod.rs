//! Append-only event store boundary.
//!
//! Streams are keyed by tenant and aggregate id. Only the in-memory backend
//! exists; the trait keeps the dispatcher independent of it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
