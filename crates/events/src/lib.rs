//! Domain events and their distribution.
//!
//! Every event-sourced TMS record (orders, shipments, partners, sale orders)
//! emits events implementing [`Event`]. Infrastructure wraps them in an
//! [`EventEnvelope`] once they are appended and fans them out over an
//! [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
