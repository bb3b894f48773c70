//! Infrastructure layer: event store, command dispatch, read models,
//! configuration, external collaborators and the TMS application service.

pub mod aggregation;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod external;
pub mod read_model;
pub mod recompute;
pub mod service;

pub use command_dispatcher::{CommandDispatcher, DispatchError, Dispatched};
pub use config::TmsSettings;
pub use service::{NewOrder, NewPartner, ServiceError, ServiceResult, TmsService};
