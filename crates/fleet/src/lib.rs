//! Fleet master data: drivers and locations, vehicles, teams, crews, routes,
//! tags, and the assignment domains derived from them.

pub mod crew;
pub mod domain;
pub mod partner;
pub mod route;
pub mod tag;
pub mod team;
pub mod vehicle;

pub use crew::{Crew, CrewId};
pub use domain::AssignmentDomain;
pub use partner::*;
pub use route::{OperationType, RegionType, Route, RouteDetails, RouteId, TimeUom};
pub use tag::{Tag, TagId};
pub use team::{Team, TeamId, TeamStats, ensure_unique_name};
pub use vehicle::{Vehicle, VehicleId, VehicleType};
