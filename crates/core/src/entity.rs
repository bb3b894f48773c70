//! Entity trait for master data that is stored by identity but not
//! event-sourced (stages, vehicles, teams, crews, routes, tags).

pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
