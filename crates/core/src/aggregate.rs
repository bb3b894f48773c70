//! Aggregate contracts for the event-sourced TMS records (orders, shipments,
//! partners, sale orders).

use crate::error::{DomainError, DomainResult};

/// Identity and version of an aggregate root.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far. Used as the stream revision for
    /// optimistic concurrency.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an append.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    Any,
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale record version (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Decide/evolve split for an aggregate.
///
/// `handle` inspects the current state and a command and returns the events
/// that describe the outcome; it never mutates. `apply` folds one event into
/// state. Anything the decision needs from outside the aggregate (stages,
/// timestamps, route estimates) travels inside the command.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
