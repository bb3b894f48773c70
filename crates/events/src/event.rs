use chrono::{DateTime, Utc};

/// A fact recorded by an aggregate.
///
/// Event type names follow `<module>.<record>.<what>`, e.g.
/// `tms.order.trip_started`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Business time of the fact.
    fn occurred_at(&self) -> DateTime<Utc>;
}
