//! Scheduled window of an order or shipment.
//!
//! `start`, `duration_hours` and `end` are kept consistent: whenever two of
//! them are known, the third follows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{DomainError, DomainResult, add_hours, hours_between};

use crate::itinerary::Itinerary;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub start: Option<DateTime<Utc>>,
    pub duration_hours: f64,
    pub end: Option<DateTime<Utc>>,
}

/// A single user edit of the scheduled window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScheduleEdit {
    Start(Option<DateTime<Utc>>),
    Duration(f64),
    End(Option<DateTime<Utc>>),
}

impl Schedule {
    pub fn starting_at(start: DateTime<Utc>, duration_hours: f64) -> Self {
        Self {
            start: Some(start),
            duration_hours,
            end: Some(add_hours(start, duration_hours)),
        }
    }

    /// Apply `edit` and derive the dependent field.
    pub fn apply(&self, edit: ScheduleEdit) -> DomainResult<Schedule> {
        let mut next = *self;
        match edit {
            ScheduleEdit::Duration(hours) => {
                ensure_non_negative(hours)?;
                next.duration_hours = hours;
                if let Some(start) = next.start {
                    next.end = Some(add_hours(start, hours));
                }
            }
            ScheduleEdit::End(end) => {
                next.end = end;
                if let (Some(start), Some(end)) = (next.start, end) {
                    if end < start {
                        return Err(DomainError::validation("scheduled end precedes scheduled start"));
                    }
                    next.duration_hours = hours_between(start, end);
                }
            }
            ScheduleEdit::Start(start) => {
                next.start = start;
                if let Some(start) = start {
                    if next.end.is_some() || next.duration_hours > 0.0 {
                        next.end = Some(add_hours(start, next.duration_hours));
                    }
                }
            }
        }
        Ok(next)
    }

    /// Schedule after switching from `previous` to `next`. A routed itinerary
    /// takes the route estimate as duration; dropping the route flag zeroes it.
    pub fn follow_itinerary(
        &self,
        previous: &Itinerary,
        next: &Itinerary,
        route_hours: Option<f64>,
    ) -> DomainResult<Schedule> {
        match (next.use_route, route_hours) {
            (true, Some(hours)) if next.route_id.is_some() => self.apply(ScheduleEdit::Duration(hours)),
            (false, _) if previous.use_route => self.apply(ScheduleEdit::Duration(0.0)),
            _ => Ok(*self),
        }
    }

    /// Re-derive the duration from start and end when both are set.
    pub fn normalize(&self) -> Schedule {
        let mut next = *self;
        if let (Some(start), Some(end)) = (self.start, self.end) {
            next.duration_hours = hours_between(start, end).max(0.0);
        }
        next
    }

    pub fn validate(&self) -> DomainResult<()> {
        ensure_non_negative(self.duration_hours)?;
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(DomainError::validation("scheduled end precedes scheduled start"));
            }
        }
        Ok(())
    }
}

fn ensure_non_negative(hours: f64) -> DomainResult<()> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(DomainError::validation(format!(
            "scheduled duration must be greater than or equal to zero, got {hours}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn duration_moves_end() {
        let schedule = Schedule { start: Some(t0()), ..Schedule::default() };
        let next = schedule.apply(ScheduleEdit::Duration(2.5)).unwrap();
        assert_eq!(next.end, Some(t0() + Duration::minutes(150)));
    }

    #[test]
    fn duration_without_start_leaves_end_alone() {
        let next = Schedule::default().apply(ScheduleEdit::Duration(3.0)).unwrap();
        assert_eq!(next.duration_hours, 3.0);
        assert_eq!(next.end, None);
    }

    #[test]
    fn end_derives_duration() {
        let schedule = Schedule { start: Some(t0()), ..Schedule::default() };
        let next = schedule.apply(ScheduleEdit::End(Some(t0() + Duration::hours(6)))).unwrap();
        assert_eq!(next.duration_hours, 6.0);
    }

    #[test]
    fn start_shifts_existing_end() {
        let schedule = Schedule::starting_at(t0(), 4.0);
        let later = t0() + Duration::hours(24);
        let next = schedule.apply(ScheduleEdit::Start(Some(later))).unwrap();
        assert_eq!(next.end, Some(later + Duration::hours(4)));
    }

    #[test]
    fn start_without_duration_or_end_sets_only_start() {
        let next = Schedule::default().apply(ScheduleEdit::Start(Some(t0()))).unwrap();
        assert_eq!(next.start, Some(t0()));
        assert_eq!(next.end, None);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err = Schedule::default().apply(ScheduleEdit::Duration(-1.0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let schedule = Schedule { start: Some(t0()), ..Schedule::default() };
        let err = schedule
            .apply(ScheduleEdit::End(Some(t0() - Duration::hours(1))))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn normalize_rederives_duration() {
        let schedule = Schedule {
            start: Some(t0()),
            duration_hours: 99.0,
            end: Some(t0() + Duration::hours(3)),
        };
        assert_eq!(schedule.normalize().duration_hours, 3.0);
    }

    proptest! {
        #[test]
        fn end_tracks_start_plus_duration(
            start_offset in 0i64..1_000_000i64,
            quarter_hours in 0u32..2_000u32,
            shift in -500_000i64..500_000i64,
        ) {
            let start = t0() + Duration::seconds(start_offset);
            let hours = f64::from(quarter_hours) / 4.0;
            let schedule = Schedule { start: Some(start), ..Schedule::default() };

            let with_duration = schedule.apply(ScheduleEdit::Duration(hours)).unwrap();
            prop_assert_eq!(with_duration.end, Some(add_hours(start, hours)));

            let moved = start + Duration::seconds(shift);
            let with_start = with_duration.apply(ScheduleEdit::Start(Some(moved))).unwrap();
            prop_assert_eq!(with_start.end, Some(add_hours(moved, hours)));
        }
    }
}
