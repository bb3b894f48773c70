//! Actual execution window of an order or shipment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{DomainError, DomainResult, add_hours, hours_between, round_hours};
use tms_stages::StageId;

/// Actual trip data. `diff_duration` is scheduled minus actual hours, set
/// when the trip ends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Trip {
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub duration: f64,
    pub diff_duration: f64,
    pub start_trip: bool,
    pub end_trip: bool,
}

/// Stage a trip operation moves its record to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStage {
    Transit,
    Closed,
}

/// Resolved transit and closed stages for the record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripStages {
    pub transit: StageId,
    pub closed: StageId,
}

impl TripStages {
    pub fn resolve(&self, stage: TripStage) -> StageId {
        match stage {
            TripStage::Transit => self.transit,
            TripStage::Closed => self.closed,
        }
    }
}

impl Trip {
    /// Started and not yet ended.
    pub fn in_progress(&self) -> bool {
        self.start_trip && !self.end_trip
    }

    fn measured(&self) -> f64 {
        match (self.date_start, self.date_end) {
            (Some(start), Some(end)) => hours_between(start, end),
            _ => 0.0,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> TripStage {
        if self.date_start.is_none() {
            self.date_start = Some(now);
        }
        self.start_trip = true;
        TripStage::Transit
    }

    pub fn end(&mut self, now: DateTime<Utc>, scheduled_hours: f64) -> TripStage {
        self.date_end = Some(now);
        self.close(scheduled_hours)
    }

    fn close(&mut self, scheduled_hours: f64) -> TripStage {
        self.duration = self.measured();
        self.diff_duration = round_hours(scheduled_hours - self.duration);
        self.start_trip = false;
        self.end_trip = true;
        TripStage::Closed
    }

    /// Move the end to `now` and re-measure, leaving flags untouched.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.date_end = Some(now);
        self.duration = self.measured();
    }

    /// User edit of the actual end.
    ///
    /// Removing the end is a correction: a trip with a start that is not
    /// running resumes in transit, anything else just loses its ended flag.
    pub fn edit_end(
        &mut self,
        end: Option<DateTime<Utc>>,
        scheduled_hours: f64,
    ) -> DomainResult<Option<TripStage>> {
        let Some(end) = end else {
            self.date_end = None;
            self.end_trip = false;
            self.duration = 0.0;
            self.diff_duration = 0.0;
            if let Some(start) = self.date_start {
                if !self.start_trip {
                    return Ok(Some(self.start(start)));
                }
            }
            return Ok(None);
        };

        match self.date_start {
            Some(start) if end < start => Err(DomainError::validation("actual end precedes actual start")),
            Some(_) => {
                self.date_end = Some(end);
                if self.end_trip {
                    self.duration = self.measured();
                    self.diff_duration = round_hours(scheduled_hours - self.duration);
                    Ok(None)
                } else {
                    Ok(Some(self.close(scheduled_hours)))
                }
            }
            None => {
                self.date_start = Some(end);
                self.date_end = Some(end);
                Ok(Some(self.close(scheduled_hours)))
            }
        }
    }

    /// User edit of the actual start. Clearing it resets the trip.
    pub fn edit_start(
        &mut self,
        start: Option<DateTime<Utc>>,
        scheduled_hours: f64,
    ) -> DomainResult<Option<TripStage>> {
        let Some(start) = start else {
            *self = Trip::default();
            return Ok(None);
        };

        match self.date_end {
            Some(end) if end < start => Err(DomainError::validation("actual start follows actual end")),
            Some(end) => {
                self.date_start = Some(start);
                self.edit_end(Some(end), scheduled_hours)
            }
            None => {
                self.date_start = Some(start);
                if self.start_trip {
                    Ok(None)
                } else {
                    Ok(Some(self.start(start)))
                }
            }
        }
    }

    /// User edit of the actual duration. With both dates set the end follows.
    pub fn edit_duration(&mut self, hours: f64, scheduled_hours: f64) -> DomainResult<()> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(DomainError::validation(format!(
                "actual duration must be greater than or equal to zero, got {hours}"
            )));
        }
        self.duration = hours;
        if let (Some(start), Some(_)) = (self.date_start, self.date_end) {
            self.date_end = Some(add_hours(start, hours));
            if self.end_trip {
                self.diff_duration = round_hours(scheduled_hours - hours);
            }
        }
        Ok(())
    }
}
