use std::hash::BuildHasher;

use crate::model::{StopTimeRecord, Time};

/// Slack around a trip's scheduled start and end within which it counts as active
pub const DEFAULT_ACTIVITY_SLACK: Time = 600;

/// Answers whether a trip runs on the current service day
pub trait ServiceCalendar {
    fn runs_today(&self, trip_id: &str) -> bool;
}

impl<S: BuildHasher> ServiceCalendar for std::collections::HashSet<String, S> {
    fn runs_today(&self, trip_id: &str) -> bool {
        self.contains(trip_id)
    }
}

impl<S: BuildHasher> ServiceCalendar for hashbrown::HashSet<String, S> {
    fn runs_today(&self, trip_id: &str) -> bool {
        self.contains(trip_id)
    }
}

impl<F: Fn(&str) -> bool> ServiceCalendar for F {
    fn runs_today(&self, trip_id: &str) -> bool {
        self(trip_id)
    }
}

/// Scheduled first and last time of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripBounds {
    pub start: Time,
    pub end: Time,
}

impl TripBounds {
    /// Bounds over all scheduled arrival and departure times, `None` for an empty trip
    pub fn of(stop_times: &[StopTimeRecord]) -> Option<Self> {
        let start = stop_times
            .iter()
            .map(|st| st.arrival_time.min(st.departure_time))
            .min()?;
        let end = stop_times
            .iter()
            .map(|st| st.arrival_time.max(st.departure_time))
            .max()?;
        Some(Self { start, end })
    }

    /// Whether `now` falls within `[start - slack, end + slack]`
    pub fn is_active(&self, now: Time, slack: Time) -> bool {
        self.start.saturating_sub(slack) <= now && now <= self.end.saturating_add(slack)
    }
}
