//! Decoded real-time trip updates
//!
//! These mirror the trip-update part of the real-time feed after the
//! upstream decoder has turned it into plain records. Absolute times are
//! already expressed in service-day seconds, see
//! [`ServiceDay`](crate::realtime::ServiceDay) for the conversion from Unix
//! timestamps.

use serde::{Deserialize, Serialize};

use super::schedule::Time;

/// Observed or predicted arrival/departure at one stop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTimeEvent {
    /// Absolute time, overrides the schedule when present
    pub time: Option<Time>,
    /// Deviation from the schedule in seconds, negative when early
    pub delay: Option<i32>,
}

impl StopTimeEvent {
    pub fn at(time: Time) -> Self {
        Self {
            time: Some(time),
            delay: None,
        }
    }

    pub fn delayed(delay: i32) -> Self {
        Self {
            time: None,
            delay: Some(delay),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.delay.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTimeUpdate {
    pub stop_id: Option<String>,
    pub stop_sequence: Option<u32>,
    pub arrival: Option<StopTimeEvent>,
    pub departure: Option<StopTimeEvent>,
}

/// Live deviation of a single trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeUpdate {
    pub trip_id: String,
    pub stop_time_updates: Vec<StopTimeUpdate>,
}
