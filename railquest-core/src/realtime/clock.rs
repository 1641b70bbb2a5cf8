use chrono::{FixedOffset, NaiveDate, TimeZone};

use crate::model::{StopTimeEvent, Time};

/// Local service day against which real-time timestamps are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDay {
    date: NaiveDate,
    offset: FixedOffset,
}

impl ServiceDay {
    pub fn new(date: NaiveDate, offset: FixedOffset) -> Self {
        Self { date, offset }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Unix timestamp of local midnight starting the service day
    pub fn midnight(&self) -> Option<i64> {
        let naive = self.date.and_hms_opt(0, 0, 0)?;
        let local = self.offset.from_local_datetime(&naive).single()?;
        Some(local.timestamp())
    }

    /// Seconds since service midnight, `None` before midnight or out of range
    pub fn service_time(&self, unix: i64) -> Option<Time> {
        Time::try_from(unix - self.midnight()?).ok()
    }

    pub fn unix_time(&self, time: Time) -> Option<i64> {
        Some(self.midnight()? + i64::from(time))
    }

    /// Event from a decoded feed, where times are Unix timestamps.
    ///
    /// A timestamp outside the service day is dropped, keeping the delay.
    pub fn event(&self, unix_time: Option<i64>, delay: Option<i32>) -> StopTimeEvent {
        StopTimeEvent {
            time: unix_time.and_then(|t| self.service_time(t)),
            delay,
        }
    }
}
