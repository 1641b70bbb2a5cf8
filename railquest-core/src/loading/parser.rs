use geo::Point;
use log::warn;

use super::raw_types::{RawStop, RawStopTime, RawTransfer};
use crate::model::{Stop, StopTimeRecord, Time, TransferRecord};

/// Records that could be parsed, and how many were skipped as malformed
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> Parsed<T> {
    fn collect<R>(raw: impl IntoIterator<Item = R>, kind: &str, parse: impl Fn(R) -> Option<T>) -> Self {
        let mut records = Vec::new();
        let mut skipped = 0;
        for record in raw {
            match parse(record) {
                Some(parsed) => records.push(parsed),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Skipped {skipped} malformed {kind} records");
        }
        Self { records, skipped }
    }
}

/// Parse a `H:MM:SS` / `HH:MM:SS` time (hours may exceed 23) into seconds since midnight.
///
/// Seconds are optional. Returns `None` for anything else.
pub fn parse_time(time_str: &str) -> Option<Time> {
    let mut parts = time_str.trim().split(':');
    let hours: Time = parts.next()?.parse().ok()?;
    let minutes: Time = parts.next()?.parse().ok()?;
    let seconds: Time = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

/// Format seconds since midnight as `HH:MM:SS`
pub fn format_time(time: Time) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        time / 3600,
        (time % 3600) / 60,
        time % 60
    )
}

/// Convert raw stop times, skipping records whose times or sequence cannot be parsed.
///
/// A record with only one of arrival/departure uses it for both.
pub fn parse_stop_times(raw: impl IntoIterator<Item = RawStopTime>) -> Parsed<StopTimeRecord> {
    Parsed::collect(raw, "stop time", |st| {
        if st.trip_id.is_empty() || st.stop_id.is_empty() {
            return None;
        }
        let arrival = non_empty(&st.arrival_time).map(parse_time);
        let departure = non_empty(&st.departure_time).map(parse_time);
        let (arrival_time, departure_time) = match (arrival, departure) {
            (Some(Some(a)), Some(Some(d))) => (a, d),
            (Some(Some(a)), None) => (a, a),
            (None, Some(Some(d))) => (d, d),
            _ => return None,
        };
        let stop_sequence = st.stop_sequence.trim().parse().ok()?;
        Some(StopTimeRecord {
            trip_id: st.trip_id,
            stop_id: st.stop_id,
            arrival_time,
            departure_time,
            stop_sequence,
        })
    })
}

/// Convert raw transfers. An empty minimum transfer time is kept as `None`.
pub fn parse_transfers(raw: impl IntoIterator<Item = RawTransfer>) -> Parsed<TransferRecord> {
    Parsed::collect(raw, "transfer", |tr| {
        if tr.from_stop_id.is_empty() || tr.to_stop_id.is_empty() {
            return None;
        }
        let min_transfer_time = match non_empty(&tr.min_transfer_time) {
            Some(value) => Some(value.parse().ok()?),
            None => None,
        };
        Some(TransferRecord {
            from_stop_id: tr.from_stop_id,
            to_stop_id: tr.to_stop_id,
            min_transfer_time,
        })
    })
}

pub fn parse_stops(raw: impl IntoIterator<Item = RawStop>) -> Parsed<Stop> {
    Parsed::collect(raw, "stop", |stop| {
        let lat: f64 = stop.stop_lat.trim().parse().ok()?;
        let lon: f64 = stop.stop_lon.trim().parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Stop {
            stop_id: stop.stop_id,
            geometry: Point::new(lon, lat),
        })
    })
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
