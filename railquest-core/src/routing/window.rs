use hashbrown::HashSet;

use crate::model::{StopTimeRecord, Time};

/// Default length of the schedule window searched after the departure time
pub const DEFAULT_WINDOW: Time = 7200;

/// Stop-times of every trip departing somewhere within
/// `[departure_time, departure_time + window_secs]`.
///
/// Whole trips are kept, including stops served after the window closes,
/// so a trip boarded inside the window can be ridden to its end.
pub fn window_stop_times(
    records: &[StopTimeRecord],
    departure_time: Time,
    window_secs: Time,
) -> Vec<StopTimeRecord> {
    let window_end = departure_time.saturating_add(window_secs);
    let in_window: HashSet<&str> = records
        .iter()
        .filter(|r| (departure_time..=window_end).contains(&r.departure_time))
        .map(|r| r.trip_id.as_str())
        .collect();

    records
        .iter()
        .filter(|r| in_window.contains(r.trip_id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(trip: &str, stop: &str, time: Time, seq: u32) -> StopTimeRecord {
        StopTimeRecord {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            arrival_time: time,
            departure_time: time,
            stop_sequence: seq,
        }
    }

    #[test]
    fn keeps_whole_trips_touching_the_window() {
        let records = vec![
            st("before", "A", 20_000, 1),
            st("before", "B", 21_000, 2),
            st("inside", "A", 29_000, 1),
            st("inside", "B", 40_000, 2),
            st("earlier-start", "X", 27_000, 1),
            st("earlier-start", "A", 28_900, 2),
            st("after", "A", 40_000, 1),
        ];
        let windowed = window_stop_times(&records, 28_800, DEFAULT_WINDOW);
        let trips: Vec<_> = windowed.iter().map(|r| r.trip_id.as_str()).collect();
        assert_eq!(trips, vec!["inside", "inside", "earlier-start", "earlier-start"]);
    }
}
