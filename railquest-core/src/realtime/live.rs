use hashbrown::HashMap;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use super::activity::{ServiceCalendar, TripBounds};
use super::merge::merge;
use crate::model::{RealtimeUpdate, ScheduledTrip, StopTimeRecord, Time};

/// A trip currently in service with its live stop-times
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveTrip {
    pub trip_id: String,
    pub stop_times: Vec<StopTimeRecord>,
    /// Whether a real-time update was applied
    pub realtime: bool,
}

fn index_updates(updates: &[RealtimeUpdate]) -> HashMap<&str, &RealtimeUpdate> {
    updates
        .iter()
        .map(|update| (update.trip_id.as_str(), update))
        .collect()
}

fn live_trip(trip: &ScheduledTrip, updates_by_trip: &HashMap<&str, &RealtimeUpdate>) -> LiveTrip {
    match updates_by_trip.get(trip.trip_id.as_str()) {
        Some(update) => LiveTrip {
            trip_id: trip.trip_id.clone(),
            stop_times: merge(&trip.stop_times, update),
            realtime: true,
        },
        None => LiveTrip {
            trip_id: trip.trip_id.clone(),
            stop_times: trip.stop_times.clone(),
            realtime: false,
        },
    }
}

/// Trips that run today and are active at `now`, adjusted by their updates.
///
/// Activity is judged on the scheduled bounds, before any delay is applied.
/// Trips are merged in parallel; output order follows `trips`.
pub fn merge_active_trips<C>(
    trips: &[ScheduledTrip],
    updates: &[RealtimeUpdate],
    calendar: &C,
    now: Time,
    slack: Time,
) -> Vec<LiveTrip>
where
    C: ServiceCalendar + Sync + ?Sized,
{
    let updates_by_trip = index_updates(updates);
    let live: Vec<LiveTrip> = trips
        .par_iter()
        .filter(|trip| calendar.runs_today(&trip.trip_id))
        .filter(|trip| {
            TripBounds::of(&trip.stop_times).is_some_and(|bounds| bounds.is_active(now, slack))
        })
        .map(|trip| live_trip(trip, &updates_by_trip))
        .collect();

    debug!(
        "{} of {} trips active at {}, {} with real-time data",
        live.len(),
        trips.len(),
        now,
        live.iter().filter(|t| t.realtime).count()
    );
    live
}

/// Every trip that runs today, adjusted by its update, whatever the time of day.
///
/// This is the input of live routing, where the schedule window rather
/// than the activity test decides which trips can be boarded.
pub fn merge_running_trips<C>(
    trips: &[ScheduledTrip],
    updates: &[RealtimeUpdate],
    calendar: &C,
) -> Vec<LiveTrip>
where
    C: ServiceCalendar + Sync + ?Sized,
{
    let updates_by_trip = index_updates(updates);
    trips
        .par_iter()
        .filter(|trip| calendar.runs_today(&trip.trip_id))
        .map(|trip| live_trip(trip, &updates_by_trip))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StopTimeEvent, StopTimeUpdate};
    use crate::realtime::DEFAULT_ACTIVITY_SLACK;

    fn trip(trip_id: &str, start: Time) -> ScheduledTrip {
        ScheduledTrip {
            trip_id: trip_id.to_string(),
            stop_times: ["A", "B"]
                .iter()
                .enumerate()
                .map(|(i, stop)| StopTimeRecord {
                    trip_id: trip_id.to_string(),
                    stop_id: stop.to_string(),
                    arrival_time: start + 600 * i as Time,
                    departure_time: start + 600 * i as Time,
                    stop_sequence: i as u32 + 1,
                })
                .collect(),
        }
    }

    #[test]
    fn filters_by_calendar_and_window_then_merges() {
        let trips = vec![
            trip("running", 28_800),
            trip("not-today", 28_800),
            trip("later", 40_000),
            trip("no-update", 28_500),
        ];
        let updates = vec![RealtimeUpdate {
            trip_id: "running".to_string(),
            stop_time_updates: vec![StopTimeUpdate {
                stop_id: Some("B".to_string()),
                arrival: Some(StopTimeEvent::delayed(300)),
                ..StopTimeUpdate::default()
            }],
        }];
        let calendar = |trip_id: &str| trip_id != "not-today";

        let live = merge_active_trips(&trips, &updates, &calendar, 29_000, DEFAULT_ACTIVITY_SLACK);
        let ids: Vec<_> = live.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(ids, vec!["running", "no-update"]);
        assert!(live[0].realtime);
        assert_eq!(live[0].stop_times[1].arrival_time, 29_700);
        assert!(!live[1].realtime);
        assert_eq!(live[1].stop_times, trips[3].stop_times);
    }

    #[test]
    fn running_trips_ignore_time_of_day() {
        let trips = vec![trip("early", 20_000), trip("not-today", 28_800), trip("later", 40_000)];
        let updates = vec![RealtimeUpdate {
            trip_id: "later".to_string(),
            stop_time_updates: vec![StopTimeUpdate {
                stop_sequence: Some(1),
                departure: Some(StopTimeEvent::delayed(120)),
                ..StopTimeUpdate::default()
            }],
        }];
        let calendar = |trip_id: &str| trip_id != "not-today";

        let running = merge_running_trips(&trips, &updates, &calendar);
        let ids: Vec<_> = running.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "later"]);
        assert!(running[1].realtime);
        assert_eq!(running[1].stop_times[0].departure_time, 40_120);
    }

    #[test]
    fn activity_uses_schedule_not_delay() {
        // Scheduled to end at 29400, delayed by an hour: inactive at 31000 regardless
        let trips = vec![trip("late", 28_800)];
        let updates = vec![RealtimeUpdate {
            trip_id: "late".to_string(),
            stop_time_updates: vec![StopTimeUpdate {
                stop_sequence: Some(2),
                arrival: Some(StopTimeEvent::delayed(3_600)),
                ..StopTimeUpdate::default()
            }],
        }];
        let everything = |_: &str| true;
        assert!(merge_active_trips(&trips, &updates, &everything, 31_000, 600).is_empty());
    }
}
