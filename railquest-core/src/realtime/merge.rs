use hashbrown::HashMap;
use log::debug;

use crate::model::{RealtimeUpdate, StopTimeEvent, StopTimeRecord, StopTimeUpdate, Time};

/// How stop-time updates of one trip update are matched to scheduled stop-times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
    ByStopId,
    BySequence,
}

impl MatchKey {
    /// Stop ids are preferred as soon as any stop-time update carries one.
    /// `None` if no update can be matched at all.
    pub fn resolve(update: &RealtimeUpdate) -> Option<Self> {
        let updates = &update.stop_time_updates;
        if updates.iter().any(|u| u.stop_id.is_some()) {
            Some(MatchKey::ByStopId)
        } else if updates.iter().any(|u| u.stop_sequence.is_some()) {
            Some(MatchKey::BySequence)
        } else {
            None
        }
    }
}

enum UpdateLookup<'a> {
    ByStopId {
        by_stop: HashMap<&'a str, Vec<&'a StopTimeUpdate>>,
        /// Updates in the same feed message that only carry a sequence
        sequence_only: HashMap<u32, &'a StopTimeUpdate>,
    },
    BySequence(HashMap<u32, &'a StopTimeUpdate>),
}

impl<'a> UpdateLookup<'a> {
    fn new(key: MatchKey, updates: &'a [StopTimeUpdate]) -> Self {
        match key {
            MatchKey::ByStopId => {
                let mut by_stop: HashMap<&str, Vec<&StopTimeUpdate>> = HashMap::new();
                let mut sequence_only = HashMap::new();
                for update in updates {
                    match (update.stop_id.as_deref(), update.stop_sequence) {
                        (Some(stop_id), _) => by_stop.entry(stop_id).or_default().push(update),
                        (None, Some(seq)) => {
                            sequence_only.insert(seq, update);
                        }
                        (None, None) => {}
                    }
                }
                UpdateLookup::ByStopId {
                    by_stop,
                    sequence_only,
                }
            }
            MatchKey::BySequence => UpdateLookup::BySequence(
                updates
                    .iter()
                    .filter_map(|u| u.stop_sequence.map(|seq| (seq, u)))
                    .collect(),
            ),
        }
    }

    /// Update for `record`. A stop the trip serves more than once only
    /// matches an update with the same sequence or without one.
    fn find(&self, record: &StopTimeRecord, served_once: bool) -> Option<&'a StopTimeUpdate> {
        match self {
            UpdateLookup::ByStopId {
                by_stop,
                sequence_only,
            } => {
                let by_id = by_stop.get(record.stop_id.as_str()).and_then(|candidates| {
                    let exact = candidates
                        .iter()
                        .find(|u| u.stop_sequence == Some(record.stop_sequence));
                    let fallback = if served_once {
                        candidates.first()
                    } else {
                        candidates.iter().find(|u| u.stop_sequence.is_none())
                    };
                    exact.or(fallback).copied()
                });
                by_id.or_else(|| sequence_only.get(&record.stop_sequence).copied())
            }
            UpdateLookup::BySequence(by_sequence) => by_sequence.get(&record.stop_sequence).copied(),
        }
    }
}

fn shift(time: Time, delay: i64) -> Time {
    (i64::from(time) + delay).clamp(0, i64::from(Time::MAX)) as Time
}

/// Time after applying `event`, and the delay it implies
fn apply(scheduled: Time, event: Option<&StopTimeEvent>) -> Option<(Time, i64)> {
    let event = event.filter(|e| !e.is_empty())?;
    match (event.time, event.delay) {
        (Some(time), _) => Some((time, i64::from(time) - i64::from(scheduled))),
        (None, Some(delay)) => Some((shift(scheduled, i64::from(delay)), i64::from(delay))),
        (None, None) => None,
    }
}

fn adjust(record: &StopTimeRecord, update: &StopTimeUpdate) -> StopTimeRecord {
    let arrival = apply(record.arrival_time, update.arrival.as_ref());
    let departure = apply(record.departure_time, update.departure.as_ref());

    // An event missing on one side inherits the delay of the other
    let (arrival_time, departure_time) = match (arrival, departure) {
        (Some((arr, _)), Some((dep, _))) => (arr, dep),
        (Some((arr, delay)), None) => (arr, shift(record.departure_time, delay)),
        (None, Some((dep, delay))) => (shift(record.arrival_time, delay), dep),
        (None, None) => (record.arrival_time, record.departure_time),
    };

    StopTimeRecord {
        arrival_time,
        departure_time: departure_time.max(arrival_time),
        ..record.clone()
    }
}

/// Scheduled stop-times of one trip adjusted by its real-time update.
///
/// An absolute time replaces the scheduled one, a delay is added to it, and
/// stop-times without a matching update pass through unchanged. Records of
/// other trips are returned as they are. Output order follows the input.
pub fn merge(static_stop_times: &[StopTimeRecord], update: &RealtimeUpdate) -> Vec<StopTimeRecord> {
    let Some(key) = MatchKey::resolve(update) else {
        debug!("Update for trip {} has no matchable stop-time updates", update.trip_id);
        return static_stop_times.to_vec();
    };
    let lookup = UpdateLookup::new(key, &update.stop_time_updates);

    let mut visits: HashMap<&str, usize> = HashMap::new();
    for record in static_stop_times.iter().filter(|r| r.trip_id == update.trip_id) {
        *visits.entry(record.stop_id.as_str()).or_default() += 1;
    }

    static_stop_times
        .iter()
        .map(|record| {
            if record.trip_id != update.trip_id {
                return record.clone();
            }
            let served_once = visits.get(record.stop_id.as_str()) == Some(&1);
            match lookup.find(record, served_once) {
                Some(stop_update) => adjust(record, stop_update),
                None => record.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(stop: &str, arr: Time, dep: Time, seq: u32) -> StopTimeRecord {
        StopTimeRecord {
            trip_id: "t1".to_string(),
            stop_id: stop.to_string(),
            arrival_time: arr,
            departure_time: dep,
            stop_sequence: seq,
        }
    }

    fn schedule() -> Vec<StopTimeRecord> {
        vec![
            st("A", 28_800, 28_800, 1),
            st("B", 29_400, 29_460, 2),
            st("C", 30_000, 30_000, 3),
        ]
    }

    fn at_stop(stop: &str, arrival: Option<StopTimeEvent>, departure: Option<StopTimeEvent>) -> StopTimeUpdate {
        StopTimeUpdate {
            stop_id: Some(stop.to_string()),
            stop_sequence: None,
            arrival,
            departure,
        }
    }

    fn update(stop_time_updates: Vec<StopTimeUpdate>) -> RealtimeUpdate {
        RealtimeUpdate {
            trip_id: "t1".to_string(),
            stop_time_updates,
        }
    }

    #[test]
    fn delay_at_one_stop() {
        let merged = merge(
            &schedule(),
            &update(vec![at_stop(
                "B",
                Some(StopTimeEvent::delayed(300)),
                Some(StopTimeEvent::delayed(300)),
            )]),
        );
        assert_eq!(merged[1].arrival_time, 29_700);
        assert_eq!(merged[1].departure_time, 29_760);
        assert_eq!(merged[0], schedule()[0]);
        assert_eq!(merged[2], schedule()[2]);
    }

    #[test]
    fn missing_departure_inherits_arrival_delay() {
        let merged = merge(
            &schedule(),
            &update(vec![at_stop("B", Some(StopTimeEvent::delayed(300)), None)]),
        );
        assert_eq!(merged[1].arrival_time, 29_700);
        assert_eq!(merged[1].departure_time, 29_760);

        let merged = merge(
            &schedule(),
            &update(vec![at_stop("B", None, Some(StopTimeEvent::at(29_520)))]),
        );
        assert_eq!(merged[1].arrival_time, 29_460);
        assert_eq!(merged[1].departure_time, 29_520);
    }

    #[test]
    fn absolute_time_overrides_delay() {
        let merged = merge(
            &schedule(),
            &update(vec![at_stop(
                "C",
                Some(StopTimeEvent {
                    time: Some(30_100),
                    delay: Some(900),
                }),
                None,
            )]),
        );
        assert_eq!(merged[2].arrival_time, 30_100);
        assert_eq!(merged[2].departure_time, 30_100);
    }

    #[test]
    fn merging_absolute_times_is_idempotent() {
        let rt = update(vec![
            at_stop("A", None, Some(StopTimeEvent::at(28_860))),
            at_stop("B", Some(StopTimeEvent::at(29_500)), None),
            at_stop(
                "C",
                Some(StopTimeEvent::at(30_050)),
                Some(StopTimeEvent::at(30_080)),
            ),
        ]);
        let once = merge(&schedule(), &rt);
        let twice = merge(&once, &rt);
        assert_eq!(once, twice);
        assert_eq!(once[1].departure_time, 29_560);
    }

    #[test]
    fn early_running_never_departs_before_arrival() {
        let merged = merge(
            &schedule(),
            &update(vec![at_stop(
                "B",
                Some(StopTimeEvent::delayed(120)),
                Some(StopTimeEvent::delayed(-120)),
            )]),
        );
        assert_eq!(merged[1].arrival_time, 29_520);
        assert_eq!(merged[1].departure_time, 29_520);

        let merged = merge(
            &[st("A", 30, 30, 1)],
            &update(vec![at_stop("A", Some(StopTimeEvent::delayed(-60)), None)]),
        );
        assert_eq!(merged[0].arrival_time, 0);
    }

    #[test]
    fn matches_by_sequence_when_no_stop_ids() {
        let rt = update(vec![StopTimeUpdate {
            stop_id: None,
            stop_sequence: Some(3),
            arrival: Some(StopTimeEvent::delayed(60)),
            departure: None,
        }]);
        assert_eq!(MatchKey::resolve(&rt), Some(MatchKey::BySequence));
        let merged = merge(&schedule(), &rt);
        assert_eq!(merged[2].arrival_time, 30_060);
        assert_eq!(merged[1], schedule()[1]);
    }

    #[test]
    fn repeated_stop_is_disambiguated_by_sequence() {
        let loop_trip = vec![
            st("A", 28_800, 28_800, 1),
            st("B", 29_400, 29_400, 2),
            st("A", 30_000, 30_000, 3),
        ];
        let rt = update(vec![StopTimeUpdate {
            stop_id: Some("A".to_string()),
            stop_sequence: Some(3),
            arrival: Some(StopTimeEvent::delayed(120)),
            departure: None,
        }]);
        assert_eq!(MatchKey::resolve(&rt), Some(MatchKey::ByStopId));
        let merged = merge(&loop_trip, &rt);
        assert_eq!(merged[0].arrival_time, 28_800);
        assert_eq!(merged[2].arrival_time, 30_120);
    }

    #[test]
    fn stop_served_once_matches_despite_sequence_numbering() {
        // Feed numbers sequences from zero while the schedule starts at one
        let rt = update(vec![StopTimeUpdate {
            stop_id: Some("B".to_string()),
            stop_sequence: Some(1),
            arrival: Some(StopTimeEvent::delayed(30)),
            departure: None,
        }]);
        let merged = merge(&schedule(), &rt);
        assert_eq!(merged[1].arrival_time, 29_430);
        assert_eq!(merged[0], schedule()[0]);
    }

    #[test]
    fn sequence_only_entries_apply_alongside_stop_ids() {
        let rt = update(vec![
            at_stop("A", None, Some(StopTimeEvent::delayed(60))),
            StopTimeUpdate {
                stop_sequence: Some(3),
                arrival: Some(StopTimeEvent::delayed(240)),
                ..StopTimeUpdate::default()
            },
        ]);
        assert_eq!(MatchKey::resolve(&rt), Some(MatchKey::ByStopId));
        let merged = merge(&schedule(), &rt);
        assert_eq!(merged[0].departure_time, 28_860);
        assert_eq!(merged[1], schedule()[1]);
        assert_eq!(merged[2].arrival_time, 30_240);
        assert_eq!(merged[2].departure_time, 30_240);
    }

    #[test]
    fn unmatchable_update_passes_schedule_through() {
        let rt = update(vec![StopTimeUpdate {
            arrival: Some(StopTimeEvent::delayed(60)),
            ..StopTimeUpdate::default()
        }]);
        assert_eq!(MatchKey::resolve(&rt), None);
        assert_eq!(merge(&schedule(), &rt), schedule());

        let other_trip = RealtimeUpdate {
            trip_id: "t2".to_string(),
            ..update(vec![at_stop("A", Some(StopTimeEvent::delayed(60)), None)])
        };
        assert_eq!(merge(&schedule(), &other_trip), schedule());
    }
}
