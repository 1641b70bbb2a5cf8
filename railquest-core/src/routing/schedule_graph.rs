use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, warn};

use crate::model::{StopTimeRecord, Time, TransferRecord};

pub type StopIdx = usize;
pub type TripIdx = usize;

/// Scheduled ride from one stop to the next stop of the same trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub departure_time: Time,
    pub to_stop: StopIdx,
    pub arrival_time: Time,
    pub trip: TripIdx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub to_stop: StopIdx,
    pub duration: Time,
}

/// Adjacency lists of the schedule window a query runs over.
///
/// Stop and trip identifiers are interned in order of first appearance, so
/// the same input always yields the same indices. Departures are not sorted
/// by time; the pathfinder filters them when it expands a stop.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGraphIndex {
    stop_ids: Vec<String>,
    stop_lookup: HashMap<String, StopIdx>,
    trip_ids: Vec<String>,
    departures: Vec<Vec<Departure>>,
    transfers: Vec<Vec<Transfer>>,
}

impl ScheduleGraphIndex {
    /// Builds the index from stop-times in any order.
    ///
    /// Stop-times are grouped by trip and ordered by `stop_sequence`; each
    /// consecutive pair becomes a [`Departure`]. Pairs arriving before they
    /// depart are dropped.
    pub fn new(stop_times: &[StopTimeRecord], transfers: &[TransferRecord]) -> Self {
        let mut index = Self::default();

        let mut trip_lookup: HashMap<&str, TripIdx> = HashMap::new();
        let mut trips: Vec<Vec<&StopTimeRecord>> = Vec::new();
        for record in stop_times {
            let trip = *trip_lookup.entry(record.trip_id.as_str()).or_insert_with(|| {
                index.trip_ids.push(record.trip_id.clone());
                trips.push(Vec::new());
                trips.len() - 1
            });
            trips[trip].push(record);
            index.intern(&record.stop_id);
        }

        let mut inconsistent = 0;
        for (trip, mut records) in trips.into_iter().enumerate() {
            records.sort_by_key(|r| r.stop_sequence);
            for (from, to) in records.into_iter().tuple_windows() {
                if to.arrival_time < from.departure_time {
                    inconsistent += 1;
                    continue;
                }
                let from_stop = index.intern(&from.stop_id);
                let to_stop = index.intern(&to.stop_id);
                index.departures[from_stop].push(Departure {
                    departure_time: from.departure_time,
                    to_stop,
                    arrival_time: to.arrival_time,
                    trip,
                });
            }
        }
        if inconsistent > 0 {
            warn!("Dropped {inconsistent} stop-time pairs arriving before their departure");
        }

        for transfer in transfers {
            let from_stop = index.intern(&transfer.from_stop_id);
            let to_stop = index.intern(&transfer.to_stop_id);
            index.transfers[from_stop].push(Transfer {
                to_stop,
                duration: transfer.duration(),
            });
        }

        debug!(
            "Schedule index: {} stops, {} trips, {} departures, {} transfers",
            index.stop_ids.len(),
            index.trip_ids.len(),
            index.departures.iter().map(Vec::len).sum::<usize>(),
            transfers.len()
        );
        index
    }

    fn intern(&mut self, stop_id: &str) -> StopIdx {
        if let Some(&idx) = self.stop_lookup.get(stop_id) {
            return idx;
        }
        let idx = self.stop_ids.len();
        self.stop_ids.push(stop_id.to_string());
        self.stop_lookup.insert(stop_id.to_string(), idx);
        self.departures.push(Vec::new());
        self.transfers.push(Vec::new());
        idx
    }

    pub fn stop_index(&self, stop_id: &str) -> Option<StopIdx> {
        self.stop_lookup.get(stop_id).copied()
    }

    pub fn stop_id(&self, stop: StopIdx) -> &str {
        &self.stop_ids[stop]
    }

    pub fn trip_id(&self, trip: TripIdx) -> &str {
        &self.trip_ids[trip]
    }

    pub fn departures_from(&self, stop: StopIdx) -> &[Departure] {
        &self.departures[stop]
    }

    pub fn transfers_from(&self, stop: StopIdx) -> &[Transfer] {
        &self.transfers[stop]
    }

    pub fn num_stops(&self) -> usize {
        self.stop_ids.len()
    }

    pub fn num_trips(&self) -> usize {
        self.trip_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(trip: &str, stop: &str, arr: Time, dep: Time, seq: u32) -> StopTimeRecord {
        StopTimeRecord {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            arrival_time: arr,
            departure_time: dep,
            stop_sequence: seq,
        }
    }

    #[test]
    fn consecutive_stops_become_departures_regardless_of_input_order() {
        let index = ScheduleGraphIndex::new(
            &[
                st("t1", "C", 29_400, 29_400, 3),
                st("t1", "A", 28_800, 28_800, 1),
                st("t1", "B", 29_100, 29_160, 2),
            ],
            &[],
        );
        assert_eq!(index.num_stops(), 3);
        assert_eq!(index.num_trips(), 1);

        let a = index.stop_index("A").unwrap();
        let b = index.stop_index("B").unwrap();
        let c = index.stop_index("C").unwrap();
        assert_eq!(
            index.departures_from(a),
            &[Departure {
                departure_time: 28_800,
                to_stop: b,
                arrival_time: 29_100,
                trip: 0,
            }]
        );
        assert_eq!(index.departures_from(b)[0].to_stop, c);
        assert_eq!(index.departures_from(b)[0].departure_time, 29_160);
        assert!(index.departures_from(c).is_empty());
        assert_eq!(index.trip_id(0), "t1");
    }

    #[test]
    fn transfers_default_to_zero_duration() {
        let index = ScheduleGraphIndex::new(
            &[],
            &[
                TransferRecord {
                    from_stop_id: "A".into(),
                    to_stop_id: "B".into(),
                    min_transfer_time: None,
                },
                TransferRecord {
                    from_stop_id: "A".into(),
                    to_stop_id: "C".into(),
                    min_transfer_time: Some(180),
                },
            ],
        );
        let a = index.stop_index("A").unwrap();
        let durations: Vec<_> = index.transfers_from(a).iter().map(|t| t.duration).collect();
        assert_eq!(durations, vec![0, 180]);
        assert_eq!(index.stop_id(index.transfers_from(a)[1].to_stop), "C");
    }

    #[test]
    fn arrival_before_departure_is_dropped() {
        let index = ScheduleGraphIndex::new(
            &[st("t1", "A", 30_000, 30_000, 1), st("t1", "B", 29_000, 29_000, 2)],
            &[],
        );
        let a = index.stop_index("A").unwrap();
        assert!(index.departures_from(a).is_empty());
    }

    #[test]
    fn empty_input_is_valid() {
        let index = ScheduleGraphIndex::new(&[], &[]);
        assert!(index.is_empty());
        assert_eq!(index.stop_index("A"), None);
    }
}
