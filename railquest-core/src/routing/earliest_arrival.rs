use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use log::trace;
use serde::Serialize;

use super::schedule_graph::{ScheduleGraphIndex, StopIdx};
use super::state::{FrontierEntry, Label, Via};
use crate::Time;

/// How a journey step was reached from the previous one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Leg {
    Trip { trip_id: String, departure_time: Time },
    Transfer { duration: Time },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyStep {
    pub stop_id: String,
    /// Arrival time, or boarding time at the origin
    pub time: Time,
    /// `None` for the origin
    pub leg: Option<Leg>,
}

/// Earliest-arrival path, origin first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Journey {
    pub steps: Vec<JourneyStep>,
}

impl Journey {
    /// `(stop_id, time)` pairs of the journey
    pub fn stop_times(&self) -> Vec<(&str, Time)> {
        self.steps
            .iter()
            .map(|step| (step.stop_id.as_str(), step.time))
            .collect()
    }

    pub fn departure_time(&self) -> Option<Time> {
        self.steps.first().map(|step| step.time)
    }

    pub fn arrival_time(&self) -> Option<Time> {
        self.steps.last().map(|step| step.time)
    }

    pub fn num_transfers(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step.leg, Some(Leg::Transfer { .. })))
            .count()
    }
}

/// Everything a search leaves behind, kept for reconstruction and inspection
struct Search {
    labels: Vec<Label>,
    /// Stops in the order they were settled
    settled_order: Vec<StopIdx>,
    /// Label that settled the destination
    found: Option<usize>,
}

fn search(index: &ScheduleGraphIndex, origin: StopIdx, destination: StopIdx, departure_time: Time) -> Search {
    let num_stops = index.num_stops();
    let mut labels = vec![Label {
        stop: origin,
        time: departure_time,
        parent: None,
        via: Via::Origin,
    }];
    let mut best = vec![Time::MAX; num_stops];
    best[origin] = departure_time;
    let mut settled = FixedBitSet::with_capacity(num_stops);
    let mut settled_order = Vec::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;
    heap.push(FrontierEntry {
        time: departure_time,
        seq,
        label: 0,
    });

    while let Some(FrontierEntry { time, label, .. }) = heap.pop() {
        let stop = labels[label].stop;
        // Extraction is in non-decreasing time, a settled stop already has a time <= this one
        if settled.contains(stop) {
            continue;
        }
        settled.insert(stop);
        settled_order.push(stop);
        trace!("Settled stop {} at {}", index.stop_id(stop), time);

        if stop == destination {
            return Search {
                labels,
                settled_order,
                found: Some(label),
            };
        }

        let mut relax = |next: Label| {
            if settled.contains(next.stop) || next.time >= best[next.stop] {
                return;
            }
            best[next.stop] = next.time;
            seq += 1;
            heap.push(FrontierEntry {
                time: next.time,
                seq,
                label: labels.len(),
            });
            labels.push(next);
        };

        for departure in index.departures_from(stop) {
            if departure.departure_time >= time {
                relax(Label {
                    stop: departure.to_stop,
                    time: departure.arrival_time,
                    parent: Some(label),
                    via: Via::Trip {
                        trip: departure.trip,
                        departure_time: departure.departure_time,
                    },
                });
            }
        }
        for transfer in index.transfers_from(stop) {
            relax(Label {
                stop: transfer.to_stop,
                time: time.saturating_add(transfer.duration),
                parent: Some(label),
                via: Via::Transfer {
                    duration: transfer.duration,
                },
            });
        }
    }

    Search {
        labels,
        settled_order,
        found: None,
    }
}

impl Search {
    fn journey(&self, index: &ScheduleGraphIndex, departure_time: Time) -> Option<Journey> {
        let mut chain = Vec::new();
        let mut current = self.found;
        while let Some(label) = current {
            chain.push(self.labels[label]);
            current = self.labels[label].parent;
        }
        chain.reverse();

        let mut steps: Vec<JourneyStep> = chain
            .iter()
            .map(|label| JourneyStep {
                stop_id: index.stop_id(label.stop).to_string(),
                time: label.time,
                leg: match label.via {
                    Via::Origin => None,
                    Via::Trip {
                        trip,
                        departure_time,
                    } => Some(Leg::Trip {
                        trip_id: index.trip_id(trip).to_string(),
                        departure_time,
                    }),
                    Via::Transfer { duration } => Some(Leg::Transfer { duration }),
                },
            })
            .collect();

        // The traveller waits at the origin until the first trip leaves
        let boarding = match steps.get(1).and_then(|step| step.leg.as_ref()) {
            Some(Leg::Trip { departure_time, .. }) => *departure_time,
            _ => departure_time,
        };
        steps.first_mut()?.time = boarding;
        Some(Journey { steps })
    }
}

/// Earliest arrival at `destination` leaving `origin` no earlier than `departure_time`.
///
/// Returns `None` if either stop is not in the index or the destination is
/// unreachable. A query from a stop to itself is answered with a single
/// step at the departure time.
pub fn find_earliest_arrival(
    index: &ScheduleGraphIndex,
    origin: &str,
    destination: &str,
    departure_time: Time,
) -> Option<Journey> {
    if origin == destination {
        return Some(Journey {
            steps: vec![JourneyStep {
                stop_id: origin.to_string(),
                time: departure_time,
                leg: None,
            }],
        });
    }
    let origin_idx = index.stop_index(origin)?;
    let destination_idx = index.stop_index(destination)?;

    let outcome = search(index, origin_idx, destination_idx, departure_time);
    trace!(
        "Search {} -> {} settled {} of {} stops",
        origin,
        destination,
        outcome.settled_order.len(),
        index.num_stops()
    );
    outcome.journey(index, departure_time)
}
